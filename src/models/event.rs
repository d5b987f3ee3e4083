use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed condition reported by a detection source. Immutable once
/// recorded against a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub id: String,
    pub session_id: String,
    pub kind: DetectionKind,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: Option<u32>,
    pub details: Option<String>,
}

/// Event payload as a detection source reports it, before the engine
/// assigns identity and binds it to a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedEvent {
    pub kind: DetectionKind,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: Option<u32>,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DetectionKind {
    FocusLoss,
    FaceAbsence,
    MultipleFaces,
    ObjectDetected,
    AudioViolation,
    EyeClosure,
}

impl DetectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DetectionKind::FocusLoss => "focus_loss",
            DetectionKind::FaceAbsence => "face_absence",
            DetectionKind::MultipleFaces => "multiple_faces",
            DetectionKind::ObjectDetected => "object_detected",
            DetectionKind::AudioViolation => "audio_violation",
            DetectionKind::EyeClosure => "eye_closure",
        }
    }

    /// Sustained conditions carry a duration and alert only once they have
    /// lasted past a configured threshold. Instantaneous conditions alert on
    /// first sight.
    pub fn is_sustained(&self) -> bool {
        matches!(
            self,
            DetectionKind::FocusLoss
                | DetectionKind::FaceAbsence
                | DetectionKind::AudioViolation
                | DetectionKind::EyeClosure
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}
