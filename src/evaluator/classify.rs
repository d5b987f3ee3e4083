use crate::config::DetectionConfig;
use crate::models::{DetectionEvent, DetectionKind, Severity};

/// Outcome of classifying a qualifying event: the severity plus the
/// human-readable text the alert will carry.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub severity: Severity,
    pub message: String,
    pub description: String,
}

/// Decide whether an event qualifies as an alert under the given config.
///
/// Returns `None` when the event's kind is disabled, or when a sustained
/// condition has not yet lasted past its configured threshold. A duration
/// exactly equal to the threshold qualifies. Pure and deterministic.
pub fn classify(event: &DetectionEvent, config: &DetectionConfig) -> Option<Classification> {
    if !config.is_enabled(event.kind) {
        return None;
    }

    if let Some(threshold) = config.threshold_secs(event.kind) {
        let duration = event.duration_secs?;
        if duration < threshold {
            return None;
        }
    }

    let severity = severity_for(event, config);
    let (message, description) = alert_text(event);
    Some(Classification {
        severity,
        message,
        description,
    })
}

/// Fixed per-kind severity table. Audio violations scale with how far the
/// duration runs over the configured threshold.
fn severity_for(event: &DetectionEvent, config: &DetectionConfig) -> Severity {
    match event.kind {
        DetectionKind::ObjectDetected => Severity::High,
        DetectionKind::MultipleFaces => Severity::High,
        DetectionKind::FaceAbsence => Severity::High,
        DetectionKind::FocusLoss => Severity::Medium,
        DetectionKind::EyeClosure => Severity::Low,
        DetectionKind::AudioViolation => {
            let duration = event.duration_secs.unwrap_or(0);
            if duration >= config.audio_threshold_secs.saturating_mul(2) {
                Severity::Medium
            } else {
                Severity::Low
            }
        }
    }
}

fn alert_text(event: &DetectionEvent) -> (String, String) {
    let duration = event.duration_secs.unwrap_or(0);
    match event.kind {
        DetectionKind::FocusLoss => (
            "Candidate looking away from screen".to_string(),
            format!("Focus lost for {duration} seconds"),
        ),
        DetectionKind::FaceAbsence => (
            "No face detected".to_string(),
            format!("Face absent from frame for {duration} seconds"),
        ),
        DetectionKind::MultipleFaces => (
            "Multiple faces detected".to_string(),
            "Additional person identified in video feed".to_string(),
        ),
        DetectionKind::ObjectDetected => (
            "Unauthorized object detected".to_string(),
            event
                .details
                .clone()
                .unwrap_or_else(|| "Unauthorized device identified in frame".to_string()),
        ),
        DetectionKind::AudioViolation => (
            "Background noise detected".to_string(),
            format!("Audio level exceeded threshold for {duration} seconds"),
        ),
        DetectionKind::EyeClosure => (
            "Eye closure detected".to_string(),
            format!("Eyes closed for {duration} seconds"),
        ),
    }
}
