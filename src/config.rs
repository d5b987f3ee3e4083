use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::models::DetectionKind;

/// Per-session detection configuration with tunable thresholds.
///
/// Owned by the session; the interviewer may change it before or during a
/// session. Changes apply only to events evaluated after the change.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    /// Monitor when the candidate looks away from the screen.
    pub focus_detection: bool,
    /// Seconds of lost focus before an alert (1-30).
    pub focus_threshold_secs: u32,

    /// Alert when no face is visible.
    pub face_detection: bool,
    /// Seconds of face absence before an alert (5-60).
    pub face_absence_threshold_secs: u32,

    /// Detect additional people in frame.
    pub multiple_face_detection: bool,

    /// Detect phones, books, and other unauthorized objects.
    pub object_detection: bool,
    /// Detection accuracy vs false positives, percent (0-100).
    pub object_sensitivity: u8,

    /// Monitor background audio.
    pub audio_detection: bool,
    /// Seconds over the audio threshold before an alert (1-30).
    pub audio_threshold_secs: u32,

    /// Monitor eye closure and alertness.
    pub eye_closure_detection: bool,
    /// Seconds of eye closure before an alert (1-30).
    pub eye_closure_threshold_secs: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            focus_detection: true,
            focus_threshold_secs: 5,
            face_detection: true,
            face_absence_threshold_secs: 10,
            multiple_face_detection: true,
            object_detection: true,
            object_sensitivity: 75,
            audio_detection: true,
            audio_threshold_secs: 3,
            eye_closure_detection: false,
            eye_closure_threshold_secs: 2,
        }
    }
}

impl DetectionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=30).contains(&self.focus_threshold_secs) {
            bail!(
                "focus threshold must be between 1 and 30 seconds, got {}",
                self.focus_threshold_secs
            );
        }
        if !(5..=60).contains(&self.face_absence_threshold_secs) {
            bail!(
                "face absence threshold must be between 5 and 60 seconds, got {}",
                self.face_absence_threshold_secs
            );
        }
        if self.object_sensitivity > 100 {
            bail!(
                "object sensitivity must be a percentage (0-100), got {}",
                self.object_sensitivity
            );
        }
        if !(1..=30).contains(&self.audio_threshold_secs) {
            bail!(
                "audio threshold must be between 1 and 30 seconds, got {}",
                self.audio_threshold_secs
            );
        }
        if !(1..=30).contains(&self.eye_closure_threshold_secs) {
            bail!(
                "eye closure threshold must be between 1 and 30 seconds, got {}",
                self.eye_closure_threshold_secs
            );
        }
        Ok(())
    }

    /// Whether the given detection kind is switched on.
    pub fn is_enabled(&self, kind: DetectionKind) -> bool {
        match kind {
            DetectionKind::FocusLoss => self.focus_detection,
            DetectionKind::FaceAbsence => self.face_detection,
            DetectionKind::MultipleFaces => self.multiple_face_detection,
            DetectionKind::ObjectDetected => self.object_detection,
            DetectionKind::AudioViolation => self.audio_detection,
            DetectionKind::EyeClosure => self.eye_closure_detection,
        }
    }

    /// Alerting threshold in seconds for sustained kinds; `None` for
    /// instantaneous kinds.
    pub fn threshold_secs(&self, kind: DetectionKind) -> Option<u32> {
        match kind {
            DetectionKind::FocusLoss => Some(self.focus_threshold_secs),
            DetectionKind::FaceAbsence => Some(self.face_absence_threshold_secs),
            DetectionKind::AudioViolation => Some(self.audio_threshold_secs),
            DetectionKind::EyeClosure => Some(self.eye_closure_threshold_secs),
            DetectionKind::MultipleFaces | DetectionKind::ObjectDetected => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(DetectionConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_focus_threshold() {
        let mut config = DetectionConfig::default();
        config.focus_threshold_secs = 0;
        assert!(config.validate().is_err());
        config.focus_threshold_secs = 31;
        assert!(config.validate().is_err());
        config.focus_threshold_secs = 30;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_face_threshold() {
        let mut config = DetectionConfig::default();
        config.face_absence_threshold_secs = 4;
        assert!(config.validate().is_err());
        config.face_absence_threshold_secs = 61;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_sensitivity_over_100() {
        let mut config = DetectionConfig::default();
        config.object_sensitivity = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sustained_kinds_have_thresholds() {
        let config = DetectionConfig::default();
        assert_eq!(config.threshold_secs(DetectionKind::FocusLoss), Some(5));
        assert_eq!(config.threshold_secs(DetectionKind::FaceAbsence), Some(10));
        assert_eq!(config.threshold_secs(DetectionKind::ObjectDetected), None);
        assert_eq!(config.threshold_secs(DetectionKind::MultipleFaces), None);
    }

    #[test]
    fn eye_closure_disabled_by_default() {
        let config = DetectionConfig::default();
        assert!(!config.is_enabled(DetectionKind::EyeClosure));
        assert!(config.is_enabled(DetectionKind::FocusLoss));
    }
}
