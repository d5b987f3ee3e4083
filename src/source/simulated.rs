use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::config::DetectionConfig;
use crate::models::{DetectionKind, SubmittedEvent};

use super::DetectionSource;

/// Audio level (0-100) above which the source reports a violation.
const AUDIO_LEVEL_THRESHOLD: f64 = 60.0;

/// Stand-in for a camera/microphone analysis pipeline. Each poll nudges a
/// wandering audio level and rolls for the other detection kinds, so a demo
/// session produces a plausible mix of events without any real sensors.
///
/// Randomness lives entirely here; seed it to make a run reproducible.
pub struct SimulatedSource {
    config: DetectionConfig,
    rng: StdRng,
    audio_level: f64,
}

impl SimulatedSource {
    pub fn new(config: DetectionConfig) -> Self {
        Self::with_seed(config, rand::random())
    }

    pub fn with_seed(config: DetectionConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed),
            audio_level: 45.0,
        }
    }

    pub fn audio_level(&self) -> f64 {
        self.audio_level
    }

    fn step_audio_level(&mut self) {
        let delta = (self.rng.gen::<f64>() - 0.5) * 30.0;
        self.audio_level = (self.audio_level + delta).clamp(0.0, 100.0);
    }
}

impl DetectionSource for SimulatedSource {
    fn poll(&mut self, now: DateTime<Utc>) -> Vec<SubmittedEvent> {
        let mut events = Vec::new();

        self.step_audio_level();
        if self.config.audio_detection && self.audio_level > AUDIO_LEVEL_THRESHOLD {
            let duration = self.rng.gen_range(1..=8);
            events.push(SubmittedEvent {
                kind: DetectionKind::AudioViolation,
                timestamp: now,
                duration_secs: Some(duration),
                details: Some(format!(
                    "Background noise level: {:.0}dB",
                    self.audio_level
                )),
            });
        }

        if self.config.focus_detection && self.rng.gen_bool(0.15) {
            let duration = self.rng.gen_range(1..=12);
            events.push(SubmittedEvent {
                kind: DetectionKind::FocusLoss,
                timestamp: now,
                duration_secs: Some(duration),
                details: Some("Looking away from screen".to_string()),
            });
        }

        if self.config.face_detection && self.rng.gen_bool(0.05) {
            let duration = self.rng.gen_range(5..=20);
            events.push(SubmittedEvent {
                kind: DetectionKind::FaceAbsence,
                timestamp: now,
                duration_secs: Some(duration),
                details: None,
            });
        }

        if self.config.multiple_face_detection && self.rng.gen_bool(0.1) {
            events.push(SubmittedEvent {
                kind: DetectionKind::MultipleFaces,
                timestamp: now,
                duration_secs: None,
                details: Some("Additional face identified in monitoring area".to_string()),
            });
        }

        // Higher sensitivity means the detector flags objects more readily.
        let object_probability = self.config.object_sensitivity as f64 / 100.0 * 0.05;
        if self.config.object_detection && self.rng.gen_bool(object_probability) {
            events.push(SubmittedEvent {
                kind: DetectionKind::ObjectDetected,
                timestamp: now,
                duration_secs: None,
                details: Some("Mobile phone identified in video frame".to_string()),
            });
        }

        if self.config.eye_closure_detection && self.rng.gen_bool(0.05) {
            let duration = self.rng.gen_range(1..=6);
            events.push(SubmittedEvent {
                kind: DetectionKind::EyeClosure,
                timestamp: now,
                duration_secs: Some(duration),
                details: None,
            });
        }

        events
    }
}
