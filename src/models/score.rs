use serde::{Deserialize, Serialize};

/// Aggregate metrics derived from a session's full alert history. Recomputed
/// on every accepted event; frozen once the session completes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionScore {
    /// Count of medium and high severity alerts.
    pub violation_count: u32,
    /// 0-100, reduced by focus-loss alerts.
    pub focus_percentage: u8,
    /// 0-100 overall trustworthiness metric.
    pub integrity_score: u8,
    /// Assumed constant until a real detection model exists.
    pub detection_accuracy: f32,
}

/// Nominal accuracy reported while detection is simulated.
pub const ASSUMED_DETECTION_ACCURACY: f32 = 96.5;

impl Default for SessionScore {
    fn default() -> Self {
        Self {
            violation_count: 0,
            focus_percentage: 100,
            integrity_score: 100,
            detection_accuracy: ASSUMED_DETECTION_ACCURACY,
        }
    }
}
