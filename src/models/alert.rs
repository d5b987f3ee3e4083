use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::{DetectionKind, Severity};

/// User-facing projection of a qualifying detection event.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub session_id: String,
    pub event_id: String,
    pub kind: DetectionKind,
    pub severity: Severity,
    pub message: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub duration_secs: Option<u32>,
}
