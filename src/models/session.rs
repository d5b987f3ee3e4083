use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::alert::Alert;
use super::event::DetectionEvent;
use super::score::SessionScore;
use crate::config::DetectionConfig;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Scheduled,
    Active,
    Paused,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Scheduled => "Scheduled",
            SessionStatus::Active => "Active",
            SessionStatus::Paused => "Paused",
            SessionStatus::Completed => "Completed",
            SessionStatus::Cancelled => "Cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }

    /// Only active sessions accept detection events.
    pub fn accepts_events(&self) -> bool {
        matches!(self, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub name: String,
    pub email: String,
    pub position: String,
}

/// One candidate's proctored interview, from scheduling through completion.
///
/// The event and alert logs are append-only. `cleared_through` tracks how far
/// the interviewer has dismissed alerts from the live view; it never affects
/// scoring, which always runs over the full alert history.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewSession {
    pub id: String,
    pub candidate: Candidate,
    pub interviewer: String,
    pub status: SessionStatus,
    pub config: DetectionConfig,
    pub events: Vec<DetectionEvent>,
    pub alerts: Vec<Alert>,
    pub cleared_through: usize,
    pub score: SessionScore,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewSession {
    pub fn new(
        id: String,
        candidate: Candidate,
        interviewer: String,
        config: DetectionConfig,
        scheduled_at: DateTime<Utc>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            candidate,
            interviewer,
            status: SessionStatus::Scheduled,
            config,
            events: Vec::new(),
            alerts: Vec::new(),
            cleared_through: 0,
            score: SessionScore::default(),
            scheduled_at,
            started_at: None,
            ended_at: None,
            created_at,
            updated_at: created_at,
        }
    }

    /// Alerts the interviewer has not dismissed from the live view.
    pub fn visible_alerts(&self) -> &[Alert] {
        &self.alerts[self.cleared_through.min(self.alerts.len())..]
    }
}
