use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::DetectionConfig;
use crate::evaluator::{deduction_breakdown, Deduction};
use crate::models::{Alert, Candidate, InterviewSession, SessionScore, SessionStatus};

/// Finalized record of a completed session, ready for an export collaborator.
/// PDF/CSV rendering happens elsewhere; this is the data contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    pub session_id: String,
    pub candidate: Candidate,
    pub interviewer: String,
    pub status: SessionStatus,
    pub config: DetectionConfig,
    pub scheduled_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_secs: Option<u32>,
    pub event_count: usize,
    pub alerts: Vec<Alert>,
    pub score: SessionScore,
    pub deductions: Vec<Deduction>,
}

impl SessionReport {
    /// Build a report from a session that has reached a terminal state.
    pub fn from_session(session: &InterviewSession) -> Result<Self> {
        if !session.status.is_terminal() {
            bail!(
                "cannot build a report for session {} in state {}",
                session.id,
                session.status.as_str()
            );
        }

        let duration_secs = match (session.started_at, session.ended_at) {
            (Some(start), Some(end)) => Some((end - start).num_seconds().max(0) as u32),
            _ => None,
        };

        Ok(Self {
            session_id: session.id.clone(),
            candidate: session.candidate.clone(),
            interviewer: session.interviewer.clone(),
            status: session.status,
            config: session.config.clone(),
            scheduled_at: session.scheduled_at,
            started_at: session.started_at,
            ended_at: session.ended_at,
            duration_secs,
            event_count: session.events.len(),
            alerts: session.alerts.clone(),
            score: session.score,
            deductions: deduction_breakdown(&session.alerts),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn completed_session() -> InterviewSession {
        let now = Utc::now();
        let mut session = InterviewSession::new(
            "sess-1".to_string(),
            Candidate {
                name: "John Smith".to_string(),
                email: "john.smith@email.com".to_string(),
                position: "Senior Software Engineer".to_string(),
            },
            "Sarah Wilson".to_string(),
            DetectionConfig::default(),
            now,
            now,
        );
        session.status = SessionStatus::Completed;
        session.started_at = Some(now);
        session.ended_at = Some(now + Duration::seconds(1800));
        session
    }

    #[test]
    fn report_captures_session_duration() {
        let report = SessionReport::from_session(&completed_session()).unwrap();
        assert_eq!(report.duration_secs, Some(1800));
        assert_eq!(report.score.integrity_score, 100);
        assert!(report.deductions.is_empty());
    }

    #[test]
    fn report_rejects_in_progress_session() {
        let mut session = completed_session();
        session.status = SessionStatus::Active;
        assert!(SessionReport::from_session(&session).is_err());
    }

    #[test]
    fn report_serializes_to_json() {
        let report = SessionReport::from_session(&completed_session()).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"sessionId\""));
        assert!(json.contains("\"integrityScore\""));
    }
}
