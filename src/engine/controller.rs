use std::{collections::HashMap, sync::Arc};

use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use log::{info, warn};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::DetectionConfig;
use crate::db::{Database, SessionSummary};
use crate::evaluator::{classify, recompute_score};
use crate::models::{
    Alert, Candidate, DetectionEvent, InterviewSession, SessionScore, SessionStatus,
    SubmittedEvent,
};
use crate::report::SessionReport;

/// Coordinates all interview sessions in the process: owns the in-memory
/// session map, applies the evaluator to incoming events, and persists every
/// mutation to SQLite before it becomes visible in memory, so a failed write
/// rejects the operation with the session unchanged.
///
/// Sessions are independent; events for one session are applied sequentially
/// under the map lock, which matches the single-writer-per-session model.
#[derive(Clone)]
pub struct ProctorEngine {
    sessions: Arc<Mutex<HashMap<String, InterviewSession>>>,
    db: Database,
}

impl ProctorEngine {
    pub fn new(db: Database) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            db,
        }
    }

    /// Cancel sessions a previous process left active or paused. Call once
    /// at startup, before accepting new work.
    pub async fn recover(&self) -> Result<()> {
        let recovered = self.db.recover_orphaned_sessions(Utc::now()).await?;
        for id in &recovered {
            warn!("Recovered orphaned session {id}; marked as Cancelled");
        }
        Ok(())
    }

    pub async fn schedule_session(
        &self,
        candidate: Candidate,
        interviewer: String,
        config: DetectionConfig,
        scheduled_at: chrono::DateTime<Utc>,
    ) -> Result<String> {
        config.validate()?;

        let session_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let session = InterviewSession::new(
            session_id.clone(),
            candidate,
            interviewer,
            config,
            scheduled_at,
            now,
        );

        self.db.insert_session(&session).await?;
        self.sessions.lock().await.insert(session_id.clone(), session);

        info!("Scheduled session {session_id}");
        Ok(session_id)
    }

    pub async fn start_session(&self, session_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        if session.status != SessionStatus::Scheduled {
            bail!(
                "cannot start session {} from state {}",
                session_id,
                session.status.as_str()
            );
        }
        self.db
            .update_session_status(session_id, SessionStatus::Active, Some(now), None, now)
            .await?;
        session.status = SessionStatus::Active;
        session.started_at = Some(now);
        session.updated_at = now;
        info!("Session {session_id} active");
        Ok(())
    }

    pub async fn pause_session(&self, session_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        if session.status != SessionStatus::Active {
            bail!(
                "cannot pause session {} from state {}",
                session_id,
                session.status.as_str()
            );
        }
        self.db
            .update_session_status(session_id, SessionStatus::Paused, None, None, now)
            .await?;
        session.status = SessionStatus::Paused;
        session.updated_at = now;
        Ok(())
    }

    pub async fn resume_session(&self, session_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        if session.status != SessionStatus::Paused {
            bail!(
                "cannot resume session {} from state {}",
                session_id,
                session.status.as_str()
            );
        }
        self.db
            .update_session_status(session_id, SessionStatus::Active, None, None, now)
            .await?;
        session.status = SessionStatus::Active;
        session.updated_at = now;
        Ok(())
    }

    /// Complete a running (or paused) session, freezing its score, and
    /// return the finalized report.
    pub async fn complete_session(&self, session_id: &str) -> Result<SessionReport> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        if !matches!(
            session.status,
            SessionStatus::Active | SessionStatus::Paused
        ) {
            bail!(
                "cannot complete session {} from state {}",
                session_id,
                session.status.as_str()
            );
        }
        self.db
            .update_session_status(session_id, SessionStatus::Completed, None, Some(now), now)
            .await?;
        session.status = SessionStatus::Completed;
        session.ended_at = Some(now);
        session.updated_at = now;
        let report = SessionReport::from_session(session)?;
        info!(
            "Session {session_id} completed with integrity score {}",
            report.score.integrity_score
        );
        Ok(report)
    }

    pub async fn cancel_session(&self, session_id: &str) -> Result<()> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        if !matches!(
            session.status,
            SessionStatus::Scheduled | SessionStatus::Active
        ) {
            bail!(
                "cannot cancel session {} from state {}",
                session_id,
                session.status.as_str()
            );
        }
        self.db
            .update_session_status(session_id, SessionStatus::Cancelled, None, Some(now), now)
            .await?;
        session.status = SessionStatus::Cancelled;
        session.ended_at = Some(now);
        session.updated_at = now;
        Ok(())
    }

    /// Apply one detection event: validate it, classify it against the
    /// session's current config, append to the logs, and rescore. Returns
    /// the alert when the event qualified. The event is either fully applied
    /// or fully rejected.
    pub async fn submit_event(
        &self,
        session_id: &str,
        submitted: SubmittedEvent,
    ) -> Result<Option<Alert>> {
        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;

        if !session.status.accepts_events() {
            bail!(
                "session {} is {} and does not accept events",
                session_id,
                session.status.as_str()
            );
        }
        if submitted.kind.is_sustained() && submitted.duration_secs.is_none() {
            bail!(
                "{} events must carry a duration",
                submitted.kind.as_str()
            );
        }

        let event = DetectionEvent {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            kind: submitted.kind,
            timestamp: submitted.timestamp,
            duration_secs: submitted.duration_secs,
            details: submitted.details,
        };

        let alert = classify(&event, &session.config).map(|c| Alert {
            id: Uuid::new_v4().to_string(),
            session_id: session_id.to_string(),
            event_id: event.id.clone(),
            kind: event.kind,
            severity: c.severity,
            message: c.message,
            description: c.description,
            timestamp: event.timestamp,
            duration_secs: event.duration_secs,
        });

        let score = match &alert {
            Some(alert) => {
                let mut alerts = session.alerts.clone();
                alerts.push(alert.clone());
                recompute_score(&alerts)
            }
            None => session.score,
        };

        // The write must land before the in-memory session changes.
        self.db
            .record_event(&event, alert.as_ref(), score, now)
            .await?;

        session.events.push(event);
        if let Some(alert) = &alert {
            session.alerts.push(alert.clone());
            session.score = score;
            info!(
                "Session {session_id}: {} alert ({})",
                alert.kind.as_str(),
                alert.severity.as_str()
            );
        }
        session.updated_at = now;
        Ok(alert)
    }

    /// Replace the session's detection config. A rejected config leaves the
    /// previous one in force; already-recorded alerts are never reclassified.
    pub async fn update_config(&self, session_id: &str, config: DetectionConfig) -> Result<()> {
        config.validate()?;

        let now = Utc::now();
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        if session.status.is_terminal() {
            bail!(
                "cannot update config of {} session {}",
                session.status.as_str(),
                session_id
            );
        }
        self.db
            .update_session_config(session_id, &config, now)
            .await?;
        session.config = config;
        session.updated_at = now;
        Ok(())
    }

    /// Full append-only alert history, replayable regardless of what the
    /// live view has cleared. Falls back to the database for sessions from
    /// earlier runs.
    pub async fn get_alerts(&self, session_id: &str) -> Result<Vec<Alert>> {
        {
            let sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get(session_id) {
                return Ok(session.alerts.clone());
            }
        }
        self.db
            .get_alerts(session_id)
            .await?
            .ok_or_else(|| anyhow!("unknown session {session_id}"))
    }

    /// Alerts still showing in the live view. Cleared state is not persisted,
    /// so for sessions from earlier runs this is the full history.
    pub async fn get_visible_alerts(&self, session_id: &str) -> Result<Vec<Alert>> {
        {
            let sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get(session_id) {
                return Ok(session.visible_alerts().to_vec());
            }
        }
        self.get_alerts(session_id).await
    }

    /// Dismiss alerts from the live view. Display state only: the event log
    /// and the score are untouched.
    pub async fn clear_alerts(&self, session_id: &str) -> Result<()> {
        let mut sessions = self.sessions.lock().await;
        let session = get_mut(&mut sessions, session_id)?;
        session.cleared_through = session.alerts.len();
        Ok(())
    }

    pub async fn get_score(&self, session_id: &str) -> Result<SessionScore> {
        Ok(self.fetch_session(session_id).await?.score)
    }

    pub async fn get_session(&self, session_id: &str) -> Result<InterviewSession> {
        self.fetch_session(session_id).await
    }

    /// Session snapshots for dashboards, most recently scheduled first.
    /// Includes sessions persisted by earlier runs of the process.
    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.db.list_sessions().await
    }

    /// Finalized report for a session that has reached a terminal state.
    /// Falls back to the database for sessions from earlier runs.
    pub async fn finalize_report(&self, session_id: &str) -> Result<SessionReport> {
        let session = self.fetch_session(session_id).await?;
        SessionReport::from_session(&session)
    }

    /// Snapshot of a session: the live map when present, otherwise reloaded
    /// from the database.
    async fn fetch_session(&self, session_id: &str) -> Result<InterviewSession> {
        {
            let sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get(session_id) {
                return Ok(session.clone());
            }
        }
        self.db
            .get_session(session_id)
            .await?
            .ok_or_else(|| anyhow!("unknown session {session_id}"))
    }
}

fn get_mut<'a>(
    sessions: &'a mut HashMap<String, InterviewSession>,
    session_id: &str,
) -> Result<&'a mut InterviewSession> {
    sessions
        .get_mut(session_id)
        .ok_or_else(|| anyhow!("unknown session {session_id}"))
}
