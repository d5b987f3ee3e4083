use std::{
    path::PathBuf,
    sync::{mpsc, Arc, Mutex},
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

mod migrations;

use migrations::run_migrations;

use crate::config::DetectionConfig;
use crate::models::{
    Alert, Candidate, DetectionEvent, DetectionKind, InterviewSession, SessionScore,
    SessionStatus, Severity,
};

type DbTask = Box<dyn FnOnce(&mut Connection) + Send + 'static>;

enum DbCommand {
    Execute(DbTask),
    Shutdown,
}

struct DatabaseInner {
    sender: mpsc::Sender<DbCommand>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for DatabaseInner {
    fn drop(&mut self) {
        let mut guard = match self.worker.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if let Some(handle) = guard.take() {
            if let Err(err) = self.sender.send(DbCommand::Shutdown) {
                error!("Failed to send shutdown to DB thread: {err}");
            }
            if let Err(join_err) = handle.join() {
                error!("Failed to join DB thread: {join_err:?}");
            }
        }
    }
}

fn parse_datetime(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|err| anyhow!("invalid datetime '{value}': {err}"))
}

fn status_from_str(value: &str) -> Result<SessionStatus> {
    match value {
        "Scheduled" => Ok(SessionStatus::Scheduled),
        "Active" => Ok(SessionStatus::Active),
        "Paused" => Ok(SessionStatus::Paused),
        "Completed" => Ok(SessionStatus::Completed),
        "Cancelled" => Ok(SessionStatus::Cancelled),
        _ => Err(anyhow!("unknown session status '{value}'")),
    }
}

fn kind_from_str(value: &str) -> Result<DetectionKind> {
    match value {
        "focus_loss" => Ok(DetectionKind::FocusLoss),
        "face_absence" => Ok(DetectionKind::FaceAbsence),
        "multiple_faces" => Ok(DetectionKind::MultipleFaces),
        "object_detected" => Ok(DetectionKind::ObjectDetected),
        "audio_violation" => Ok(DetectionKind::AudioViolation),
        "eye_closure" => Ok(DetectionKind::EyeClosure),
        _ => Err(anyhow!("unknown detection kind '{value}'")),
    }
}

fn severity_from_str(value: &str) -> Result<Severity> {
    match value {
        "low" => Ok(Severity::Low),
        "medium" => Ok(Severity::Medium),
        "high" => Ok(Severity::High),
        _ => Err(anyhow!("unknown severity '{value}'")),
    }
}

fn duration_from_row(value: Option<i64>) -> Result<Option<u32>> {
    value
        .map(|v| u32::try_from(v).map_err(|_| anyhow!("duration {v} out of range")))
        .transpose()
}

/// Dashboard-facing projection of a session row, without the event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub id: String,
    pub candidate_name: String,
    pub candidate_position: String,
    pub interviewer: String,
    pub status: SessionStatus,
    pub integrity_score: u8,
    pub violation_count: u32,
    pub scheduled_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let (command_tx, command_rx) = mpsc::channel::<DbCommand>();
        let (ready_tx, ready_rx) = mpsc::channel();
        let path_for_thread = db_path.clone();

        let worker = thread::Builder::new()
            .name("vigil-db".into())
            .spawn(move || {
                let mut conn = match Connection::open(&path_for_thread) {
                    Ok(connection) => connection,
                    Err(err) => {
                        let _ = ready_tx.send(Err(anyhow::Error::new(err)
                            .context("failed to open SQLite database")));
                        return;
                    }
                };

                if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
                    error!("Failed to enable WAL mode: {err}");
                }
                if let Err(err) = conn.pragma_update(None, "foreign_keys", "ON") {
                    error!("Failed to enable foreign keys: {err}");
                }

                let init_result =
                    run_migrations(&mut conn).context("failed to run database migrations");
                if ready_tx.send(init_result).is_err() {
                    error!("DB initialization receiver dropped before ready signal");
                    return;
                }

                while let Ok(command) = command_rx.recv() {
                    match command {
                        DbCommand::Execute(task) => {
                            task(&mut conn);
                        }
                        DbCommand::Shutdown => break,
                    }
                }

                info!("Database thread shutting down");
            })
            .with_context(|| "failed to spawn database worker thread")?;

        ready_rx
            .recv()
            .context("database worker exited before signaling readiness")??;

        info!("Database initialized at {}", db_path.display());

        Ok(Self {
            inner: Arc::new(DatabaseInner {
                sender: command_tx,
                worker: Mutex::new(Some(worker)),
            }),
        })
    }

    pub async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let sender = self.inner.sender.clone();
        let (reply_tx, reply_rx) = oneshot::channel();

        let command = DbCommand::Execute(Box::new(move |conn| {
            let result = task(conn);
            if reply_tx.send(result).is_err() {
                error!("DB caller dropped before receiving result");
            }
        }));

        sender
            .send(command)
            .map_err(|err| anyhow!("failed to send command to DB thread: {err}"))?;

        reply_rx
            .await
            .map_err(|_| anyhow!("database thread terminated unexpectedly"))?
    }

    pub async fn insert_session(&self, session: &InterviewSession) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            let config_json = serde_json::to_string(&record.config)
                .context("failed to serialize detection config")?;
            conn.execute(
                "INSERT INTO sessions (id, candidate_name, candidate_email, candidate_position,
                     interviewer, status, config_json, violation_count, focus_percentage,
                     integrity_score, scheduled_at, started_at, ended_at, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    record.id,
                    record.candidate.name,
                    record.candidate.email,
                    record.candidate.position,
                    record.interviewer,
                    record.status.as_str(),
                    config_json,
                    record.score.violation_count,
                    record.score.focus_percentage,
                    record.score.integrity_score,
                    record.scheduled_at.to_rfc3339(),
                    record.started_at.map(|dt| dt.to_rfc3339()),
                    record.ended_at.map(|dt| dt.to_rfc3339()),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
    }

    pub async fn update_session_status(
        &self,
        session_id: &str,
        status: SessionStatus,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE sessions
                 SET status = ?1,
                     started_at = COALESCE(?2, started_at),
                     ended_at = COALESCE(?3, ended_at),
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    status.as_str(),
                    started_at.map(|dt| dt.to_rfc3339()),
                    ended_at.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    session_id,
                ],
            )
            .with_context(|| "failed to update session status")?;
            Ok(())
        })
        .await
    }

    pub async fn update_session_config(
        &self,
        session_id: &str,
        config: &DetectionConfig,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let session_id = session_id.to_string();
        let config = config.clone();
        self.execute(move |conn| {
            let config_json =
                serde_json::to_string(&config).context("failed to serialize detection config")?;
            conn.execute(
                "UPDATE sessions SET config_json = ?1, updated_at = ?2 WHERE id = ?3",
                params![config_json, updated_at.to_rfc3339(), session_id],
            )
            .with_context(|| "failed to update session config")?;
            Ok(())
        })
        .await
    }

    /// Persist one accepted event: the event row, the alert row when the
    /// event qualified, and the refreshed score columns, in one transaction.
    pub async fn record_event(
        &self,
        event: &DetectionEvent,
        alert: Option<&Alert>,
        score: SessionScore,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let event = event.clone();
        let alert = alert.cloned();
        self.execute(move |conn| {
            let tx = conn
                .transaction()
                .context("failed to open event transaction")?;

            tx.execute(
                "INSERT INTO events (id, session_id, kind, timestamp, duration_secs, details)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    event.id,
                    event.session_id,
                    event.kind.as_str(),
                    event.timestamp.to_rfc3339(),
                    event.duration_secs.map(i64::from),
                    event.details,
                ],
            )
            .with_context(|| "failed to insert detection event")?;

            if let Some(alert) = &alert {
                tx.execute(
                    "INSERT INTO alerts (id, session_id, event_id, kind, severity, message,
                         description, timestamp, duration_secs)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    params![
                        alert.id,
                        alert.session_id,
                        alert.event_id,
                        alert.kind.as_str(),
                        alert.severity.as_str(),
                        alert.message,
                        alert.description,
                        alert.timestamp.to_rfc3339(),
                        alert.duration_secs.map(i64::from),
                    ],
                )
                .with_context(|| "failed to insert alert")?;
            }

            tx.execute(
                "UPDATE sessions
                 SET violation_count = ?1,
                     focus_percentage = ?2,
                     integrity_score = ?3,
                     updated_at = ?4
                 WHERE id = ?5",
                params![
                    score.violation_count,
                    score.focus_percentage,
                    score.integrity_score,
                    updated_at.to_rfc3339(),
                    event.session_id,
                ],
            )
            .with_context(|| "failed to update session score")?;

            tx.commit().context("failed to commit event transaction")?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<InterviewSession>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, candidate_name, candidate_email, candidate_position, interviewer,
                        status, config_json, violation_count, focus_percentage, integrity_score,
                        scheduled_at, started_at, ended_at, created_at, updated_at
                 FROM sessions
                 WHERE id = ?1",
            )?;

            let mut rows = stmt.query(params![session_id.clone()])?;
            let session = match rows.next()? {
                Some(row) => Some(session_from_row(row)?),
                None => None,
            };
            drop(rows);
            drop(stmt);

            let Some(mut session) = session else {
                return Ok(None);
            };

            session.events = load_events(conn, &session_id)?;
            session.alerts = load_alerts(conn, &session_id)?;
            Ok(Some(session))
        })
        .await
    }

    pub async fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, candidate_name, candidate_position, interviewer, status,
                        integrity_score, violation_count, scheduled_at
                 FROM sessions
                 ORDER BY scheduled_at DESC",
            )?;

            let mut rows = stmt.query([])?;
            let mut summaries = Vec::new();
            while let Some(row) = rows.next()? {
                summaries.push(SessionSummary {
                    id: row.get(0)?,
                    candidate_name: row.get(1)?,
                    candidate_position: row.get(2)?,
                    interviewer: row.get(3)?,
                    status: status_from_str(&row.get::<_, String>(4)?)?,
                    integrity_score: row.get::<_, i64>(5)? as u8,
                    violation_count: row.get::<_, i64>(6)? as u32,
                    scheduled_at: parse_datetime(&row.get::<_, String>(7)?)?,
                });
            }
            Ok(summaries)
        })
        .await
    }

    /// Alert history for a session, `None` when the session id is unknown.
    pub async fn get_alerts(&self, session_id: &str) -> Result<Option<Vec<Alert>>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let known: i64 = conn.query_row(
                "SELECT COUNT(*) FROM sessions WHERE id = ?1",
                params![session_id.clone()],
                |row| row.get(0),
            )?;
            if known == 0 {
                return Ok(None);
            }
            load_alerts(conn, &session_id).map(Some)
        })
        .await
    }

    /// Sessions left mid-flight by a crash are cancelled on startup so they
    /// stop accepting events. Returns the affected session ids.
    pub async fn recover_orphaned_sessions(&self, now: DateTime<Utc>) -> Result<Vec<String>> {
        self.execute(move |conn| {
            let mut stmt =
                conn.prepare("SELECT id FROM sessions WHERE status IN ('Active', 'Paused')")?;
            let mut rows = stmt.query([])?;
            let mut ids = Vec::new();
            while let Some(row) = rows.next()? {
                ids.push(row.get::<_, String>(0)?);
            }
            drop(rows);
            drop(stmt);

            for id in &ids {
                conn.execute(
                    "UPDATE sessions
                     SET status = 'Cancelled', ended_at = ?1, updated_at = ?1
                     WHERE id = ?2",
                    params![now.to_rfc3339(), id],
                )?;
            }
            Ok(ids)
        })
        .await
    }
}

fn session_from_row(row: &Row<'_>) -> Result<InterviewSession> {
    let config_json: String = row.get(6)?;
    let config: DetectionConfig =
        serde_json::from_str(&config_json).context("failed to deserialize detection config")?;

    Ok(InterviewSession {
        id: row.get(0)?,
        candidate: Candidate {
            name: row.get(1)?,
            email: row.get(2)?,
            position: row.get(3)?,
        },
        interviewer: row.get(4)?,
        status: status_from_str(&row.get::<_, String>(5)?)?,
        config,
        events: Vec::new(),
        alerts: Vec::new(),
        cleared_through: 0,
        score: SessionScore {
            violation_count: row.get::<_, i64>(7)? as u32,
            focus_percentage: row.get::<_, i64>(8)? as u8,
            integrity_score: row.get::<_, i64>(9)? as u8,
            ..SessionScore::default()
        },
        scheduled_at: parse_datetime(&row.get::<_, String>(10)?)?,
        started_at: row
            .get::<_, Option<String>>(11)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        ended_at: row
            .get::<_, Option<String>>(12)?
            .map(|s| parse_datetime(&s))
            .transpose()?,
        created_at: parse_datetime(&row.get::<_, String>(13)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(14)?)?,
    })
}

fn load_events(conn: &Connection, session_id: &str) -> Result<Vec<DetectionEvent>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, kind, timestamp, duration_secs, details
         FROM events
         WHERE session_id = ?1
         ORDER BY timestamp ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut events = Vec::new();
    while let Some(row) = rows.next()? {
        events.push(DetectionEvent {
            id: row.get(0)?,
            session_id: row.get(1)?,
            kind: kind_from_str(&row.get::<_, String>(2)?)?,
            timestamp: parse_datetime(&row.get::<_, String>(3)?)?,
            duration_secs: duration_from_row(row.get::<_, Option<i64>>(4)?)?,
            details: row.get(5)?,
        });
    }
    Ok(events)
}

fn load_alerts(conn: &Connection, session_id: &str) -> Result<Vec<Alert>> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, event_id, kind, severity, message, description,
                timestamp, duration_secs
         FROM alerts
         WHERE session_id = ?1
         ORDER BY timestamp ASC",
    )?;

    let mut rows = stmt.query(params![session_id])?;
    let mut alerts = Vec::new();
    while let Some(row) = rows.next()? {
        alerts.push(Alert {
            id: row.get(0)?,
            session_id: row.get(1)?,
            event_id: row.get(2)?,
            kind: kind_from_str(&row.get::<_, String>(3)?)?,
            severity: severity_from_str(&row.get::<_, String>(4)?)?,
            message: row.get(5)?,
            description: row.get(6)?,
            timestamp: parse_datetime(&row.get::<_, String>(7)?)?,
            duration_secs: duration_from_row(row.get::<_, Option<i64>>(8)?)?,
        });
    }
    Ok(alerts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use uuid::Uuid;

    fn test_session(id: &str) -> InterviewSession {
        let now = Utc::now();
        InterviewSession::new(
            id.to_string(),
            Candidate {
                name: "John Smith".to_string(),
                email: "john.smith@email.com".to_string(),
                position: "Senior Software Engineer".to_string(),
            },
            "Sarah Wilson".to_string(),
            DetectionConfig::default(),
            now,
            now,
        )
    }

    fn open_db(dir: &TempDir) -> Database {
        Database::new(dir.path().join("vigil-test.sqlite3")).unwrap()
    }

    #[tokio::test]
    async fn session_roundtrip() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let session = test_session("sess-1");
        db.insert_session(&session).await.unwrap();

        let loaded = db.get_session("sess-1").await.unwrap().unwrap();
        assert_eq!(loaded.candidate, session.candidate);
        assert_eq!(loaded.status, SessionStatus::Scheduled);
        assert_eq!(loaded.config, session.config);
        assert!(loaded.events.is_empty());

        assert!(db.get_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn record_event_persists_alert_and_score() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let session = test_session("sess-1");
        db.insert_session(&session).await.unwrap();

        let now = Utc::now();
        let event = DetectionEvent {
            id: Uuid::new_v4().to_string(),
            session_id: "sess-1".to_string(),
            kind: DetectionKind::FocusLoss,
            timestamp: now,
            duration_secs: Some(7),
            details: None,
        };
        let alert = Alert {
            id: Uuid::new_v4().to_string(),
            session_id: "sess-1".to_string(),
            event_id: event.id.clone(),
            kind: DetectionKind::FocusLoss,
            severity: Severity::Medium,
            message: "Candidate looking away from screen".to_string(),
            description: "Focus lost for 7 seconds".to_string(),
            timestamp: now,
            duration_secs: Some(7),
        };
        let score = SessionScore {
            violation_count: 1,
            focus_percentage: 95,
            integrity_score: 95,
            ..SessionScore::default()
        };

        db.record_event(&event, Some(&alert), score, now)
            .await
            .unwrap();

        let loaded = db.get_session("sess-1").await.unwrap().unwrap();
        assert_eq!(loaded.events.len(), 1);
        assert_eq!(loaded.alerts.len(), 1);
        assert_eq!(loaded.score.integrity_score, 95);
        assert_eq!(loaded.alerts[0].severity, Severity::Medium);

        let alerts = db.get_alerts("sess-1").await.unwrap().unwrap();
        assert_eq!(alerts.len(), 1);
        assert!(db.get_alerts("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_sessions_orders_by_schedule() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let mut first = test_session("sess-1");
        first.scheduled_at = Utc::now() - chrono::Duration::hours(2);
        let second = test_session("sess-2");
        db.insert_session(&first).await.unwrap();
        db.insert_session(&second).await.unwrap();

        let summaries = db.list_sessions().await.unwrap();
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].id, "sess-2");
    }

    #[tokio::test]
    async fn recovery_cancels_in_flight_sessions() {
        let dir = TempDir::new().unwrap();
        let db = open_db(&dir);

        let mut session = test_session("sess-1");
        session.status = SessionStatus::Active;
        db.insert_session(&session).await.unwrap();

        let recovered = db.recover_orphaned_sessions(Utc::now()).await.unwrap();
        assert_eq!(recovered, vec!["sess-1".to_string()]);

        let loaded = db.get_session("sess-1").await.unwrap().unwrap();
        assert_eq!(loaded.status, SessionStatus::Cancelled);
        assert!(loaded.ended_at.is_some());
    }
}
