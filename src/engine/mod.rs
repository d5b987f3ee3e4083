pub mod controller;

pub use controller::ProctorEngine;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::TempDir;

    use crate::config::DetectionConfig;
    use crate::db::Database;
    use crate::models::{Candidate, DetectionKind, SessionStatus, Severity, SubmittedEvent};

    fn candidate() -> Candidate {
        Candidate {
            name: "John Smith".to_string(),
            email: "john.smith@email.com".to_string(),
            position: "Senior Software Engineer".to_string(),
        }
    }

    fn engine(dir: &TempDir) -> ProctorEngine {
        let db = Database::new(dir.path().join("vigil-test.sqlite3")).unwrap();
        ProctorEngine::new(db)
    }

    async fn active_session(engine: &ProctorEngine) -> String {
        let id = engine
            .schedule_session(
                candidate(),
                "Sarah Wilson".to_string(),
                DetectionConfig::default(),
                Utc::now(),
            )
            .await
            .unwrap();
        engine.start_session(&id).await.unwrap();
        id
    }

    fn focus_loss(duration_secs: u32) -> SubmittedEvent {
        SubmittedEvent {
            kind: DetectionKind::FocusLoss,
            timestamp: Utc::now(),
            duration_secs: Some(duration_secs),
            details: None,
        }
    }

    #[tokio::test]
    async fn qualifying_focus_loss_alerts_and_deducts() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        let alert = engine.submit_event(&id, focus_loss(7)).await.unwrap().unwrap();
        assert_eq!(alert.severity, Severity::Medium);

        let score = engine.get_score(&id).await.unwrap();
        assert_eq!(score.violation_count, 1);
        // Medium weight 3 plus distinct-kind penalty 2.
        assert_eq!(score.integrity_score, 95);
        assert_eq!(score.focus_percentage, 95);
    }

    #[tokio::test]
    async fn below_threshold_event_is_logged_but_not_alerted() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        let alert = engine.submit_event(&id, focus_loss(3)).await.unwrap();
        assert!(alert.is_none());

        let score = engine.get_score(&id).await.unwrap();
        assert_eq!(score.integrity_score, 100);

        let session = engine.get_session(&id).await.unwrap();
        assert_eq!(session.events.len(), 1);
        assert!(session.alerts.is_empty());
    }

    #[tokio::test]
    async fn disabled_detection_never_alerts() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        let mut config = DetectionConfig::default();
        config.object_detection = false;
        engine.update_config(&id, config).await.unwrap();

        let alert = engine
            .submit_event(
                &id,
                SubmittedEvent {
                    kind: DetectionKind::ObjectDetected,
                    timestamp: Utc::now(),
                    duration_secs: Some(120),
                    details: Some("Mobile phone identified in video frame".to_string()),
                },
            )
            .await
            .unwrap();
        assert!(alert.is_none());
        assert_eq!(engine.get_score(&id).await.unwrap().integrity_score, 100);
    }

    #[tokio::test]
    async fn sustained_event_without_duration_is_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        let result = engine
            .submit_event(
                &id,
                SubmittedEvent {
                    kind: DetectionKind::FocusLoss,
                    timestamp: Utc::now(),
                    duration_secs: None,
                    details: None,
                },
            )
            .await;
        assert!(result.is_err());

        // Rejected events leave no trace.
        let session = engine.get_session(&id).await.unwrap();
        assert!(session.events.is_empty());
    }

    #[tokio::test]
    async fn completed_session_rejects_late_events() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        engine.submit_event(&id, focus_loss(7)).await.unwrap();
        let report = engine.complete_session(&id).await.unwrap();
        assert_eq!(report.score.integrity_score, 95);

        let result = engine.submit_event(&id, focus_loss(10)).await;
        assert!(result.is_err());
        assert_eq!(engine.get_score(&id).await.unwrap().integrity_score, 95);
    }

    #[tokio::test]
    async fn scheduled_session_rejects_events_until_started() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = engine
            .schedule_session(
                candidate(),
                "Sarah Wilson".to_string(),
                DetectionConfig::default(),
                Utc::now(),
            )
            .await
            .unwrap();

        assert!(engine.submit_event(&id, focus_loss(7)).await.is_err());
        engine.start_session(&id).await.unwrap();
        assert!(engine.submit_event(&id, focus_loss(7)).await.is_ok());
    }

    #[tokio::test]
    async fn pause_blocks_events_and_resume_restores() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        engine.pause_session(&id).await.unwrap();
        assert!(engine.submit_event(&id, focus_loss(7)).await.is_err());

        engine.resume_session(&id).await.unwrap();
        assert!(engine.submit_event(&id, focus_loss(7)).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_only_from_scheduled_or_active() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        engine.pause_session(&id).await.unwrap();
        assert!(engine.cancel_session(&id).await.is_err());

        engine.resume_session(&id).await.unwrap();
        engine.cancel_session(&id).await.unwrap();
        assert_eq!(
            engine.get_session(&id).await.unwrap().status,
            SessionStatus::Cancelled
        );
        assert!(engine.cancel_session(&id).await.is_err());
    }

    #[tokio::test]
    async fn invalid_config_update_keeps_previous_config() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        let mut bad = DetectionConfig::default();
        bad.focus_threshold_secs = 99;
        assert!(engine.update_config(&id, bad).await.is_err());

        let session = engine.get_session(&id).await.unwrap();
        assert_eq!(session.config.focus_threshold_secs, 5);
    }

    #[tokio::test]
    async fn config_change_applies_only_to_later_events() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        // Qualifies under the default 5s threshold.
        let first = engine.submit_event(&id, focus_loss(7)).await.unwrap();
        assert!(first.is_some());

        let mut config = DetectionConfig::default();
        config.focus_threshold_secs = 10;
        engine.update_config(&id, config).await.unwrap();

        // Same duration no longer qualifies; the earlier alert stands.
        let second = engine.submit_event(&id, focus_loss(7)).await.unwrap();
        assert!(second.is_none());
        assert_eq!(engine.get_alerts(&id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn clear_alerts_hides_but_never_rescores() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        engine.submit_event(&id, focus_loss(7)).await.unwrap();
        engine.submit_event(&id, focus_loss(8)).await.unwrap();
        let score_before = engine.get_score(&id).await.unwrap();

        engine.clear_alerts(&id).await.unwrap();
        assert!(engine.get_visible_alerts(&id).await.unwrap().is_empty());
        assert_eq!(engine.get_alerts(&id).await.unwrap().len(), 2);
        assert_eq!(engine.get_score(&id).await.unwrap(), score_before);

        // New alerts reappear in the live view.
        engine.submit_event(&id, focus_loss(9)).await.unwrap();
        assert_eq!(engine.get_visible_alerts(&id).await.unwrap().len(), 1);

        let report = engine.complete_session(&id).await.unwrap();
        assert_eq!(report.alerts.len(), 3);
    }

    #[tokio::test]
    async fn integrity_score_stays_in_range_under_load() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;

        for _ in 0..50 {
            engine
                .submit_event(
                    &id,
                    SubmittedEvent {
                        kind: DetectionKind::ObjectDetected,
                        timestamp: Utc::now(),
                        duration_secs: None,
                        details: None,
                    },
                )
                .await
                .unwrap();
        }
        let score = engine.get_score(&id).await.unwrap();
        assert_eq!(score.integrity_score, 0);
        assert_eq!(score.violation_count, 50);
    }

    #[tokio::test]
    async fn report_for_unfinished_session_is_rejected() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir);
        let id = active_session(&engine).await;
        assert!(engine.finalize_report(&id).await.is_err());
    }

    #[tokio::test]
    async fn report_survives_engine_restart() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("vigil-test.sqlite3");

        let id = {
            let engine = ProctorEngine::new(Database::new(db_path.clone()).unwrap());
            let id = active_session(&engine).await;
            engine.submit_event(&id, focus_loss(7)).await.unwrap();
            engine.complete_session(&id).await.unwrap();
            id
        };

        let engine = ProctorEngine::new(Database::new(db_path).unwrap());
        engine.recover().await.unwrap();
        let report = engine.finalize_report(&id).await.unwrap();
        assert_eq!(report.score.integrity_score, 95);
        assert_eq!(report.alerts.len(), 1);
        assert_eq!(report.status, SessionStatus::Completed);
    }

    #[tokio::test]
    async fn listed_sessions_stay_fetchable_after_restart() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("vigil-test.sqlite3");

        let id = {
            let engine = ProctorEngine::new(Database::new(db_path.clone()).unwrap());
            let id = active_session(&engine).await;
            engine.submit_event(&id, focus_loss(7)).await.unwrap();
            engine.complete_session(&id).await.unwrap();
            id
        };

        let engine = ProctorEngine::new(Database::new(db_path).unwrap());
        engine.recover().await.unwrap();

        let listed = engine.list_sessions().await.unwrap();
        assert!(listed.iter().any(|summary| summary.id == id));

        // Every listed session is reachable through the getters as well.
        let session = engine.get_session(&id).await.unwrap();
        assert_eq!(session.status, SessionStatus::Completed);
        assert_eq!(session.events.len(), 1);
        assert_eq!(engine.get_score(&id).await.unwrap().integrity_score, 95);
        assert_eq!(engine.get_alerts(&id).await.unwrap().len(), 1);
        assert_eq!(engine.get_visible_alerts(&id).await.unwrap().len(), 1);

        assert!(engine.get_session("missing").await.is_err());
        assert!(engine.get_alerts("missing").await.is_err());
    }

    #[tokio::test]
    async fn failed_persist_leaves_session_unchanged() {
        let dir = TempDir::new().unwrap();
        let db = Database::new(dir.path().join("vigil-test.sqlite3")).unwrap();
        let engine = ProctorEngine::new(db.clone());
        let id = active_session(&engine).await;

        // Delete the row out from under the engine so the next event insert
        // hits a foreign key violation.
        let doomed = id.clone();
        db.execute(move |conn| {
            conn.execute(
                "DELETE FROM sessions WHERE id = ?1",
                rusqlite::params![doomed],
            )?;
            Ok(())
        })
        .await
        .unwrap();

        assert!(engine.submit_event(&id, focus_loss(7)).await.is_err());

        let session = engine.get_session(&id).await.unwrap();
        assert!(session.events.is_empty());
        assert!(session.alerts.is_empty());
        assert_eq!(session.score.integrity_score, 100);
    }

    #[tokio::test]
    async fn recover_cancels_sessions_left_active() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("vigil-test.sqlite3");

        let id = {
            let engine = ProctorEngine::new(Database::new(db_path.clone()).unwrap());
            active_session(&engine).await
        };

        let engine = ProctorEngine::new(Database::new(db_path).unwrap());
        engine.recover().await.unwrap();

        let report = engine.finalize_report(&id).await.unwrap();
        assert_eq!(report.status, SessionStatus::Cancelled);
    }
}
