use anyhow::{bail, Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::engine::ProctorEngine;

use super::DetectionSource;

/// Poll the source on a fixed interval and feed its events to the engine
/// until cancelled or the session stops accepting events.
///
/// One loop per session; events are submitted in poll order, which preserves
/// the single-writer-per-session model.
pub async fn run_monitor(
    session_id: String,
    engine: ProctorEngine,
    mut source: Box<dyn DetectionSource>,
    poll_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now();
                for event in source.poll(now) {
                    match engine.submit_event(&session_id, event).await {
                        Ok(Some(alert)) => {
                            info!(
                                "monitor {}: {} alert ({})",
                                session_id,
                                alert.kind.as_str(),
                                alert.severity.as_str()
                            );
                        }
                        Ok(None) => {}
                        Err(err) => {
                            error!("monitor {session_id}: event rejected: {err:#}");
                        }
                    }
                }

                match engine.get_session(&session_id).await {
                    Ok(session) if session.status.is_terminal() => {
                        info!("monitor {session_id}: session reached {}, stopping", session.status.as_str());
                        break;
                    }
                    Ok(_) => {}
                    Err(err) => {
                        warn!("monitor {session_id}: lost session: {err:#}");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                info!("monitor {session_id}: shutting down");
                break;
            }
        }
    }
}

/// Owns the spawned monitor task for one session.
pub struct MonitorController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl MonitorController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start_monitoring(
        &mut self,
        session_id: String,
        engine: ProctorEngine,
        source: Box<dyn DetectionSource>,
        poll_interval: Duration,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("monitoring already active");
        }

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(run_monitor(
            session_id,
            engine,
            source,
            poll_interval,
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop_monitoring(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("monitor task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorController {
    fn default() -> Self {
        Self::new()
    }
}
