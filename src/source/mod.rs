pub mod monitor;
pub mod simulated;

pub use monitor::{run_monitor, MonitorController};
pub use simulated::SimulatedSource;

use chrono::{DateTime, Utc};

use crate::models::SubmittedEvent;

/// Producer of detection events for one session. Implementations wrap a real
/// analysis pipeline or a simulation; the evaluator never cares which.
pub trait DetectionSource: Send {
    /// Events observed since the last poll, in time order.
    fn poll(&mut self, now: DateTime<Utc>) -> Vec<SubmittedEvent>;
}
