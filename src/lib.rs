//! Interview proctoring integrity engine.
//!
//! Detection sources report raw events (focus loss, face absence,
//! unauthorized objects, audio violations) for an interview session; the
//! engine classifies them into alerts, keeps a 0-100 integrity score per
//! session, and archives completed sessions as finalized reports.

pub mod config;
pub mod db;
pub mod engine;
pub mod evaluator;
pub mod logging;
pub mod models;
pub mod report;
pub mod source;

pub use config::DetectionConfig;
pub use db::{Database, SessionSummary};
pub use engine::ProctorEngine;
pub use models::{
    Alert, Candidate, DetectionEvent, DetectionKind, InterviewSession, SessionScore,
    SessionStatus, Severity, SubmittedEvent,
};
pub use report::SessionReport;
pub use source::{DetectionSource, MonitorController, SimulatedSource};
