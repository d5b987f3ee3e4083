pub mod alert;
pub mod event;
pub mod score;
pub mod session;

pub use alert::Alert;
pub use event::{DetectionEvent, DetectionKind, Severity, SubmittedEvent};
pub use score::{SessionScore, ASSUMED_DETECTION_ACCURACY};
pub use session::{Candidate, InterviewSession, SessionStatus};
