pub mod classify;
pub mod scoring;

pub use classify::{classify, Classification};
pub use scoring::{deduction_breakdown, focus_percentage, recompute_score, Deduction};
