use std::collections::HashSet;

use crate::models::{Alert, DetectionKind, SessionScore, Severity};

/// Per-alert deduction weights by severity.
const WEIGHT_HIGH: u32 = 5;
const WEIGHT_MEDIUM: u32 = 3;
const WEIGHT_LOW: u32 = 1;

/// Flat penalty applied once per distinct detection kind that produced at
/// least one medium or high alert. Kept separate from the per-alert weights
/// so the two components never double-count: a first medium alert costs its
/// weight (3) plus this penalty (2).
const DISTINCT_KIND_PENALTY: u32 = 2;

/// Focus percentage drops by this much per focus-loss alert.
const FOCUS_ALERT_PENALTY: u32 = 5;

fn severity_weight(severity: Severity) -> u32 {
    match severity {
        Severity::High => WEIGHT_HIGH,
        Severity::Medium => WEIGHT_MEDIUM,
        Severity::Low => WEIGHT_LOW,
    }
}

/// Recompute the session score from the full alert history.
///
/// Pure and idempotent: the same alert slice always yields the same score,
/// regardless of how the live alert view has been cleared.
pub fn recompute_score(alerts: &[Alert]) -> SessionScore {
    let mut deduction: u32 = 0;
    let mut violation_count: u32 = 0;
    let mut violation_kinds: HashSet<DetectionKind> = HashSet::new();

    for alert in alerts {
        deduction += severity_weight(alert.severity);
        if alert.severity >= Severity::Medium {
            violation_count += 1;
            violation_kinds.insert(alert.kind);
        }
    }

    deduction += violation_kinds.len() as u32 * DISTINCT_KIND_PENALTY;

    SessionScore {
        violation_count,
        focus_percentage: focus_percentage(alerts),
        integrity_score: 100u32.saturating_sub(deduction) as u8,
        ..SessionScore::default()
    }
}

/// 100 minus a fixed penalty per focus-loss alert, clamped to [0, 100].
pub fn focus_percentage(alerts: &[Alert]) -> u8 {
    let focus_alerts = alerts
        .iter()
        .filter(|a| a.kind == DetectionKind::FocusLoss)
        .count() as u32;
    100u32.saturating_sub(focus_alerts * FOCUS_ALERT_PENALTY) as u8
}

/// One line of an integrity score breakdown, as shown in detailed reports.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Deduction {
    pub reason: String,
    pub points: i32,
}

fn kind_label(kind: DetectionKind) -> &'static str {
    match kind {
        DetectionKind::FocusLoss => "Focus Loss Events",
        DetectionKind::FaceAbsence => "Face Absence Events",
        DetectionKind::MultipleFaces => "Multiple Faces",
        DetectionKind::ObjectDetected => "Unauthorized Objects",
        DetectionKind::AudioViolation => "Audio Violations",
        DetectionKind::EyeClosure => "Eye Closure Events",
    }
}

/// Itemize the deductions behind `recompute_score`, one line per detection
/// kind in order of first appearance, plus one line for the distinct-kind
/// penalty. The lines sum to `100 - integrity_score` unless the score
/// clamped at zero.
pub fn deduction_breakdown(alerts: &[Alert]) -> Vec<Deduction> {
    let mut kind_order: Vec<DetectionKind> = Vec::new();
    let mut violation_kinds: HashSet<DetectionKind> = HashSet::new();

    for alert in alerts {
        if !kind_order.contains(&alert.kind) {
            kind_order.push(alert.kind);
        }
        if alert.severity >= Severity::Medium {
            violation_kinds.insert(alert.kind);
        }
    }

    let mut breakdown: Vec<Deduction> = kind_order
        .into_iter()
        .map(|kind| {
            let matching: Vec<&Alert> = alerts.iter().filter(|a| a.kind == kind).collect();
            let points: u32 = matching.iter().map(|a| severity_weight(a.severity)).sum();
            Deduction {
                reason: format!("{} ({})", kind_label(kind), matching.len()),
                points: -(points as i32),
            }
        })
        .collect();

    if !violation_kinds.is_empty() {
        breakdown.push(Deduction {
            reason: format!("Distinct Violation Types ({})", violation_kinds.len()),
            points: -((violation_kinds.len() as u32 * DISTINCT_KIND_PENALTY) as i32),
        });
    }

    breakdown
}
