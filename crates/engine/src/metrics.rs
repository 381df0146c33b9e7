//! Counters for handover decisions and deliveries
//!
//! Recording is a no-op until the host process installs a `metrics` recorder.

use ::metrics::counter;

pub const EVALUATIONS_TOTAL: &str = "handover_evaluations_total";
pub const NOTIFICATIONS_TOTAL: &str = "handover_notifications_total";
pub const EXECUTIONS_TOTAL: &str = "handover_executions_total";
pub const LEAD_UPDATE_CONFLICTS_TOTAL: &str = "handover_lead_update_conflicts_total";

pub fn record_evaluation(should_handover: bool) {
    let outcome = if should_handover { "handover" } else { "continue" };
    counter!(EVALUATIONS_TOTAL, "outcome" => outcome).increment(1);
}

/// `status` is one of `delivered`, `failed`, `timeout`
pub fn record_notification(status: &'static str) {
    counter!(NOTIFICATIONS_TOTAL, "status" => status).increment(1);
}

pub fn record_execution(outcome: &'static str) {
    counter!(EXECUTIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_update_conflict() {
    counter!(LEAD_UPDATE_CONFLICTS_TOTAL).increment(1);
}
