//! Structured observability hooks for per-date processing.
//!
//! - [`DateSpan`] scopes every log line to one chamber/date unit.
//! - `emit_*` functions log the lifecycle events with stable `event` names
//!   so JSON output can be filtered downstream.

use tracing::{debug, info, warn};

/// RAII guard that enters a date-scoped span while one transcript is
/// processed.
///
/// ```ignore
/// let _span = DateSpan::enter("commons", "2024-04-24");
/// ```
pub struct DateSpan {
    _span: tracing::span::EnteredSpan,
}

impl DateSpan {
    pub fn enter(chamber: &str, date: &str) -> Self {
        let span = tracing::info_span!("parl_motion.date", chamber = %chamber, date = %date);
        Self {
            _span: span.entered(),
        }
    }
}

/// A motion span was closed by the extractor.
pub fn emit_motion_finished(gid: &str, end_reason: &str, lines: usize) {
    debug!(
        event = "motion.finished",
        gid = %gid,
        end_reason = %end_reason,
        lines = lines,
    );
}

/// A decision was paired with a motion.
pub fn emit_decision_assigned(decision_gid: &str, motion_gid: &str, reason: &str) {
    info!(
        event = "decision.assigned",
        decision_gid = %decision_gid,
        motion_gid = %motion_gid,
        reason = %reason,
    );
}

/// An agreement survived the cascade without a motion and was dropped.
pub fn emit_agreement_dropped(decision_gid: &str) {
    warn!(event = "agreement.dropped", decision_gid = %decision_gid);
}

/// An embedded registry identifier could not be resolved.
pub fn emit_registry_miss(motion_id: &str, context: &str, error: &dyn std::fmt::Display) {
    warn!(
        event = "registry.miss",
        motion_id = %motion_id,
        context = %context,
        error = %error,
    );
}

/// A cascade step found candidates but could not pick one.
pub fn emit_candidates_rejected(decision_gid: &str, step: &str, candidates: &[String]) {
    debug!(
        event = "candidates.rejected",
        decision_gid = %decision_gid,
        step = %step,
        candidates = %candidates.join(","),
    );
}

/// A date finished processing.
pub fn emit_date_processed(chamber: &str, date: &str, divisions: usize, agreements: usize) {
    info!(
        event = "date.processed",
        chamber = %chamber,
        date = %date,
        divisions = divisions,
        agreements = agreements,
    );
}

/// A date failed; in tolerant mode the batch carries on.
pub fn emit_date_failed(chamber: &str, date: &str, error: &dyn std::fmt::Display) {
    warn!(event = "date.failed", chamber = %chamber, date = %date, error = %error);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_span_enters_without_subscriber() {
        let _span = DateSpan::enter("commons", "2024-04-24");
        emit_date_processed("commons", "2024-04-24", 3, 7);
    }
}
