//! Assignment diagnostics.
//!
//! The engine reports what it decided through an [`AssignmentSink`]. The
//! default [`TracingSink`] forwards to the structured log; tests use a
//! [`RecordingSink`] and assert on the collected events.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::obs;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AssignmentEvent {
    Assigned {
        decision_gid: String,
        motion_gid: String,
        reason: String,
    },
    AgreementDropped {
        decision_gid: String,
    },
    RegistryMiss {
        decision_gid: String,
        motion_id: String,
        error: String,
    },
    CandidatesRejected {
        decision_gid: String,
        step: String,
        candidates: Vec<String>,
    },
}

/// Receiver for assignment diagnostics. Shared across workers, so it takes
/// `&self`.
pub trait AssignmentSink: Send + Sync {
    fn record(&self, event: AssignmentEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl AssignmentSink for TracingSink {
    fn record(&self, event: AssignmentEvent) {
        match &event {
            AssignmentEvent::Assigned {
                decision_gid,
                motion_gid,
                reason,
            } => obs::emit_decision_assigned(decision_gid, motion_gid, reason),
            AssignmentEvent::AgreementDropped { decision_gid } => {
                obs::emit_agreement_dropped(decision_gid)
            }
            AssignmentEvent::RegistryMiss {
                decision_gid,
                motion_id,
                error,
            } => obs::emit_registry_miss(motion_id, decision_gid, error),
            AssignmentEvent::CandidatesRejected {
                decision_gid,
                step,
                candidates,
            } => obs::emit_candidates_rejected(decision_gid, step, candidates),
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<AssignmentEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AssignmentEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Reason recorded for `decision_gid`, if it was assigned.
    pub fn reason_for(&self, decision_gid: &str) -> Option<String> {
        self.events().into_iter().find_map(|e| match e {
            AssignmentEvent::Assigned {
                decision_gid: gid,
                reason,
                ..
            } if gid == decision_gid => Some(reason),
            _ => None,
        })
    }

    pub fn dropped(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AssignmentEvent::AgreementDropped { decision_gid } => Some(decision_gid),
                _ => None,
            })
            .collect()
    }
}

impl AssignmentSink for RecordingSink {
    fn record(&self, event: AssignmentEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
