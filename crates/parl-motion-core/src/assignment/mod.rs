//! Decision-to-motion assignment.
//!
//! [`MotionMapper`] owns one transcript's motions and decisions as arenas
//! and resolves each decision to exactly one motion:
//!
//! 1. pre-passes over the whole transcript (manual links, manual text,
//!    registry lookups, noise removal);
//! 2. per major-heading scopes, each running the cascade in [`cascade`]
//!    until it stops making progress;
//! 3. a final check that every division was paired.

mod cascade;
pub mod events;
pub mod text;

use std::collections::{HashMap, HashSet};

use crate::decision::{Agreement, Decision, Division};
use crate::error::{MotionError, Result};
use crate::extractor::extract_motions;
use crate::locator::{get_agreements, get_divisions};
use crate::motion::{Flag, Motion, MotionCollection};
use crate::overrides::{gid_matches_pattern, ManualOverrides};
use crate::registry::{extract_motion_ids, MotionRegistry};
use crate::transcript::{Chamber, Transcript};

pub use events::{AssignmentEvent, AssignmentSink, RecordingSink, TracingSink};

use text::{agreement_key, ordering_key};

/// Text of the motion that announces presentation of a bill; it follows
/// the decision it belongs to and is never itself decided.
const PRESENT_THE_BILL: &str = "present the bill.";

/// Decisions of one transcript after assignment, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assignment {
    pub divisions: Vec<Division>,
    pub agreements: Vec<Agreement>,
}

/// Where a proposed pairing takes its motion from.
#[derive(Debug, Clone)]
pub(crate) enum Target {
    /// A pending motion in the arena.
    Pool(usize),
    /// A motion built for the decision; consumes nothing.
    Synthetic(Motion),
}

#[derive(Debug, Clone)]
pub(crate) struct Proposal {
    pub decision: usize,
    pub target: Target,
    pub reason: &'static str,
}

impl Proposal {
    fn pool(decision: usize, motion: usize, reason: &'static str) -> Self {
        Self {
            decision,
            target: Target::Pool(motion),
            reason,
        }
    }

    fn synthetic(decision: usize, motion: Motion, reason: &'static str) -> Self {
        Self {
            decision,
            target: Target::Synthetic(motion),
            reason,
        }
    }
}

/// Assignment engine for one chamber/date.
pub struct MotionMapper<'a> {
    date: String,
    chamber: Chamber,
    /// Transcript item id -> document position.
    positions: HashMap<String, usize>,
    motions: Vec<Motion>,
    consumed: Vec<bool>,
    decisions: Vec<Decision>,
    overrides: &'a ManualOverrides,
    registry: Option<&'a MotionRegistry>,
    sink: &'a dyn AssignmentSink,
}

impl<'a> MotionMapper<'a> {
    /// Build a mapper from already extracted motions and located decisions.
    pub fn new(
        transcript: &Transcript,
        motions: MotionCollection,
        divisions: Vec<Division>,
        agreements: Vec<Agreement>,
        overrides: &'a ManualOverrides,
        registry: Option<&'a MotionRegistry>,
        sink: &'a dyn AssignmentSink,
    ) -> Self {
        let positions = transcript
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id().to_string(), index))
            .collect();
        let motions: Vec<Motion> = motions.into_iter().collect();
        let decisions: Vec<Decision> = agreements
            .into_iter()
            .map(Decision::from)
            .chain(divisions.into_iter().map(Decision::from))
            .collect();
        let registry = match transcript.chamber {
            Chamber::Scotland => registry,
            _ => None,
        };
        Self {
            date: transcript.date.clone(),
            chamber: transcript.chamber,
            positions,
            consumed: vec![false; motions.len()],
            motions,
            decisions,
            overrides,
            registry,
            sink,
        }
    }

    /// Extract motions and locate decisions, then build the mapper.
    pub fn from_transcript(
        transcript: &Transcript,
        overrides: &'a ManualOverrides,
        registry: Option<&'a MotionRegistry>,
        sink: &'a dyn AssignmentSink,
    ) -> Self {
        let motions = extract_motions(transcript, registry);
        let divisions = get_divisions(transcript);
        let agreements = get_agreements(transcript);
        Self::new(
            transcript, motions, divisions, agreements, overrides, registry, sink,
        )
    }

    pub fn motions(&self) -> &[Motion] {
        &self.motions
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    /// Run every pass and return the paired decisions.
    pub fn assign(mut self) -> Result<Assignment> {
        self.assign_manual()?;
        self.assign_manual_text();
        self.assign_registry()?;
        self.drop_noise();

        let mut carry: Vec<usize> = Vec::new();
        for (pool, decisions) in self.scopes() {
            let decisions = self.dedupe_decisions(decisions);
            if decisions.is_empty() {
                carry = pool;
                continue;
            }
            if pool.len() == 1 && decisions.len() == 1 {
                self.pair(decisions[0], Target::Pool(pool[0]), "single motion and decision");
                continue;
            }
            self.run_cascade(pool, decisions, &mut carry)?;
        }

        self.check_divisions()?;
        Ok(self.into_assignment())
    }

    // -----------------------------------------------------------------------
    // Pre-passes
    // -----------------------------------------------------------------------

    fn assign_manual(&mut self) -> Result<()> {
        for m in 0..self.motions.len() {
            if self.consumed[m] {
                continue;
            }
            let motion_gid = self.motions[m].gid();
            let Some(pattern) = self.overrides.linked_decision(&motion_gid) else {
                continue;
            };
            let matches: Vec<usize> = (0..self.decisions.len())
                .filter(|&d| gid_matches_pattern(&self.decisions[d].gid(), pattern))
                .collect();
            match matches.as_slice() {
                [] => {
                    return Err(MotionError::ManualOverrideMiss {
                        decision_gid: pattern.to_string(),
                    })
                }
                [d] => {
                    if !self.decisions[*d].is_resolved() {
                        self.pair(*d, Target::Pool(m), "manual lookup");
                    }
                }
                _ => {
                    return Err(MotionError::Ambiguity {
                        date: self.date.clone(),
                        context: format!(
                            "manual link {motion_gid} -> {pattern} matches {} decisions",
                            matches.len()
                        ),
                    })
                }
            }
        }
        Ok(())
    }

    fn assign_manual_text(&mut self) {
        for d in 0..self.decisions.len() {
            if self.decisions[d].is_resolved() {
                continue;
            }
            let gid = self.decisions[d].gid();
            if let Some(motion) = self.overrides.motion_text(&gid) {
                self.pair(d, Target::Synthetic(motion.clone()), "manual text");
            }
        }
    }

    fn assign_registry(&mut self) -> Result<()> {
        let Some(registry) = self.registry else {
            return Ok(());
        };
        for d in 0..self.decisions.len() {
            if self.decisions[d].is_resolved() {
                continue;
            }
            let after = self.decisions[d].after_text();
            let ids = extract_motion_ids(after);
            if ids.len() > 1 {
                return Err(MotionError::Ambiguity {
                    date: self.date.clone(),
                    context: format!(
                        "decision {} names several motions: {}",
                        self.decisions[d].gid(),
                        ids.join(", ")
                    ),
                });
            }
            let Some(motion_id) = ids.first() else {
                continue;
            };
            if after.to_lowercase().contains("as amended") {
                continue;
            }
            match registry.construct_from_decision(motion_id, &self.decisions[d]) {
                Ok(motion) => self.pair(d, Target::Synthetic(motion), "scottish motion"),
                Err(err) => self.sink.record(AssignmentEvent::RegistryMiss {
                    decision_gid: self.decisions[d].gid(),
                    motion_id: motion_id.clone(),
                    error: err.to_string(),
                }),
            }
        }
        Ok(())
    }

    fn drop_noise(&mut self) {
        for (m, motion) in self.motions.iter().enumerate() {
            if motion.has_flag(Flag::AfterDecision)
                && motion.text().trim().to_lowercase().ends_with(PRESENT_THE_BILL)
            {
                self.consumed[m] = true;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scoping
    // -----------------------------------------------------------------------

    /// Pending motions and decisions grouped into consecutive runs that
    /// share a major heading, in document order.
    fn scopes(&self) -> Vec<(Vec<usize>, Vec<usize>)> {
        enum Item {
            Motion(usize),
            Decision(usize),
        }

        let mut items: Vec<(Item, (u64, u64), &str)> = Vec::new();
        for (m, motion) in self.motions.iter().enumerate() {
            if !self.consumed[m] {
                items.push((
                    Item::Motion(m),
                    ordering_key(&motion.speech_id),
                    motion.major_heading_id.as_str(),
                ));
            }
        }
        for (d, decision) in self.decisions.iter().enumerate() {
            if !decision.is_resolved() {
                items.push((
                    Item::Decision(d),
                    ordering_key(decision.speech_id()),
                    decision.major_heading_id(),
                ));
            }
        }
        items.sort_by_key(|(_, key, _)| *key);

        let mut scopes: Vec<(Vec<usize>, Vec<usize>)> = Vec::new();
        let mut current_heading: Option<&str> = None;
        for (item, _, heading) in items {
            if current_heading != Some(heading) || scopes.is_empty() {
                scopes.push((Vec::new(), Vec::new()));
                current_heading = Some(heading);
            }
            if let Some((pool, decisions)) = scopes.last_mut() {
                match item {
                    Item::Motion(m) => pool.push(m),
                    Item::Decision(d) => decisions.push(d),
                }
            }
        }
        scopes
    }

    /// Agreements printed twice for the same instrument keep their first
    /// occurrence; divisions are never merged.
    fn dedupe_decisions(&self, decisions: Vec<usize>) -> Vec<usize> {
        let mut seen = HashSet::new();
        decisions
            .into_iter()
            .filter(|&d| match &self.decisions[d] {
                Decision::Agreement(a) => {
                    seen.insert(agreement_key(&a.preceding_text, &a.agreed_text))
                }
                Decision::Division(_) => true,
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Pairing
    // -----------------------------------------------------------------------

    fn pair(&mut self, decision: usize, target: Target, reason: &str) {
        let motion = match target {
            Target::Pool(m) => {
                self.consumed[m] = true;
                self.motions[m].clone()
            }
            Target::Synthetic(motion) => motion,
        };
        self.sink.record(AssignmentEvent::Assigned {
            decision_gid: self.decisions[decision].gid(),
            motion_gid: motion.gid(),
            reason: reason.to_string(),
        });
        self.decisions[decision].attach(motion, reason);
    }

    /// Apply a step's proposals in order, skipping any whose decision or
    /// motion was already taken by an earlier proposal. Paired items leave
    /// the pools. Returns the number of pairings made.
    fn commit(
        &mut self,
        proposals: Vec<Proposal>,
        pool: &mut Vec<usize>,
        decisions: &mut Vec<usize>,
    ) -> usize {
        let mut made = 0;
        for proposal in proposals {
            if self.decisions[proposal.decision].is_resolved() {
                continue;
            }
            if let Target::Pool(m) = proposal.target {
                if self.consumed[m] {
                    continue;
                }
            }
            self.pair(proposal.decision, proposal.target, proposal.reason);
            made += 1;
        }
        pool.retain(|&m| !self.consumed[m]);
        decisions.retain(|&d| !self.decisions[d].is_resolved());
        made
    }

    // -----------------------------------------------------------------------
    // Positions
    // -----------------------------------------------------------------------

    fn position(&self, id: &str) -> usize {
        self.positions.get(id).copied().unwrap_or(0)
    }

    /// Furthest document position the motion reaches.
    fn motion_position(&self, m: usize) -> usize {
        let motion = &self.motions[m];
        self.position(&motion.speech_id)
            .max(self.position(&motion.final_speech_id))
    }

    fn decision_position(&self, d: usize) -> usize {
        self.position(self.decisions[d].speech_id())
    }

    // -----------------------------------------------------------------------
    // Completion
    // -----------------------------------------------------------------------

    fn check_divisions(&self) -> Result<()> {
        let found = self.decisions.iter().filter(|d| d.is_division()).count();
        let assigned = self
            .decisions
            .iter()
            .filter(|d| d.is_division() && d.is_resolved())
            .count();
        if found != assigned {
            return Err(MotionError::DivisionCountMismatch {
                date: self.date.clone(),
                found,
                assigned,
            });
        }
        Ok(())
    }

    fn into_assignment(self) -> Assignment {
        let mut assignment = Assignment::default();
        for decision in self.decisions {
            match decision {
                Decision::Division(d) => assignment.divisions.push(d),
                Decision::Agreement(a) if a.motion.is_some() => assignment.agreements.push(a),
                Decision::Agreement(_) => {}
            }
        }
        assignment
            .divisions
            .sort_by_key(|d| ordering_key(&d.division_id));
        assignment
            .agreements
            .sort_by(|a, b| {
                ordering_key(&a.speech_id)
                    .cmp(&ordering_key(&b.speech_id))
                    .then_with(|| a.paragraph_pid.cmp(&b.paragraph_pid))
            });
        assignment
    }

    pub fn chamber(&self) -> Chamber {
        self.chamber
    }
}
