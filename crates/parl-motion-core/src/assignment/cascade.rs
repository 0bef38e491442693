//! The per-scope cascade.
//!
//! Each step looks at a frozen view of the scope's pools and proposes
//! pairings; [`MotionMapper::commit`] applies them before the next step
//! runs. Passes repeat until one makes no pairing.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use super::text::{clean_text, decision_relevant_text, extract_amendment, remove_redundant};
use super::{AssignmentEvent, MotionMapper, Proposal};
use crate::decision::Decision;
use crate::detector::PhraseDetector;
use crate::error::{MotionError, Result};
use crate::motion::Flag;
use crate::transcript::Chamber;

/// Flags too common to identify a motion.
const BANNED_OVERLAP: &[Flag] = &[Flag::MainQuestion, Flag::AfterDecision];

/// Position window for the Scottish amendment proximity step.
const PROXIMITY_WINDOW: usize = 20;

/// Position window for the single-decision fallback.
const CLOSE_BY_WINDOW: usize = 5;

/// Window for a "nearby" positional match.
const NEARBY_WINDOW: usize = 2;

struct MapperCues {
    amendment_be_made: PhraseDetector,
    main_question_put: PhraseDetector,
    lords_amendment_agreement: PhraseDetector,
    can_be_self_motion: PhraseDetector,
}

static CUES: LazyLock<MapperCues> = LazyLock::new(|| MapperCues {
    amendment_be_made: PhraseDetector::phrases(["That the amendment be made."]),
    main_question_put: PhraseDetector::phrases([
        "question put and agreed to",
        "That the amendment be made.",
    ]),
    lords_amendment_agreement: PhraseDetector::new()
        .pattern(r"lords amendment \d+ agreed to")
        .pattern(r"amendment \(a\) in lieu of Lords"),
    // Decision texts that describe their own motion well enough to stand in
    // for it.
    can_be_self_motion: PhraseDetector::phrases([
        "Question put, That the clause stand part of the Bill.",
        "Question put (single Question on successive provisions of the Bill)",
        "Bill accordingly read a Second time",
        "That the clause be read a Second time",
        "Question put, That the Bill be now read the Third time",
        "accordingly read the Third time and passed",
        "this House agrees with Lords amendment",
        "this House disagrees with Lords amendment",
    ])
    .pattern(r"clause \d+ accordingly read a Second time")
    .pattern(r"^That the draft .+ be approved")
    .pattern(r"^That the .+ be approved.$")
    .pattern(r"amendment \(\w+\) to Lords amendment \d+ be made")
    .pattern(r"^Amendment.*?agreed to")
    .pattern(r"Amendments? \d+( and \d+)* moved—\[.*?\]—and agreed to\."),
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    AsAmended,
    FlagOverlap,
    Proximity,
    AmendmentCode,
    TextContainment,
    MainQuestion,
    Positional,
    AmendmentBeMade,
    LastPair,
    SingleDecision,
    SelfMotion,
    Identical,
}

impl Step {
    const ORDER: [Step; 12] = [
        Step::AsAmended,
        Step::FlagOverlap,
        Step::Proximity,
        Step::AmendmentCode,
        Step::TextContainment,
        Step::MainQuestion,
        Step::Positional,
        Step::AmendmentBeMade,
        Step::LastPair,
        Step::SingleDecision,
        Step::SelfMotion,
        Step::Identical,
    ];

    fn name(&self) -> &'static str {
        match self {
            Step::AsAmended => "as_amended",
            Step::FlagOverlap => "flag_overlap",
            Step::Proximity => "proximity",
            Step::AmendmentCode => "amendment_code",
            Step::TextContainment => "text_containment",
            Step::MainQuestion => "main_question",
            Step::Positional => "positional",
            Step::AmendmentBeMade => "amendment_be_made",
            Step::LastPair => "last_pair",
            Step::SingleDecision => "single_decision",
            Step::SelfMotion => "self_motion",
            Step::Identical => "identical",
        }
    }
}

impl MotionMapper<'_> {
    /// Resolve one scope. `carry` holds the motions of the last scope that
    /// had no decisions; it is used at most once, when this scope runs dry.
    pub(super) fn run_cascade(
        &mut self,
        pool: Vec<usize>,
        mut decisions: Vec<usize>,
        carry: &mut Vec<usize>,
    ) -> Result<()> {
        let mut pool = self.prepare_pool(pool);
        let mut recovered = false;

        while !decisions.is_empty() {
            let before = decisions.len();
            for step in Step::ORDER {
                if decisions.is_empty() {
                    break;
                }
                let proposals = self.propose(step, &pool, &decisions)?;
                self.commit(proposals, &mut pool, &mut decisions);
            }
            if decisions.len() < before {
                continue;
            }
            if !decisions.is_empty() && pool.is_empty() && !carry.is_empty() && !recovered {
                let fallback: Vec<usize> = carry
                    .drain(..)
                    .filter(|&m| !self.consumed[m] && self.motions[m].has_flag(Flag::MainQuestion))
                    .collect();
                recovered = true;
                if !fallback.is_empty() {
                    pool = self.prepare_pool(fallback);
                    continue;
                }
            }
            break;
        }

        self.terminate(&pool, &decisions)
    }

    /// Steps a to c: enrich abstract motions, then thin out competing
    /// second-stage and reasoned-amendment motions.
    fn prepare_pool(&mut self, pool: Vec<usize>) -> Vec<usize> {
        self.condense_motions(&pool);

        let mut seen_second_stage = false;
        let pool: Vec<usize> = pool
            .into_iter()
            .filter(|&m| {
                if !self.motions[m].has_flag(Flag::SecondStage) {
                    return true;
                }
                !std::mem::replace(&mut seen_second_stage, true)
            })
            .collect();

        let has_full = pool
            .iter()
            .any(|&m| self.motions[m].has_flag(Flag::ReasonedAmendmentFull));
        if has_full {
            pool.into_iter()
                .filter(|&m| !self.motions[m].has_flag(Flag::ReasonedAmendmentPartial))
                .collect()
        } else {
            pool
        }
    }

    /// Copy the text of the scope's main question and amendment into the
    /// abstract motions that only refer to them.
    fn condense_motions(&mut self, pool: &[usize]) {
        let unique_text = |flag: Flag| -> Option<Vec<String>> {
            let mut found = pool.iter().filter(|&&m| self.motions[m].has_flag(flag));
            match (found.next(), found.next()) {
                (Some(&m), None) => Some(self.motions[m].motion_lines.clone()),
                _ => None,
            }
        };
        let main = unique_text(Flag::MainQuestion);
        let amendment = unique_text(Flag::MotionAmendment);

        let mut previous: Option<usize> = None;
        for &m in pool {
            if self.motions[m].has_flag(Flag::AbstractMotion) {
                let text = self.motions[m].text().to_lowercase();
                let mut extra: Vec<String> = Vec::new();
                if text.contains("that the original words stand part of the question") {
                    if let Some(lines) = &amendment {
                        extra.push("Amendment:".to_string());
                        extra.extend(lines.iter().cloned());
                    }
                    if let Some(lines) = &main {
                        extra.push("Original words:".to_string());
                        extra.extend(lines.iter().cloned());
                    }
                }
                if text.contains("that the proposed words be there added.") {
                    if let Some(lines) = &amendment {
                        extra.push("Amendment:".to_string());
                        extra.extend(lines.iter().cloned());
                    }
                }
                if text.contains("that the amendment be made.") {
                    if let Some(p) = previous {
                        if !self.motions[p].speech_id.is_empty() && !self.motions[m].speech_id.is_empty() {
                            extra.push("Amendment:".to_string());
                            extra.extend(self.motions[p].motion_lines.iter().cloned());
                        }
                    }
                }
                self.motions[m].motion_lines.extend(extra);
            }
            previous = Some(m);
        }
    }

    fn propose(&self, step: Step, pool: &[usize], decisions: &[usize]) -> Result<Vec<Proposal>> {
        let proposals = match step {
            Step::AsAmended => self.as_amended(pool, decisions),
            Step::FlagOverlap => self.flag_overlap(pool, decisions),
            Step::Proximity => self.proximity(pool, decisions),
            Step::AmendmentCode => self.amendment_code(pool, decisions)?,
            Step::TextContainment => self.text_containment(pool, decisions),
            Step::MainQuestion => self.main_question(pool, decisions),
            Step::Positional => self.positional(pool, decisions),
            Step::AmendmentBeMade => self.amendment_be_made(pool, decisions),
            Step::LastPair => match (pool, decisions) {
                ([m], [d]) => vec![Proposal::pool(*d, *m, "just one left")],
                _ => Vec::new(),
            },
            Step::SingleDecision => self.single_decision(pool, decisions),
            Step::SelfMotion => self.self_motion(decisions),
            Step::Identical => self.identical(pool, decisions),
        };
        Ok(proposals)
    }

    fn reject(&self, decision: usize, step: Step, candidates: &[usize]) {
        self.sink.record(AssignmentEvent::CandidatesRejected {
            decision_gid: self.decisions[decision].gid(),
            step: step.name().to_string(),
            candidates: candidates.iter().map(|&m| self.motions[m].gid()).collect(),
        });
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    fn as_amended(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let amended: Vec<usize> = decisions
            .iter()
            .copied()
            .filter(|&d| {
                self.decisions[d]
                    .relevant_text()
                    .to_lowercase()
                    .contains("as amended")
            })
            .collect();
        let after: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|&m| self.motions[m].has_flag(Flag::AfterDecision))
            .collect();
        match (amended.as_slice(), after.as_slice()) {
            ([d], [m]) => vec![Proposal::pool(*d, *m, "just one after decision motion")],
            _ => Vec::new(),
        }
    }

    fn flag_overlap(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let mut proposals = Vec::new();
        for &d in decisions {
            let constructed = self.decisions[d].construct_motion(true, None);
            let wanted: BTreeSet<Flag> = constructed
                .flags
                .iter()
                .copied()
                .filter(|f| !BANNED_OVERLAP.contains(f))
                .collect();
            if wanted.is_empty() {
                continue;
            }
            let candidates: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&m| self.motions[m].flags.iter().any(|f| wanted.contains(f)))
                .collect();
            match candidates.as_slice() {
                [m] => proposals.push(Proposal::pool(d, *m, "constructed motion flag match")),
                [] => {}
                _ => self.reject(d, Step::FlagOverlap, &candidates),
            }
        }
        proposals
    }

    fn proximity(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        if self.chamber != Chamber::Scotland {
            return Vec::new();
        }
        let mut proposals = Vec::new();
        for &d in decisions {
            let decision_pos = self.decision_position(d);
            let mut ranked: Vec<(usize, usize)> = pool
                .iter()
                .copied()
                .filter(|&m| {
                    let motion = &self.motions[m];
                    motion.has_flag(Flag::MotionAmendment) || motion.has_flag(Flag::ScottishExpandedMotion)
                })
                .filter_map(|m| {
                    let pos = self.motion_position(m);
                    (pos < decision_pos && decision_pos - pos < PROXIMITY_WINDOW)
                        .then_some((decision_pos - pos, m))
                })
                .collect();
            ranked.sort_by_key(|(distance, _)| *distance);
            match ranked.as_slice() {
                [(_, m)] => proposals.push(Proposal::pool(d, *m, "scottish amendment")),
                [(a, m), (b, _), ..] if a < b => {
                    proposals.push(Proposal::pool(d, *m, "scottish amendment"))
                }
                _ => {}
            }
        }
        proposals
    }

    fn amendment_code(&self, pool: &[usize], decisions: &[usize]) -> Result<Vec<Proposal>> {
        let mut proposals = Vec::new();
        for &d in decisions {
            let decision = &self.decisions[d];
            let Some(code) = extract_amendment(decision.relevant_text()) else {
                continue;
            };
            let code = code.to_lowercase();
            let containing: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&m| self.motions[m].text().to_lowercase().contains(&code))
                .collect();
            let texts: Vec<String> = containing.iter().map(|&m| self.motions[m].text()).collect();
            let candidates: Vec<usize> = remove_redundant(&texts)
                .into_iter()
                .map(|i| containing[i])
                .collect();

            match candidates.as_slice() {
                [] => {}
                [m] => proposals.push(Proposal::pool(d, *m, "relevant amendment")),
                _ => {
                    self.reject(d, Step::AmendmentCode, &candidates);
                    match decision {
                        Decision::Agreement(a) if CUES.lords_amendment_agreement.matches(&a.agreed_text) => {
                            let motion = decision.construct_motion(true, self.registry);
                            proposals.push(Proposal::synthetic(d, motion, "lords amendment"));
                        }
                        _ => {
                            return Err(MotionError::Ambiguity {
                                date: self.date.clone(),
                                context: format!(
                                    "{} candidate motions for {code} at decision {}",
                                    candidates.len(),
                                    decision.gid()
                                ),
                            })
                        }
                    }
                }
            }
        }
        Ok(proposals)
    }

    fn text_containment(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let normalized: Vec<(usize, String)> = pool
            .iter()
            .map(|&m| (m, self.motions[m].text().to_lowercase().replace("be now read", "be read")))
            .collect();
        let mut proposals = Vec::new();
        for &d in decisions {
            let decision = &self.decisions[d];
            let relevant = decision_relevant_text(decision.relevant_text());
            let preceding = decision.preceding_text().to_lowercase().trim().to_string();
            for needle in [relevant, preceding] {
                if needle.chars().count() <= 5 {
                    continue;
                }
                let hits: Vec<usize> = normalized
                    .iter()
                    .filter(|(_, text)| text.contains(&needle))
                    .map(|(m, _)| *m)
                    .collect();
                if let [m] = hits.as_slice() {
                    proposals.push(Proposal::pool(d, *m, "text match on proceeding"));
                    break;
                }
                if hits.len() > 1 {
                    self.reject(d, Step::TextContainment, &hits);
                }
            }
        }
        proposals
    }

    fn main_question(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let mut proposals = Vec::new();
        for &d in decisions {
            let relevant = decision_relevant_text(self.decisions[d].relevant_text());
            if !CUES.main_question_put.matches(&relevant) {
                continue;
            }
            let decision_pos = self.decision_position(d);
            let candidates: Vec<usize> = pool
                .iter()
                .copied()
                .filter(|&m| {
                    self.motions[m].has_flag(Flag::MainQuestion) && self.motion_position(m) < decision_pos
                })
                .collect();
            if let [m] = candidates.as_slice() {
                proposals.push(Proposal::pool(d, *m, "one relevant main question"));
            }
        }
        proposals
    }

    fn positional(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let mut proposals = Vec::new();
        for &d in decisions {
            let decision_pos = self.decision_position(d);
            let mut exact = Vec::new();
            let mut nearby = Vec::new();
            let mut remainder = Vec::new();
            for &m in pool {
                let motion_pos = self.motion_position(m);
                let after = self.motions[m].has_flag(Flag::AfterDecision);
                if motion_pos > decision_pos && !after {
                    continue;
                }
                if motion_pos < decision_pos && after {
                    continue;
                }
                if motion_pos == decision_pos {
                    exact.push(m);
                } else if motion_pos.abs_diff(decision_pos) <= NEARBY_WINDOW {
                    nearby.push(m);
                } else {
                    remainder.push(m);
                }
            }

            let (mut relevant, reason) = if exact.is_empty() {
                (nearby, "nearby id match")
            } else {
                (exact, "exact id match")
            };
            if relevant.len() > 1 {
                let first_speech = &self.motions[relevant[0]].speech_id;
                if relevant.iter().all(|&m| &self.motions[m].speech_id == first_speech) {
                    relevant = relevant.split_off(relevant.len() - 1);
                }
            }
            match (relevant.as_slice(), remainder.as_slice()) {
                ([m], _) => proposals.push(Proposal::pool(d, *m, reason)),
                ([], [m]) => proposals.push(Proposal::pool(d, *m, "remainder match")),
                ([], _) => {}
                (many, _) => self.reject(d, Step::Positional, many),
            }
        }
        proposals
    }

    fn amendment_be_made(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let amendments: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|&m| self.motions[m].has_flag(Flag::MotionAmendment))
            .collect();
        let [m] = amendments.as_slice() else {
            return Vec::new();
        };
        decisions
            .iter()
            .copied()
            .filter(|&d| CUES.amendment_be_made.matches(self.decisions[d].preceding_text()))
            .map(|d| Proposal::pool(d, *m, "one amendment motion"))
            .collect()
    }

    fn single_decision(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let [d] = decisions else {
            return Vec::new();
        };
        let d = *d;
        if pool.len() < 2 {
            return Vec::new();
        }
        let decision_pos = self.decision_position(d);

        let closest = pool
            .iter()
            .copied()
            .map(|m| (self.position(&self.motions[m].speech_id).abs_diff(decision_pos), m))
            .filter(|(distance, _)| *distance < CLOSE_BY_WINDOW)
            .min_by_key(|(distance, _)| *distance);
        if let Some((_, m)) = closest {
            return vec![Proposal::pool(d, m, "close by motion")];
        }

        let one_line: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|&m| {
                let motion = &self.motions[m];
                motion.has_flag(Flag::OneLineMotion) && !motion.has_flag(Flag::InlineAmendment)
            })
            .collect();
        if let [m] = one_line.as_slice() {
            return vec![Proposal::pool(d, *m, "prioritise one line motion")];
        }

        let preceding = self.decisions[d].preceding_text().to_lowercase();
        if preceding.trim().is_empty() {
            return Vec::new();
        }
        let containing: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|&m| self.motions[m].text().to_lowercase().contains(&preceding))
            .collect();
        match containing.as_slice() {
            [m] => vec![Proposal::pool(d, *m, "single relevant text match")],
            _ => Vec::new(),
        }
    }

    fn self_motion(&self, decisions: &[usize]) -> Vec<Proposal> {
        decisions
            .iter()
            .copied()
            .filter(|&d| {
                let decision = &self.decisions[d];
                [decision.relevant_text(), decision.preceding_text(), decision.after_text()]
                    .into_iter()
                    .any(|text| CUES.can_be_self_motion.matches(text))
            })
            .map(|d| {
                let motion = self.decisions[d].construct_motion(false, self.registry);
                Proposal::synthetic(d, motion, "constructed motion")
            })
            .collect()
    }

    fn identical(&self, pool: &[usize], decisions: &[usize]) -> Vec<Proposal> {
        let ([d], Some(&first)) = (decisions, pool.first()) else {
            return Vec::new();
        };
        let base = clean_text(&self.motions[first].text());
        if pool.iter().all(|&m| clean_text(&self.motions[m].text()) == base) {
            vec![Proposal::pool(*d, first, "all motions identical")]
        } else {
            Vec::new()
        }
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    fn terminate(&self, pool: &[usize], decisions: &[usize]) -> Result<()> {
        if decisions.is_empty() {
            return Ok(());
        }
        if decisions.iter().all(|&d| !self.decisions[d].is_division()) {
            for &d in decisions {
                self.sink.record(AssignmentEvent::AgreementDropped {
                    decision_gid: self.decisions[d].gid(),
                });
            }
            return Ok(());
        }
        Err(MotionError::UnresolvedDivision {
            date: self.date.clone(),
            decisions: decisions.iter().map(|&d| self.decisions[d].gid()).collect(),
            motions: pool.iter().map(|&m| self.motions[m].gid()).collect(),
        })
    }
}
