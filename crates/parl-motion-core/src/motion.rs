//! Motion spans and their procedural flags.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::detector::PhraseDetector;
use crate::error::{MotionError, Result};
use crate::obs;
use crate::registry::MotionRegistry;
use crate::title::derive_title;
use crate::transcript::Chamber;

/// Lines that carry no motion content on their own.
pub const CONTENTLESS_LINES: &[&str] = &[
    "Question put forthwith (Standing Order No. 163).",
    "The House proceeded to a Division.",
];

/// Procedural marker attached to a motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    ComplexMotion,
    ClauseMotion,
    AskedImmediately,
    InlineAmendment,
    OneLineMotion,
    AfterDecision,
    /// Motion about "the question" itself (standing-order mechanics) with no
    /// substantive content of its own.
    AbstractMotion,
    MainQuestion,
    MotionAmendment,
    ScottishExpandedMotion,
    SecondStage,
    ReasonedAmendmentFull,
    ReasonedAmendmentPartial,
}

impl Flag {
    pub const ALL: [Flag; 13] = [
        Flag::ComplexMotion,
        Flag::ClauseMotion,
        Flag::AskedImmediately,
        Flag::InlineAmendment,
        Flag::OneLineMotion,
        Flag::AfterDecision,
        Flag::AbstractMotion,
        Flag::MainQuestion,
        Flag::MotionAmendment,
        Flag::ScottishExpandedMotion,
        Flag::SecondStage,
        Flag::ReasonedAmendmentFull,
        Flag::ReasonedAmendmentPartial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Flag::ComplexMotion => "complex_motion",
            Flag::ClauseMotion => "clause_motion",
            Flag::AskedImmediately => "asked_immediately",
            Flag::InlineAmendment => "inline_amendment",
            Flag::OneLineMotion => "one_line_motion",
            Flag::AfterDecision => "after_decision",
            Flag::AbstractMotion => "abstract_motion",
            Flag::MainQuestion => "main_question",
            Flag::MotionAmendment => "motion_amendment",
            Flag::ScottishExpandedMotion => "scottish_expanded_motion",
            Flag::SecondStage => "second_stage",
            Flag::ReasonedAmendmentFull => "reasoned_amendment_full",
            Flag::ReasonedAmendmentPartial => "reasoned_amendment_partial",
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Flag {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        Flag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| MotionError::InputValidation(format!("unknown motion flag: {s}")))
    }
}

// ---------------------------------------------------------------------------
// Content cues used by self-classification
// ---------------------------------------------------------------------------

struct ContentCues {
    abstract_motion: PhraseDetector,
    amendment: PhraseDetector,
    main_question: PhraseDetector,
    second_reading: PhraseDetector,
    declines_reading: PhraseDetector,
    leave_out_stub: PhraseDetector,
}

static CUES: LazyLock<ContentCues> = LazyLock::new(|| ContentCues {
    abstract_motion: PhraseDetector::phrases([
        "That the proposed words be there added",
        "That the original words stand part of the Question",
        "Question put forthwith (Standing Order No. 33), That the amendment be made.",
    ]),
    amendment: PhraseDetector::phrases([
        "I beg to move an amendment",
        "I beg to move amendment",
        "Amendment proposed: at the end of the Question",
    ])
    .pattern(r"The question is, that amendment \d+ be agreed to\. Are we(?: all)? agreed\?"),
    main_question: PhraseDetector::phrases([
        "I beg to move",
        "That the clause stand part of the Bill.",
        "Question again proposed,",
    ]),
    second_reading: PhraseDetector::phrases([
        "read a Second time",
        "read the Second time",
    ]),
    declines_reading: PhraseDetector::phrases([
        "declines to give a second reading",
        "decline to give a second reading",
        "declines to give a third reading",
        "decline to give a third reading",
    ]),
    leave_out_stub: PhraseDetector::phrases(["leave out from “That”"]),
});

// ---------------------------------------------------------------------------
// Motion
// ---------------------------------------------------------------------------

/// The reconstructed text of a formal proposal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Motion {
    pub date: String,
    #[serde(default)]
    pub chamber: Chamber,
    #[serde(default)]
    pub motion_title: String,
    #[serde(default)]
    pub major_heading_id: String,
    #[serde(default)]
    pub minor_heading_id: String,
    #[serde(default)]
    pub major_heading_title: String,
    #[serde(default)]
    pub minor_heading_title: String,
    #[serde(default)]
    pub speech_start_pid: String,
    pub speech_id: String,
    #[serde(default)]
    pub final_speech_id: String,
    #[serde(default)]
    pub end_reason: String,
    #[serde(default)]
    pub motion_lines: Vec<String>,
    #[serde(default)]
    pub flags: Vec<Flag>,
}

impl Motion {
    pub fn new(date: impl Into<String>, chamber: Chamber, speech_id: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            chamber,
            speech_id: speech_id.into(),
            ..Default::default()
        }
    }

    pub fn with_start_pid(mut self, pid: impl Into<String>) -> Self {
        self.speech_start_pid = pid.into();
        self
    }

    pub fn with_major_heading(mut self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.major_heading_id = id.into();
        self.major_heading_title = title.into();
        self
    }

    pub fn with_minor_heading(mut self, id: impl Into<String>, title: impl Into<String>) -> Self {
        self.minor_heading_id = id.into();
        self.minor_heading_title = title.into();
        self
    }

    pub fn with_lines<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.motion_lines.extend(lines.into_iter().map(Into::into));
        self
    }

    pub fn with_flag(mut self, flag: Flag) -> Self {
        self.add_flag(flag);
        self
    }

    /// Identity key: the starting speech id, plus the trailing component of
    /// the starting paragraph id when there is one.
    pub fn gid(&self) -> String {
        match self.speech_start_pid.rsplit('/').next() {
            Some(paragraph) if !paragraph.is_empty() => {
                format!("{}.{}", self.speech_id, paragraph)
            }
            _ => self.speech_id.clone(),
        }
    }

    pub fn text(&self) -> String {
        self.motion_lines.join("\n")
    }

    pub fn len(&self) -> usize {
        self.motion_lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motion_lines.is_empty()
    }

    pub fn has_flag(&self, flag: Flag) -> bool {
        self.flags.contains(&flag)
    }

    /// Add a flag, keeping first-insertion order and set semantics.
    pub fn add_flag(&mut self, flag: Flag) {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
    }

    /// Append a line and move the final linked item forward.
    pub fn add_line(&mut self, line: impl Into<String>, final_id: &str) {
        if !final_id.is_empty() {
            self.final_speech_id = final_id.to_string();
        }
        self.motion_lines.push(line.into().replace('\u{a0}', " "));
    }

    /// True when every line is boilerplate.
    pub fn contentless(&self) -> bool {
        self.motion_lines
            .iter()
            .all(|line| CONTENTLESS_LINES.contains(&line.trim()))
    }

    /// Flags computed from the finished text.
    pub fn self_flag(&mut self) {
        let content = self.text();
        let cues = &*CUES;

        if self.motion_lines.len() < 3 && cues.abstract_motion.matches(&content) {
            self.add_flag(Flag::AbstractMotion);
        }

        let is_amendment = cues.amendment.matches(&content);
        if is_amendment {
            self.add_flag(Flag::MotionAmendment);
        } else if cues.main_question.matches(&content) {
            self.add_flag(Flag::MainQuestion);
        }

        let declines = cues.declines_reading.matches(&content);
        if declines {
            self.add_flag(Flag::ReasonedAmendmentFull);
        } else if cues.leave_out_stub.matches(&content) {
            self.add_flag(Flag::ReasonedAmendmentPartial);
        }

        if !is_amendment && !declines && cues.second_reading.matches(&content) {
            self.add_flag(Flag::SecondStage);
        }
    }

    /// Derive the title if none was set.
    pub fn add_title(&mut self, registry: Option<&MotionRegistry>) {
        if self.motion_title.is_empty() {
            self.motion_title = derive_title(self, registry);
        }
    }

    /// Close the motion: record why, derive its title and content flags.
    pub fn finish(mut self, end_reason: &str, registry: Option<&MotionRegistry>) -> Self {
        self.end_reason = end_reason.to_string();
        self.add_title(registry);
        self.self_flag();
        obs::emit_motion_finished(&self.gid(), end_reason, self.len());
        self
    }

    /// Concatenate lines and flags of several motions into the first.
    pub fn merge(motions: Vec<Motion>) -> Option<Motion> {
        let mut iter = motions.into_iter();
        let mut first = iter.next()?;
        for motion in iter {
            first.motion_lines.extend(motion.motion_lines);
            for flag in motion.flags {
                first.add_flag(flag);
            }
        }
        Some(first)
    }
}

impl fmt::Display for Motion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

// ---------------------------------------------------------------------------
// MotionCollection
// ---------------------------------------------------------------------------

/// Compact view used by the `extract` command and motion snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionSummary {
    pub title: String,
    pub content: String,
}

/// Ordered output of the extractor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MotionCollection {
    pub motions: Vec<Motion>,
}

impl MotionCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, motion: Motion) {
        self.motions.push(motion);
    }

    pub fn len(&self) -> usize {
        self.motions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.motions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Motion> {
        self.motions.iter()
    }

    /// Drop motions with no substantive lines.
    pub fn prune(&mut self) {
        self.motions.retain(|m| !m.contentless());
    }

    pub fn summaries(&self) -> BTreeMap<String, MotionSummary> {
        self.motions
            .iter()
            .map(|m| {
                (
                    m.gid(),
                    MotionSummary {
                        title: m.motion_title.clone(),
                        content: m.text(),
                    },
                )
            })
            .collect()
    }
}

impl IntoIterator for MotionCollection {
    type Item = Motion;
    type IntoIter = std::vec::IntoIter<Motion>;

    fn into_iter(self) -> Self::IntoIter {
        self.motions.into_iter()
    }
}
