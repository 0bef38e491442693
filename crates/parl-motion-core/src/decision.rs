//! Decision points: recorded divisions and declared agreements.

use std::fmt;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::detector::PhraseDetector;
use crate::motion::Motion;
use crate::registry::MotionRegistry;
use crate::transcript::Chamber;

/// Cues in the following text that mark a reading stage being passed.
static READING_PASS: LazyLock<PhraseDetector> = LazyLock::new(|| {
    PhraseDetector::phrases([
        "read the Third time",
        "read a third time",
        "read the Second time",
        "read a Second time",
        "read the First time",
        "read a First time",
    ])
});

/// Which cue detected an agreement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgreementTrigger {
    OneLineAgreement,
    AmendmentAgreed,
    AmendedMotionAgreed,
}

impl AgreementTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            AgreementTrigger::OneLineAgreement => "one_line_agreement",
            AgreementTrigger::AmendmentAgreed => "amendment_agreed",
            AgreementTrigger::AmendedMotionAgreed => "amended_motion_agreed",
        }
    }
}

impl fmt::Display for AgreementTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded vote and the text around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Division {
    pub date: String,
    pub chamber: Chamber,
    pub major_heading_id: String,
    #[serde(default)]
    pub major_heading_title: String,
    pub minor_heading_id: String,
    /// Minor heading text at the time of the vote, used when a motion has to
    /// be synthesised from the division itself.
    pub minor_heading_text: String,
    /// Identifier of the division item.
    pub division_id: String,
    /// Last paragraph of the speech immediately before the vote.
    pub preceding_text: String,
    /// First paragraph (or rendered item) after the vote.
    pub after_text: String,
    #[serde(default)]
    pub motion: Option<Motion>,
    #[serde(default)]
    pub motion_assignment_reason: String,
}

impl Division {
    pub fn gid(&self) -> &str {
        &self.division_id
    }

    pub fn construct_motion(&self, registry: Option<&MotionRegistry>) -> Motion {
        let mut motion = Motion::new(&self.date, self.chamber, &self.division_id)
            .with_major_heading(&self.major_heading_id, &self.major_heading_title)
            .with_minor_heading(&self.minor_heading_id, &self.minor_heading_text)
            .with_lines([self.minor_heading_text.as_str(), self.preceding_text.as_str()]);
        motion.add_title(registry);
        motion.self_flag();
        motion
    }
}

/// A declared agreement ("Question put and agreed to.") and its context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub date: String,
    pub chamber: Chamber,
    pub major_heading_id: String,
    pub minor_heading_id: String,
    #[serde(default)]
    pub major_heading_title: String,
    pub speech_id: String,
    pub paragraph_pid: String,
    pub end_reason: AgreementTrigger,
    pub agreed_text: String,
    pub preceding_text: String,
    pub after_text: String,
    #[serde(default)]
    pub motion: Option<Motion>,
    #[serde(default)]
    pub motion_assignment_reason: String,
}

impl Agreement {
    pub fn gid(&self) -> String {
        let paragraph = self.paragraph_pid.rsplit('/').next().unwrap_or_default();
        format!("{}.{}", self.speech_id, paragraph)
    }

    /// Whether the question was negatived rather than agreed.
    pub fn negative(&self) -> bool {
        self.agreed_text.to_lowercase().contains("negatived")
    }

    /// Synthesise a motion from the agreement's own text.
    ///
    /// With `agreed_only` the motion is just the agreed line. Otherwise a
    /// reading stage named in the following text is kept after the agreed
    /// line; anything else takes the preceding paragraph as the motion body.
    pub fn construct_motion(&self, agreed_only: bool, registry: Option<&MotionRegistry>) -> Motion {
        let lines = if agreed_only {
            vec![self.agreed_text.clone()]
        } else if READING_PASS.matches(&self.after_text) {
            vec![self.agreed_text.clone(), self.after_text.clone()]
        } else {
            vec![self.preceding_text.clone(), self.agreed_text.clone()]
        };
        let mut motion = Motion::new(&self.date, self.chamber, &self.speech_id)
            .with_start_pid(&self.paragraph_pid)
            .with_major_heading(&self.major_heading_id, &self.major_heading_title)
            .with_lines(lines);
        motion.minor_heading_id = self.minor_heading_id.clone();
        motion.add_title(registry);
        motion.self_flag();
        motion
    }
}

/// Either kind of decision, with the capabilities the assignment engine
/// needs from both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    Division(Division),
    Agreement(Agreement),
}

impl Decision {
    pub fn gid(&self) -> String {
        match self {
            Decision::Division(d) => d.gid().to_string(),
            Decision::Agreement(a) => a.gid(),
        }
    }

    /// Transcript item used to position the decision.
    pub fn speech_id(&self) -> &str {
        match self {
            Decision::Division(d) => &d.division_id,
            Decision::Agreement(a) => &a.speech_id,
        }
    }

    pub fn paragraph_pid(&self) -> &str {
        match self {
            Decision::Division(_) => "",
            Decision::Agreement(a) => &a.paragraph_pid,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            Decision::Division(d) => &d.date,
            Decision::Agreement(a) => &a.date,
        }
    }

    pub fn major_heading_id(&self) -> &str {
        match self {
            Decision::Division(d) => &d.major_heading_id,
            Decision::Agreement(a) => &a.major_heading_id,
        }
    }

    pub fn minor_heading_id(&self) -> &str {
        match self {
            Decision::Division(d) => &d.minor_heading_id,
            Decision::Agreement(a) => &a.minor_heading_id,
        }
    }

    /// Text naming what was decided: the agreed line for an agreement, the
    /// paragraph before the vote for a division.
    pub fn relevant_text(&self) -> &str {
        match self {
            Decision::Division(d) => &d.preceding_text,
            Decision::Agreement(a) => &a.agreed_text,
        }
    }

    pub fn preceding_text(&self) -> &str {
        match self {
            Decision::Division(d) => &d.preceding_text,
            Decision::Agreement(a) => &a.preceding_text,
        }
    }

    pub fn after_text(&self) -> &str {
        match self {
            Decision::Division(d) => &d.after_text,
            Decision::Agreement(a) => &a.after_text,
        }
    }

    pub fn is_division(&self) -> bool {
        matches!(self, Decision::Division(_))
    }

    pub fn motion(&self) -> Option<&Motion> {
        match self {
            Decision::Division(d) => d.motion.as_ref(),
            Decision::Agreement(a) => a.motion.as_ref(),
        }
    }

    pub fn assignment_reason(&self) -> &str {
        match self {
            Decision::Division(d) => &d.motion_assignment_reason,
            Decision::Agreement(a) => &a.motion_assignment_reason,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.motion().is_some()
    }

    /// Gid of the resolved motion, or an empty string.
    pub fn motion_gid(&self) -> String {
        self.motion().map(Motion::gid).unwrap_or_default()
    }

    /// Record the pairing.
    pub fn attach(&mut self, motion: Motion, reason: &str) {
        let (slot, why) = match self {
            Decision::Division(d) => (&mut d.motion, &mut d.motion_assignment_reason),
            Decision::Agreement(a) => (&mut a.motion, &mut a.motion_assignment_reason),
        };
        *slot = Some(motion);
        *why = reason.to_string();
    }

    pub fn construct_motion(&self, agreed_only: bool, registry: Option<&MotionRegistry>) -> Motion {
        match self {
            Decision::Division(d) => d.construct_motion(registry),
            Decision::Agreement(a) => a.construct_motion(agreed_only, registry),
        }
    }
}

impl From<Division> for Decision {
    fn from(d: Division) -> Self {
        Decision::Division(d)
    }
}

impl From<Agreement> for Decision {
    fn from(a: Agreement) -> Self {
        Decision::Agreement(a)
    }
}
