//! Motion extractor.
//!
//! Walks the transcript speech by speech, paragraph by paragraph, and cuts
//! the debate text into [`Motion`] spans. A motion opens on a procedural
//! cue ("I beg to move", "Motion made, and Question put", ...), accumulates
//! paragraphs, and closes on terminal punctuation, a signature close, a
//! speaker change, or one of the structural cues below.

use std::sync::LazyLock;

use tracing::warn;

use crate::detector::{ComplexPhrase, PhraseDetector};
use crate::motion::{Flag, Motion, MotionCollection};
use crate::obs;
use crate::registry::{extract_motion_ids, MotionRegistry};
use crate::transcript::{Chamber, HeadedSpeech, Paragraph, Transcript};

struct ExtractionCues {
    end_motion: PhraseDetector,
    resolved_start: PhraseDetector,
    malformed_start: PhraseDetector,
    jump_in: PhraseDetector,
    sequence_start: PhraseDetector,
    motion_start: PhraseDetector,
    one_line_motion: PhraseDetector,
    asked_immediately: PhraseDetector,
    discussion_mode: PhraseDetector,
    subitem: PhraseDetector,
    valid_ender: PhraseDetector,
    continuation: PhraseDetector,
    ends_alphanumeric: PhraseDetector,
    inserted: PhraseDetector,
    new_clause: PhraseDetector,
    signature_close: PhraseDetector,
    inline_amendment: PhraseDetector,
    amendment_explainer: PhraseDetector,
    registry_reference: ComplexPhrase,
    disagree_with_lords: PhraseDetector,
}

static CUES: LazyLock<ExtractionCues> = LazyLock::new(|| {
    let resolved_start = PhraseDetector::new()
        .pattern(r"^Resolved,")
        .pattern(r"^Ordered,")
        .pattern(r"^Motion agreed to,")
        .pattern(r"^Motion, as amended,");

    let motion_start = PhraseDetector::phrases([
        "I beg to move",
        "I beg move to move",
        "I therefore beg to move,",
        "Amendment proposed: at the end of the Question to add:",
        "Amendment proposed : at the end of the Question to add:",
        "Motion made, and Question put",
        "The Deputy Speaker put forthwith",
        "Question put accordingly",
        "Question again proposed",
        "Question put forthwith",
        "Question put, That the clause stand part of the Bill",
        "Question proposed",
        "Question put (Standing Order No. 31(2))",
        "That this House authorises",
        "Motion made, and Question proposed",
        "Motion made, Question put forthwith",
        "Motion made , and Question proposed",
        "Motion made and Question proposed",
        "Motion made and Question put forthwith",
        "Motion made, and Question put forthwith",
    ])
    .pattern(r"^To leave out from “That”")
    // Bare preamble only, not the closing restatement.
    .pattern(r"^Question put,$")
    .pattern(r"^Question put, That this House disagrees with Lords amendment")
    .pattern(r"^Question put, That this House agrees with Lords amendment")
    .pattern(r"^Amendment \([a-zA-Z]+\) proposed")
    .pattern(r"^Amendments \([a-zA-Z]+\) and \([a-zA-Z]+\) proposed")
    .pattern(r"^Amendments \([a-zA-Z]+\) to \([a-zA-Z]+\) proposed")
    .pattern(r"Question, That new clause \d+ be added to the Bill.")
    .pattern(r"^Motion \([A-Z]\)")
    .starts_with("If, on the day before the end of the penultimate House of Commons sitting")
    .pattern(r"^That an humble Address be presented to (His|Her) Majesty")
    .pattern(r"^That this House,? at its rising")
    .pattern(r"^That this House—")
    .pattern(r"^That this House (insists|agrees|directs|recognises|instructs|requires|takes note)")
    .pattern(r"^That this House will not allow")
    .pattern(r"^Resolved,")
    .pattern(r"^Ordered,")
    .pattern(r"^Motion agreed to,")
    .pattern(r"^Motion, as amended,")
    .pattern(r"amendment proposed: \(.+?\), at the end of the Question to add:")
    .pattern(r"amended proposed: \(.+?\)")
    .pattern(r"^Amendment proposed: \(.+?\)")
    .pattern(r"^That the .+ be approved")
    .pattern(r"Question put, That amendment \(.+?\) be made.")
    .pattern(r"Amendment proposed to new clause \d+: \(.+?\),")
    .pattern(r"^Amendments made:\s*\d+,\s*page\s*\d+,\s*line\s*\d+")
    .pattern(r"^Amendment\s*\d+\s*,\s*page\s*\d+\s*,\s*line\s*\d+\s*")
    .pattern(r"The question is, that amendment \d+ be agreed to\. Are we(?: all)? agreed\?");

    let one_line_motion = PhraseDetector::phrases([
        "Main Question again proposed.",
        "Question put forthwith, That the Question be now put",
        "Motion made, That the Bill be now read a Secondtime.",
        "Question put forthwith (Standing Order No. 33), That the amendment be made.",
        "Motion made, That the Bill be read be now read a Second time.",
        "Question put, That the Bill be read a Second time.",
        "Question put, That the clause be a Second time.",
        "Question put, That the clause stand part of the Bill",
        "That the Bill be now read a second time",
        "That the Bill be now read a third time.",
        "That the Bill be read the Third time.",
        "That the Bill now be read a third time.",
        "That the Bill will be now read a second time.",
        "That the House sit in private.",
        "That the clause be read a Second time.",
        "the Bill be now read a Second time.",
        "the Bill be now read the Third time.",
        "That the original words stand part of the Question",
        "That this House authorises",
        "That this House do now adjourn.",
    ])
    .pattern(r"Question, That new clause \d+ be added to the Bill.")
    .pattern(r"^That this House,? at its rising")
    .pattern(r"^Amendment ([a-zA-Z]+) proposed in lieu of Lords amendment \d+")
    .pattern(
        r"^Amendments? \((?:[a-zA-Z]+(?: and )?)+\) proposed in lieu of Lords amendments? \d+[A-Z]?(?:, \d+[A-Z]?)*(?: and \d+[A-Z]?)?",
    )
    .pattern(r"^Amendments \([a-zA-Z]+\) to \([a-zA-Z]+\) proposed in lieu of Lords amendment \d+[A-Z]?")
    .pattern(r"^That the .+ be approved")
    .pattern(r"^That an humble Address be presented to (His|Her) Majesty.*?be annulled\.$")
    .pattern(r"The question is, that amendment \d+ be agreed to\. Are we(?: all)? agreed\?");

    ExtractionCues {
        end_motion: PhraseDetector::phrases(["I rise to continue the debate"]),
        resolved_start,
        malformed_start: PhraseDetector::new().pattern(r"^That the draft"),
        jump_in: PhraseDetector::new().pattern(r"^[‘“]\(1\)"),
        sequence_start: PhraseDetector::new().pattern(r"^That this House"),
        motion_start,
        one_line_motion,
        asked_immediately: PhraseDetector::phrases(["Question put forthwith"]),
        discussion_mode: PhraseDetector::phrases(["discuss the following:"]),
        // (1) (10) (a) (iii) (1zb)
        subitem: PhraseDetector::new().pattern(r"^\((\d+[a-zA-Z]*|[a-z]+|\d*)\)"),
        valid_ender: PhraseDetector::new().pattern(r#"[.”"]$"#),
        continuation: PhraseDetector::new().pattern(r"[,;\-–—‑]$"),
        ends_alphanumeric: PhraseDetector::new().pattern(r"[a-zA-Z0-9]+$"),
        inserted: PhraseDetector::new().pattern(r"^“(.+)”\.*$"),
        new_clause: PhraseDetector::new().pattern(r"^new clause\b."),
        // e.g. "—(Jacob C. Young.)"
        signature_close: PhraseDetector::new().pattern(r"—\([A-Za-z\.\s]+\.\)$"),
        inline_amendment: PhraseDetector::new()
            .pattern(r"^new clause \d+—")
            .pattern(r"^amendment \d+,")
            .pattern(r"^amendment proposed: \d+")
            .pattern(r"^amendment made: \d+"),
        amendment_explainer: PhraseDetector::new()
            .starts_with("This Amendment")
            .starts_with("This probing Amendment")
            .starts_with("This amendment would ensure"),
        registry_reference: ComplexPhrase::new(
            PhraseDetector::new().pattern(r"\b[A-Z0-9]{3}-[0-9]{5}\.?[0-9]?\b"),
            PhraseDetector::phrases([
                "To ask the Scottish Government",
                "To ask the First Minister when",
                "as amended",
            ])
            .pattern(r"\([A-Z0-9]{3}-[0-9]{5}\.?[0-9]?\)$"),
        ),
        disagree_with_lords: PhraseDetector::new()
            .pattern(r"disagrees with lords amendment [a-zA-Z0-9]+\.?$"),
    }
});

/// Extract the motions of one transcript.
///
/// The registry is only consulted for Scottish transcripts. Registry
/// problems never abort extraction: the affected motion is dropped and the
/// scan continues.
pub fn extract_motions(
    transcript: &Transcript,
    registry: Option<&MotionRegistry>,
) -> MotionCollection {
    let registry = match transcript.chamber {
        Chamber::Scotland => registry,
        _ => None,
    };
    let groups = transcript.headed_speeches();
    let mut scan = Scan {
        date: &transcript.date,
        chamber: transcript.chamber,
        registry,
        current: None,
        collection: MotionCollection::new(),
        pending_heading_carry: false,
    };

    for (group_index, group) in groups.iter().enumerate() {
        let previous = group_index.checked_sub(1).map(|i| groups[i].speech);
        if let (Some(previous), Some(speaker)) = (previous, group.speech.speaker()) {
            if previous.speaker() != Some(speaker) {
                scan.close("new speaker");
            }
        }
        let next_group = groups.get(group_index + 1);
        scan.speech(group, next_group);
    }

    scan.close("end of transcript");
    scan.collection.prune();
    scan.collection
}

struct Scan<'a> {
    date: &'a str,
    chamber: Chamber,
    registry: Option<&'a MotionRegistry>,
    current: Option<Motion>,
    collection: MotionCollection,
    /// A speech ended mid-motion on a continuation mark: the next minor
    /// heading is really part of the motion text.
    pending_heading_carry: bool,
}

impl<'a> Scan<'a> {
    fn open(&self, group: &HeadedSpeech<'_>, pid: String) -> Motion {
        Motion::new(self.date, self.chamber, &group.speech.id)
            .with_start_pid(pid)
            .with_major_heading(group.major_heading_id(), group.major_heading_text())
            .with_minor_heading(group.minor_heading_id(), group.minor_heading_text())
    }

    fn finish(&mut self, motion: Motion, reason: &str) {
        self.pending_heading_carry = false;
        self.collection.push(motion.finish(reason, self.registry));
    }

    fn close(&mut self, reason: &str) {
        if let Some(motion) = self.current.take() {
            self.finish(motion, reason);
        }
    }

    /// Look one paragraph ahead: the rest of this speech, or the first
    /// paragraph of the next speech if it sits under the same headings.
    /// Across a heading change there is nothing to look at, which lets a
    /// motion ending on a continuation mark pick up the next heading.
    fn lookahead<'g>(
        group: &'g HeadedSpeech<'_>,
        next_group: Option<&'g HeadedSpeech<'_>>,
        index: usize,
    ) -> Option<&'g Paragraph> {
        if let Some(p) = group.speech.paragraphs.get(index + 1) {
            return Some(p);
        }
        next_group
            .filter(|n| {
                n.major_heading_id() == group.major_heading_id()
                    && n.minor_heading_id() == group.minor_heading_id()
            })
            .and_then(|n| n.speech.paragraphs.first())
    }

    /// Returns true when the paragraph was fully handled as a registry
    /// motion. The caller then skips the remaining cues for that paragraph,
    /// so a resolved-start phrase on the same line cannot open a second
    /// motion with the same gid.
    fn registry_motion(&mut self, group: &HeadedSpeech<'_>, index: usize, paragraph: &Paragraph) -> bool {
        let Some(registry) = self.registry else {
            return false;
        };
        let ids = extract_motion_ids(&paragraph.text);
        match ids.as_slice() {
            [] => false,
            [id] => {
                if !CUES.registry_reference.matches(&paragraph.text) {
                    return false;
                }
                self.close("registry reference");
                let pid = paragraph
                    .pid
                    .clone()
                    .unwrap_or_else(|| format!("subitem/{index}"));
                let mut motion = self.open(group, pid);
                motion.add_line(paragraph.line_text(), &group.speech.id);
                match registry.lookup(id) {
                    Ok(entry) => {
                        motion.add_line(entry.item_text, "");
                        motion.add_flag(Flag::ScottishExpandedMotion);
                        self.finish(motion, "registry motion");
                        true
                    }
                    Err(e) => {
                        obs::emit_registry_miss(id, &group.speech.id, &e);
                        false
                    }
                }
            }
            many => {
                warn!(
                    speech_id = %group.speech.id,
                    ids = %many.join(","),
                    "several registry identifiers in one paragraph; discarding open motion"
                );
                self.current = None;
                false
            }
        }
    }

    fn speech(&mut self, group: &HeadedSpeech<'_>, next_group: Option<&HeadedSpeech<'_>>) {
        let cues = &*CUES;
        let speech_id = group.speech.id.as_str();
        let mut discussion_mode = false;

        for (index, paragraph) in group.speech.paragraphs.iter().enumerate() {
            let text = paragraph.text.as_str();
            let next = Self::lookahead(group, next_group, index);
            let pid = || paragraph.pid.clone().unwrap_or_default();

            if self.registry_motion(group, index, paragraph) {
                continue;
            }

            if cues.discussion_mode.matches(text) || cues.inline_amendment.matches(text) {
                discussion_mode = true;
            }

            if self.pending_heading_carry && index == 0 {
                self.pending_heading_carry = false;
                if let (Some(motion), Some(heading)) = (self.current.as_mut(), group.minor_heading) {
                    motion.add_line(heading.to_string(), &heading.id);
                }
            }

            // First paragraph under a "New clause N" heading opens a clause motion.
            if index == 0 && group.speech_index == 0 {
                if let Some(heading) = group.minor_heading {
                    if cues.new_clause.matches(&heading.text) {
                        self.close("new clause clean up");
                        let mut motion = self.open(group, pid());
                        motion.add_line(heading.to_string(), &heading.id);
                        motion.add_flag(Flag::ClauseMotion);
                        motion.add_flag(Flag::ComplexMotion);
                        self.current = Some(motion);
                    }
                }
            }

            if cues.sequence_start.matches(text)
                && self
                    .current
                    .as_ref()
                    .is_some_and(|m| m.text().to_lowercase().contains("that this house"))
            {
                self.close("new motion");
            }

            if self.current.is_none()
                && (cues.motion_start.matches(text) || cues.malformed_start.matches(text))
            {
                let mut motion = self.open(group, pid());
                if cues.resolved_start.matches(text) {
                    motion.add_flag(Flag::AfterDecision);
                }
                self.current = Some(motion);
            }

            if self.current.is_none()
                && cues.inline_amendment.matches(text)
                && cues.signature_close.matches(text)
            {
                let mut motion = self.open(group, pid());
                motion.add_line(paragraph.line_text(), speech_id);
                self.finish(motion, "one line inline amendment close");
                continue;
            }

            // Amendment text restated before a vote, with no speaker attached.
            if self.current.is_none()
                && group.speech.speaker().is_none()
                && cues.jump_in.matches(text)
            {
                let mut motion = self.open(group, pid());
                motion.add_line(paragraph.line_text(), speech_id);
                motion.add_flag(Flag::ComplexMotion);
                self.current = Some(motion);
                continue;
            }

            if discussion_mode {
                if cues.inline_amendment.matches(text) {
                    self.close("in line amendment");
                    self.current = Some(self.open(group, pid()).with_flag(Flag::InlineAmendment));
                }
                if cues.amendment_explainer.matches(text) && self.current.is_some() {
                    self.close("amendment explainer");
                    continue;
                }
            }

            let Some(mut motion) = self.current.take() else {
                continue;
            };

            if cues.end_motion.matches(text) {
                self.finish(motion, "end motion");
                continue;
            }

            if motion.is_empty() {
                motion.add_line(paragraph.line_text(), speech_id);
                if cues.one_line_motion.matches(text)
                    || cues.disagree_with_lords.matches(text)
                    || cues.signature_close.matches(text)
                {
                    motion.add_flag(Flag::OneLineMotion);
                    self.finish(motion, "one line motion");
                } else {
                    self.current = Some(motion);
                }
                continue;
            }

            if cues.asked_immediately.matches(text) {
                motion.add_flag(Flag::AskedImmediately);
                self.finish(motion, "asked immediately");
                continue;
            }

            motion.add_line(paragraph.line_text(), speech_id);
            let continues = cues.continuation.matches(text);
            if cues.subitem.matches(text) || continues {
                motion.add_flag(Flag::ComplexMotion);
            }

            if cues.signature_close.matches(text) {
                self.finish(motion, "amendment closed with name");
                continue;
            }

            if !motion.has_flag(Flag::ComplexMotion) {
                if cues.valid_ender.matches(text) {
                    self.finish(motion, "valid end character");
                } else {
                    self.current = Some(motion);
                }
                continue;
            }

            // Complex motions run over sub-items and inserted text; only stop
            // when the next paragraph clearly starts something else.
            match next {
                Some(next)
                    if !continues
                        && !cues.subitem.matches(&next.text)
                        && !cues.ends_alphanumeric.matches(&next.text)
                        && !cues.inserted.matches(&next.text)
                        && !cues.signature_close.matches(&next.text)
                        && !next.is_table() =>
                {
                    self.finish(motion, "complex motion complete");
                }
                Some(_) => self.current = Some(motion),
                None if continues => {
                    self.current = Some(motion);
                    self.pending_heading_carry = true;
                }
                None => self.finish(motion, "no further input"),
            }
        }
    }
}
