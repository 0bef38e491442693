//! Decision locator: finds divisions and declared agreements in a transcript.

use std::sync::LazyLock;

use crate::decision::{Agreement, AgreementTrigger, Division};
use crate::detector::PhraseDetector;
use crate::transcript::{Transcript, TranscriptItem};

struct AgreementCues {
    agreement_made: PhraseDetector,
    amendment_agreed: PhraseDetector,
    amended_agreement: PhraseDetector,
    restated_result: PhraseDetector,
}

static CUES: LazyLock<AgreementCues> = LazyLock::new(|| AgreementCues {
    agreement_made: PhraseDetector::phrases([
        "Question put and agreed to.",
        "Question agreed to.",
        "read the First and Second time, and added to the Bill.",
        "question put and agreed to",
        "main question accordingly put and agreed to",
        "question put and agreed",
        "question agreed to",
        "Question put and agree d to",
        "Main Question put accordingly and agreed to",
        "Question put (Standing Order No. 23) and agreed to",
        "Main Question, as amended, put and agreed to",
        "Main Question, as amended, put forthwith and agreed to",
        "Question put forthwith (Standing Order No. 163) and negatived",
        "Brought up, read the First and Second time, and added to the Bill",
        "Brought up, read the First Time and Second Time and added to the Bill",
        "Question put (Standing Order No.23) and agreed to.",
        "Motion agreed to,",
    ]),
    amendment_agreed: PhraseDetector::new()
        .pattern(r"^Amendment.{1,5}?agreed to")
        .pattern(r"Amendments? \d+( and \d+)* moved—\[.*?\]—and agreed to\."),
    amended_agreement: PhraseDetector::phrases([
        "Main Question, as amended, put and agreed to",
        "Main Question, as amended, put forthwith and agreed to",
        "The Deputy Speaker declared the main Question, as amended, to be agreed to (Standing Order No. 31(2)).",
    ]),
    // Scottish divisions restate the outcome after the vote; that restatement
    // is not a separate agreement.
    restated_result: PhraseDetector::new().pattern(r"^The result of the division (on|is)"),
});

/// Every division in document order with the text either side of it.
pub fn get_divisions(transcript: &Transcript) -> Vec<Division> {
    let mut divisions = Vec::new();
    let mut major = None;
    let mut minor = None;

    for (index, item) in transcript.items.iter().enumerate() {
        match item {
            TranscriptItem::MajorHeading(h) => {
                major = Some(h);
                minor = None;
            }
            TranscriptItem::MinorHeading(h) => minor = Some(h),
            TranscriptItem::Division(record) => {
                let preceding_text = match index.checked_sub(1).map(|i| &transcript.items[i]) {
                    Some(TranscriptItem::Speech(s)) => {
                        s.paragraphs.last().map(|p| p.text.clone()).unwrap_or_default()
                    }
                    _ => String::new(),
                };
                let after_text = match transcript.items.get(index + 1) {
                    Some(TranscriptItem::Speech(s)) => {
                        s.paragraphs.first().map(|p| p.text.clone()).unwrap_or_default()
                    }
                    Some(other) => other.to_string(),
                    None => String::new(),
                };
                divisions.push(Division {
                    date: transcript.date.clone(),
                    chamber: transcript.chamber,
                    major_heading_id: major.map(|h| h.id.clone()).unwrap_or_default(),
                    major_heading_title: major.map(|h| h.to_string()).unwrap_or_default(),
                    minor_heading_id: minor.map(|h| h.id.clone()).unwrap_or_default(),
                    minor_heading_text: minor.map(|h| h.to_string()).unwrap_or_default(),
                    division_id: record.id.clone(),
                    preceding_text,
                    after_text,
                    motion: None,
                    motion_assignment_reason: String::new(),
                });
            }
            TranscriptItem::Speech(_) => {}
        }
    }
    divisions
}

/// Classify one paragraph, later cues taking precedence over earlier ones.
fn agreement_trigger(text: &str, preceding: &str) -> Option<AgreementTrigger> {
    let cues = &*CUES;
    let mut trigger = None;
    if cues.agreement_made.matches(text) {
        trigger = Some(AgreementTrigger::OneLineAgreement);
    }
    if cues.amendment_agreed.matches(text) {
        trigger = Some(AgreementTrigger::AmendmentAgreed);
    }
    if cues.amended_agreement.matches(text) {
        trigger = Some(AgreementTrigger::AmendedMotionAgreed);
    }
    if trigger.is_some() && cues.restated_result.matches(preceding) {
        return None;
    }
    trigger
}

/// Every declared agreement in document order.
pub fn get_agreements(transcript: &Transcript) -> Vec<Agreement> {
    let mut agreements = Vec::new();

    for group in transcript.headed_speeches() {
        let paragraphs = &group.speech.paragraphs;
        for (index, paragraph) in paragraphs.iter().enumerate() {
            let preceding_text = index
                .checked_sub(1)
                .map(|i| paragraphs[i].text.clone())
                .unwrap_or_default();
            let Some(trigger) = agreement_trigger(&paragraph.text, &preceding_text) else {
                continue;
            };
            let after_text = paragraphs
                .get(index + 1)
                .map(|p| p.text.clone())
                .unwrap_or_default();

            agreements.push(Agreement {
                date: transcript.date.clone(),
                chamber: transcript.chamber,
                major_heading_id: group.major_heading_id().to_string(),
                minor_heading_id: group.minor_heading_id().to_string(),
                major_heading_title: group.major_heading_text(),
                speech_id: group.speech.id.clone(),
                paragraph_pid: paragraph
                    .pid
                    .clone()
                    .unwrap_or_else(|| format!("para/{index}")),
                end_reason: trigger,
                agreed_text: paragraph.text.clone(),
                preceding_text,
                after_text,
                motion: None,
                motion_assignment_reason: String::new(),
            });
        }
    }
    agreements
}
