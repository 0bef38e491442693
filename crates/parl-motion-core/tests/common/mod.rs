//! Transcript fixtures shared by the integration tests.

#![allow(dead_code)]

use parl_motion_core::{
    Chamber, DivisionRecord, Flag, Heading, Motion, Paragraph, Speech, Transcript, TranscriptItem,
};

/// Builds transcripts item by item. Paragraph ids are `<speech id>/<n>`,
/// counting from 1, so a motion starting at the first paragraph of speech
/// `d.1.2` has gid `d.1.2.1`.
pub struct TranscriptBuilder {
    date: String,
    chamber: Chamber,
    items: Vec<TranscriptItem>,
}

impl TranscriptBuilder {
    pub fn new(date: &str) -> Self {
        Self {
            date: date.to_string(),
            chamber: Chamber::Commons,
            items: Vec::new(),
        }
    }

    pub fn chamber(mut self, chamber: Chamber) -> Self {
        self.chamber = chamber;
        self
    }

    pub fn major(mut self, id: &str, text: &str) -> Self {
        self.items.push(TranscriptItem::MajorHeading(Heading {
            id: id.to_string(),
            text: text.to_string(),
        }));
        self
    }

    pub fn minor(mut self, id: &str, text: &str) -> Self {
        self.items.push(TranscriptItem::MinorHeading(Heading {
            id: id.to_string(),
            text: text.to_string(),
        }));
        self
    }

    pub fn speech(mut self, id: &str, person: Option<&str>, paragraphs: &[&str]) -> Self {
        self.items.push(TranscriptItem::Speech(Speech {
            id: id.to_string(),
            person_id: person.map(str::to_string),
            speaker_name: person.map(|p| format!("Member {p}")),
            paragraphs: paragraphs
                .iter()
                .enumerate()
                .map(|(i, text)| Paragraph::new(*text).with_pid(format!("{id}/{}", i + 1)))
                .collect(),
        }));
        self
    }

    pub fn division(mut self, id: &str, number: u32) -> Self {
        self.items.push(TranscriptItem::Division(DivisionRecord {
            id: id.to_string(),
            number: Some(number),
            ayes: Some(310),
            noes: Some(205),
        }));
        self
    }

    pub fn build(self) -> Transcript {
        Transcript::new(self.date, self.chamber, self.items)
    }
}

/// A hand-made motion without a paragraph id, so its gid is `speech_id`.
pub fn motion(date: &str, speech_id: &str, major_heading_id: &str, lines: &[&str], flags: &[Flag]) -> Motion {
    let mut motion = Motion::new(date, Chamber::Commons, speech_id)
        .with_major_heading(major_heading_id, "")
        .with_lines(lines.iter().copied());
    for flag in flags {
        motion.add_flag(*flag);
    }
    motion
}

/// One motion, then a division on it, under a single heading.
pub fn second_reading_debate() -> Transcript {
    TranscriptBuilder::new("2024-04-24")
        .major("d.1.0", "Finance Bill")
        .speech(
            "d.1.1",
            Some("p1"),
            &["I beg to move, That the Bill be now read a Second time."],
        )
        .speech("d.1.2", Some("p2"), &["Question put."])
        .division("d.1.3", 101)
        .build()
}
