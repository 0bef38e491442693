//! Transcript model consumed by the extractor and the decision locator.
//!
//! A transcript is an ordered list of items (headings, speeches and recorded
//! divisions) for one chamber on one date. Parsing the publisher's XML is a
//! separate concern; this module accepts the already-structured form as JSON.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{MotionError, Result};

/// Legislature a transcript belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Chamber {
    #[default]
    Commons,
    Lords,
    Scotland,
    Wales,
    NorthernIreland,
}

impl Chamber {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chamber::Commons => "commons",
            Chamber::Lords => "lords",
            Chamber::Scotland => "scotland",
            Chamber::Wales => "wales",
            Chamber::NorthernIreland => "northern_ireland",
        }
    }
}

impl fmt::Display for Chamber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Chamber {
    type Err = MotionError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "commons" | "house-of-commons" => Ok(Chamber::Commons),
            "lords" | "house-of-lords" => Ok(Chamber::Lords),
            "scotland" | "scottish-parliament" => Ok(Chamber::Scotland),
            "wales" | "senedd" => Ok(Chamber::Wales),
            "northern_ireland" | "northern-ireland-assembly" => Ok(Chamber::NorthernIreland),
            other => Err(MotionError::InputValidation(format!(
                "unknown chamber: {other}"
            ))),
        }
    }
}

/// A major or minor heading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Heading {
    pub id: String,
    pub text: String,
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text.trim())
    }
}

/// Structured table content carried by a paragraph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Rows of cell text; the first row is the header.
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Render as a pipe-delimited markdown table. Returns `None` when there
    /// is no header row to anchor the layout.
    pub fn to_markdown(&self) -> Option<String> {
        let (header, body) = self.rows.split_first()?;
        if header.is_empty() {
            return None;
        }
        let width = header.len();
        let render_row = |cells: &[String]| {
            let mut padded: Vec<&str> = cells.iter().map(|c| c.trim()).collect();
            padded.resize(width, "");
            format!("| {} |", padded[..width].join(" | "))
        };
        let mut lines = vec![render_row(header)];
        lines.push(format!("|{}|", vec!["---"; width].join("|")));
        lines.extend(body.iter().map(|r| render_row(r)));
        Some(lines.join("\n"))
    }
}

/// A text fragment inside a speech.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Local paragraph identifier (e.g. `a123.4/2`), when the source has one.
    #[serde(default)]
    pub pid: Option<String>,
    pub text: String,
    #[serde(default)]
    pub table: Option<Table>,
}

impl Paragraph {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            pid: None,
            text: text.into(),
            table: None,
        }
    }

    pub fn with_pid(mut self, pid: impl Into<String>) -> Self {
        self.pid = Some(pid.into());
        self
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    pub fn is_table(&self) -> bool {
        self.table.is_some()
    }

    /// Text used when the paragraph becomes a motion line: tables render as
    /// markdown, everything else uses the canonical text.
    pub fn line_text(&self) -> String {
        let text = match &self.table {
            Some(table) => table.to_markdown().unwrap_or_else(|| self.text.clone()),
            None => self.text.clone(),
        };
        text.replace('\u{a0}', " ")
    }
}

impl fmt::Display for Paragraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// A speech: an attributed, ordered run of paragraphs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    pub id: String,
    #[serde(default)]
    pub person_id: Option<String>,
    #[serde(default)]
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub paragraphs: Vec<Paragraph>,
}

impl Speech {
    /// Speaker identifier, treating an empty string as unattributed.
    pub fn speaker(&self) -> Option<&str> {
        self.person_id.as_deref().filter(|p| !p.is_empty())
    }
}

impl fmt::Display for Speech {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<&str> = self.paragraphs.iter().map(|p| p.text.as_str()).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// A recorded vote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivisionRecord {
    pub id: String,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub ayes: Option<u32>,
    #[serde(default)]
    pub noes: Option<u32>,
}

impl fmt::Display for DivisionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(n) => write!(f, "Division No. {n}")?,
            None => f.write_str("Division")?,
        }
        if let (Some(ayes), Some(noes)) = (self.ayes, self.noes) {
            write!(f, ": Ayes {ayes}, Noes {noes}")?;
        }
        Ok(())
    }
}

/// One item of a transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TranscriptItem {
    MajorHeading(Heading),
    MinorHeading(Heading),
    Speech(Speech),
    Division(DivisionRecord),
}

impl TranscriptItem {
    pub fn id(&self) -> &str {
        match self {
            TranscriptItem::MajorHeading(h) | TranscriptItem::MinorHeading(h) => &h.id,
            TranscriptItem::Speech(s) => &s.id,
            TranscriptItem::Division(d) => &d.id,
        }
    }
}

impl fmt::Display for TranscriptItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptItem::MajorHeading(h) | TranscriptItem::MinorHeading(h) => h.fmt(f),
            TranscriptItem::Speech(s) => s.fmt(f),
            TranscriptItem::Division(d) => d.fmt(f),
        }
    }
}

/// One speech together with its heading context.
#[derive(Debug, Clone, Copy)]
pub struct HeadedSpeech<'a> {
    pub major_heading: Option<&'a Heading>,
    pub minor_heading: Option<&'a Heading>,
    pub speech: &'a Speech,
    /// Position of this speech under its minor heading (0 for the first).
    pub speech_index: usize,
}

impl<'a> HeadedSpeech<'a> {
    pub fn major_heading_id(&self) -> &'a str {
        self.major_heading.map(|h| h.id.as_str()).unwrap_or("")
    }

    pub fn minor_heading_id(&self) -> &'a str {
        self.minor_heading.map(|h| h.id.as_str()).unwrap_or("")
    }

    pub fn major_heading_text(&self) -> String {
        self.major_heading.map(|h| h.to_string()).unwrap_or_default()
    }

    pub fn minor_heading_text(&self) -> String {
        self.minor_heading.map(|h| h.to_string()).unwrap_or_default()
    }
}

/// An ordered transcript for one chamber and date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// ISO date (`YYYY-MM-DD`).
    pub date: String,
    pub chamber: Chamber,
    pub items: Vec<TranscriptItem>,
}

impl Transcript {
    pub fn new(date: impl Into<String>, chamber: Chamber, items: Vec<TranscriptItem>) -> Self {
        Self {
            date: date.into(),
            chamber,
            items,
        }
    }

    /// Load a transcript from a JSON file.
    pub fn from_json_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            MotionError::InputValidation(format!("{}: {e}", path.display()))
        })
    }

    /// Reject transcripts the rest of the pipeline cannot reason about.
    pub fn validate(&self) -> Result<()> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|e| {
            MotionError::InputValidation(format!("bad transcript date {:?}: {e}", self.date))
        })?;

        let mut seen = HashSet::new();
        for (index, item) in self.items.iter().enumerate() {
            let id = item.id();
            if id.trim().is_empty() {
                return Err(MotionError::InputValidation(format!(
                    "item {index} on {} has an empty id",
                    self.date
                )));
            }
            if !seen.insert(id) {
                return Err(MotionError::InputValidation(format!(
                    "duplicate item id {id} on {}",
                    self.date
                )));
            }
        }
        Ok(())
    }

    pub fn speeches(&self) -> impl Iterator<Item = &Speech> {
        self.items.iter().filter_map(|item| match item {
            TranscriptItem::Speech(s) => Some(s),
            _ => None,
        })
    }

    /// Speeches in document order with the headings in force at each.
    pub fn headed_speeches(&self) -> Vec<HeadedSpeech<'_>> {
        let mut groups = Vec::new();
        let mut major = None;
        let mut minor = None;
        let mut speech_index = 0;
        for item in &self.items {
            match item {
                TranscriptItem::MajorHeading(h) => {
                    major = Some(h);
                    minor = None;
                    speech_index = 0;
                }
                TranscriptItem::MinorHeading(h) => {
                    minor = Some(h);
                    speech_index = 0;
                }
                TranscriptItem::Speech(speech) => {
                    groups.push(HeadedSpeech {
                        major_heading: major,
                        minor_heading: minor,
                        speech,
                        speech_index,
                    });
                    speech_index += 1;
                }
                TranscriptItem::Division(_) => {}
            }
        }
        groups
    }
}
