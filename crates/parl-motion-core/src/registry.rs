//! Scottish Parliament motion registry.
//!
//! The registry maps identifiers such as `S6M-12345` (or the amendment form
//! `S6M-12345.1`) to the full lodged text. It is loaded once per run from a
//! cached JSON dump and shared read-only between workers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::decision::Decision;
use crate::error::{MotionError, RegistryError, Result};
use crate::motion::Motion;
use crate::transcript::Chamber;

/// Public dump of all motions, questions and answers.
pub const DEFAULT_REGISTRY_URL: &str =
    "https://data.parliament.scot/api/motionsquestionsanswersmotions/json";

/// Identifiers that appear misprinted in the official report.
const ALIASES: &[(&str, &str)] = &[
    ("S6M-133651.1", "S6M-13365.1"),
    ("S6M-081050", "S6M-08150"),
    ("S6M-011247", "S6M-11247"),
];

static MOTION_ID_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z0-9]{3}-[0-9]{5}(\.[0-9])?$").unwrap());

static EMBEDDED_MOTION_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[A-Z0-9]{3}-[0-9]{5}\.?[0-9]?\b").unwrap());

/// Registry identifiers cited in `text`.
///
/// Repeats collapse to one entry, and an identifier contained in a longer
/// one (`S6M-12345` inside `S6M-12345.1`) is dropped in favour of the
/// longer form.
pub fn extract_motion_ids(text: &str) -> Vec<String> {
    let mut found: Vec<&str> = Vec::new();
    for m in EMBEDDED_MOTION_ID.find_iter(text) {
        if !found.contains(&m.as_str()) {
            found.push(m.as_str());
        }
    }
    found
        .iter()
        .filter(|id| !found.iter().any(|other| other != *id && other.contains(**id)))
        .map(|id| id.to_string())
        .collect()
}

/// One lodged motion as published in the dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    #[serde(rename = "UniqueID")]
    pub unique_id: i64,
    #[serde(rename = "EventID")]
    pub event_id: String,
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "ItemText")]
    pub item_text: String,
}

impl RegistryEntry {
    pub fn display_title(&self) -> String {
        format!("{}: {}", self.event_id, self.title.trim())
    }
}

/// Read-only lookup from motion identifier to lodged text.
#[derive(Debug, Clone, Default)]
pub struct MotionRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl MotionRegistry {
    pub fn from_entries(entries: impl IntoIterator<Item = RegistryEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.item_text = entry.item_text.trim().to_string();
                (entry.event_id.clone(), entry)
            })
            .collect();
        Self { entries }
    }

    /// Load the cached JSON dump.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<RegistryEntry> = serde_json::from_str(&raw)?;
        info!(path = %path.display(), entries = entries.len(), "loaded motion registry");
        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve an identifier to its entry.
    ///
    /// Amendment identifiers (`XXX-NNNNN.N`) come back with the parent
    /// motion's text appended for context.
    pub fn lookup(&self, motion_id: &str) -> std::result::Result<RegistryEntry, RegistryError> {
        let motion_id = ALIASES
            .iter()
            .find(|(from, _)| *from == motion_id)
            .map(|(_, to)| *to)
            .unwrap_or(motion_id);

        let Some(entry) = self.entries.get(motion_id) else {
            return Err(if MOTION_ID_FORMAT.is_match(motion_id) {
                RegistryError::NotFound(motion_id.to_string())
            } else {
                RegistryError::InvalidFormat(motion_id.to_string())
            });
        };

        let mut entry = entry.clone();
        if let Some((parent_id, _)) = motion_id.split_once('.') {
            if let Some(parent) = self.entries.get(parent_id) {
                entry.item_text = format!(
                    "{}\n\nOriginal motion({}):\n{}",
                    entry.item_text, parent.event_id, parent.item_text
                );
            }
        }
        Ok(entry)
    }

    /// Build a motion for `decision` from the registry text of `motion_id`.
    pub fn construct_from_decision(
        &self,
        motion_id: &str,
        decision: &Decision,
    ) -> std::result::Result<Motion, RegistryError> {
        let entry = self.lookup(motion_id)?;
        let mut motion = Motion::new(decision.date(), Chamber::Scotland, decision.speech_id())
            .with_start_pid(decision.paragraph_pid())
            .with_lines(entry.item_text.split('\n'));
        motion.major_heading_id = decision.major_heading_id().to_string();
        motion.minor_heading_id = decision.minor_heading_id().to_string();
        motion.motion_title = entry.title;
        Ok(motion)
    }
}

/// Download the registry dump to `dest` unless it is already cached.
pub async fn download_registry(url: &str, dest: &Path, force: bool) -> Result<PathBuf> {
    if dest.exists() && !force {
        info!(path = %dest.display(), "motion registry already cached");
        return Ok(dest.to_path_buf());
    }
    if let Some(parent) = dest.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("parl-motion/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(30))
        .build()?;

    info!(url = %url, "downloading motion registry");
    let response = client.get(url).send().await?.error_for_status()?;
    let body = response.bytes().await?;

    // Refuse to cache something that will not load later.
    serde_json::from_slice::<Vec<RegistryEntry>>(&body).map_err(|e| {
        MotionError::Http(format!("registry download from {url} is not a motion list: {e}"))
    })?;

    tokio::fs::write(dest, &body).await?;
    info!(path = %dest.display(), bytes = body.len(), "motion registry cached");
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, text: &str) -> RegistryEntry {
        RegistryEntry {
            unique_id: 1,
            event_id: id.to_string(),
            title: format!("Title of {id}"),
            item_text: format!("  {text}  "),
        }
    }

    fn registry() -> MotionRegistry {
        MotionRegistry::from_entries([
            entry("S6M-12345", "That the Parliament agrees the budget."),
            entry("S6M-12345.1", "As an amendment to motion S6M-12345, leave out everything."),
            entry("S6M-08150", "That the Parliament notes the report."),
        ])
    }

    #[test]
    fn extract_keeps_longest_identifier() {
        let ids = extract_motion_ids("amendment S6M-12345.1 to motion S6M-12345, and S6M-12345.1 again");
        assert_eq!(ids, vec!["S6M-12345.1".to_string()]);
    }

    #[test]
    fn extract_ignores_trailing_full_stop() {
        let ids = extract_motion_ids("The next item is motion S6M-08150.");
        assert_eq!(ids, vec!["S6M-08150".to_string()]);
    }

    #[test]
    fn lookup_appends_parent_text_for_amendments() {
        let e = registry().lookup("S6M-12345.1").expect("amendment present");
        assert!(e.item_text.starts_with("As an amendment"));
        assert!(e.item_text.contains("Original motion(S6M-12345):\nThat the Parliament agrees"));
    }

    #[test]
    fn lookup_is_repeatable() {
        let r = registry();
        let first = r.lookup("S6M-12345.1").expect("first");
        let second = r.lookup("S6M-12345.1").expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn lookup_applies_aliases() {
        let e = registry().lookup("S6M-081050").expect("alias resolves");
        assert_eq!(e.event_id, "S6M-08150");
    }

    #[test]
    fn lookup_distinguishes_missing_from_malformed() {
        let r = registry();
        assert_eq!(
            r.lookup("S6M-99999"),
            Err(RegistryError::NotFound("S6M-99999".to_string()))
        );
        assert_eq!(
            r.lookup("S6M-9"),
            Err(RegistryError::InvalidFormat("S6M-9".to_string()))
        );
    }

    #[test]
    fn entries_deserialize_from_pascal_case() {
        let raw = r#"[{"UniqueID": 7, "EventID": "S6M-00001", "Title": "Budget", "ItemText": "Text "}]"#;
        let entries: Vec<RegistryEntry> = serde_json::from_str(raw).expect("parse dump");
        let r = MotionRegistry::from_entries(entries);
        let e = r.lookup("S6M-00001").expect("present");
        assert_eq!(e.item_text, "Text");
        assert_eq!(e.display_title(), "S6M-00001: Budget");
    }
}
