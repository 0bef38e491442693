//! Hand-maintained decision/motion links.
//!
//! The override file is a JSON list whose entries either link a motion to a
//! decision by gid, or supply the full motion text for a decision whose
//! motion never appears in the transcript. Gids may use `x` as the
//! transcript-version letter after the date (`.../2025-11-05x.996.4`) to
//! match every published version of that day's debate.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::motion::Motion;

/// Version letter that matches any other.
pub const WILDCARD_VERSION: char = 'x';

static VERSIONED_GID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*/\d{4}-\d{2}-\d{2})([a-z])(\..*)$").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualLink {
    pub decision_gid: String,
    pub motion_gid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualText {
    pub decision_gid: String,
    pub motion: Motion,
}

/// One entry of the override file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ManualEntry {
    Link(ManualLink),
    Text(ManualText),
}

/// Whether `gid` matches `pattern`, honouring the wildcard version letter.
///
/// Gids without a recognisable `<date><letter>.` segment only match exactly.
pub fn gid_matches_pattern(gid: &str, pattern: &str) -> bool {
    let (Some(g), Some(p)) = (VERSIONED_GID.captures(gid), VERSIONED_GID.captures(pattern)) else {
        return gid == pattern;
    };
    if g[1] != p[1] || g[3] != p[3] {
        return false;
    }
    let wildcard = WILDCARD_VERSION.to_string();
    g[2] == p[2] || g[2] == wildcard || p[2] == wildcard
}

/// Decision gid linked to `motion_gid`, preferring an exact entry over a
/// wildcard one. Among several wildcard hits the earliest link wins.
pub fn find_manual_connection<'a>(motion_gid: &str, links: &'a [ManualLink]) -> Option<&'a str> {
    links
        .iter()
        .find(|link| link.motion_gid == motion_gid)
        .or_else(|| {
            links
                .iter()
                .find(|link| gid_matches_pattern(motion_gid, &link.motion_gid))
        })
        .map(|link| link.decision_gid.as_str())
}

/// Override table, loaded once per run and shared read-only.
///
/// Entries keep file order. A later entry for the same key replaces the
/// earlier one in place.
#[derive(Debug, Clone, Default)]
pub struct ManualOverrides {
    links: Vec<ManualLink>,
    texts: Vec<ManualText>,
}

impl ManualOverrides {
    pub fn from_entries(entries: impl IntoIterator<Item = ManualEntry>) -> Self {
        let mut overrides = Self::default();
        for entry in entries {
            match entry {
                ManualEntry::Link(link) => {
                    match overrides.links.iter_mut().find(|l| l.motion_gid == link.motion_gid) {
                        Some(existing) => *existing = link,
                        None => overrides.links.push(link),
                    }
                }
                ManualEntry::Text(text) => {
                    match overrides
                        .texts
                        .iter_mut()
                        .find(|t| t.decision_gid == text.decision_gid)
                    {
                        Some(existing) => *existing = text,
                        None => overrides.texts.push(text),
                    }
                }
            }
        }
        overrides
    }

    /// Load the override file; a missing file means no overrides.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no manual override file");
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<ManualEntry> = serde_json::from_str(&raw)?;
        Ok(Self::from_entries(entries))
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty() && self.texts.is_empty()
    }

    pub fn linked_decision(&self, motion_gid: &str) -> Option<&str> {
        find_manual_connection(motion_gid, &self.links)
    }

    pub fn motion_text(&self, decision_gid: &str) -> Option<&Motion> {
        self.texts
            .iter()
            .find(|t| t.decision_gid == decision_gid)
            .or_else(|| {
                self.texts
                    .iter()
                    .find(|t| gid_matches_pattern(decision_gid, &t.decision_gid))
            })
            .map(|t| &t.motion)
    }
}
