//! Per-date results, flat export records, packaging and golden snapshots.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::assignment::Assignment;
use crate::decision::{Agreement, Division};
use crate::error::{MotionError, Result};
use crate::motion::Motion;
use crate::title::is_placeholder_title;
use crate::transcript::Chamber;

/// Assigned decisions of one chamber/date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultsHolder {
    pub date: String,
    pub chamber: Chamber,
    #[serde(default)]
    pub divisions: Vec<Division>,
    #[serde(default)]
    pub agreements: Vec<Agreement>,
}

impl ResultsHolder {
    pub fn new(date: impl Into<String>, chamber: Chamber, assignment: Assignment) -> Self {
        Self {
            date: date.into(),
            chamber,
            divisions: assignment.divisions,
            agreements: assignment.agreements,
        }
    }

    pub fn file_name(chamber: Chamber, date: &str) -> String {
        format!("{}-{date}.json", chamber.as_str())
    }

    /// Write to `<dir>/<chamber>-<date>.json`.
    pub fn to_data_dir(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(Self::file_name(self.chamber, &self.date));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "wrote results");
        Ok(path)
    }

    pub fn from_data_dir(dir: &Path, chamber: Chamber, date: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(dir.join(Self::file_name(chamber, date)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Load every results file for `chamber` whose date starts with
    /// `date_prefix` ("2024", "2024-04", or a full date), in date order.
    pub fn load_matching(dir: &Path, chamber: Chamber, date_prefix: &str) -> Result<Vec<Self>> {
        let prefix = format!("{}-{date_prefix}", chamber.as_str());
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "json")
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .is_some_and(|name| name.starts_with(&prefix))
            })
            .collect();
        paths.sort();
        paths
            .iter()
            .map(|path| -> Result<Self> {
                let raw = std::fs::read_to_string(path)?;
                Ok(serde_json::from_str(&raw)?)
            })
            .collect()
    }

    /// Every assigned motion with its gid.
    pub fn motions(&self) -> impl Iterator<Item = &Motion> {
        self.divisions
            .iter()
            .filter_map(|d| d.motion.as_ref())
            .chain(self.agreements.iter().filter_map(|a| a.motion.as_ref()))
    }

    pub fn motion_records(&self) -> Vec<MotionRecord> {
        self.motions()
            .map(|m| MotionRecord {
                gid: m.gid(),
                speech_id: m.speech_id.clone(),
                date: self.date.clone(),
                motion_title: m.motion_title.clone(),
                motion_text: m.text(),
                chamber: self.chamber,
            })
            .collect()
    }

    pub fn division_links(&self) -> Vec<DivisionLinkRecord> {
        self.divisions
            .iter()
            .map(|d| DivisionLinkRecord {
                division_gid: d.gid().to_string(),
                motion_gid: d.motion.as_ref().map(Motion::gid).unwrap_or_default(),
                assignment_reason: d.motion_assignment_reason.clone(),
                chamber: self.chamber,
            })
            .collect()
    }

    pub fn agreement_records(&self) -> Vec<AgreementRecord> {
        self.agreements
            .iter()
            .map(|a| AgreementRecord {
                gid: a.gid(),
                date: a.date.clone(),
                major_heading_id: a.major_heading_id.clone(),
                minor_heading_id: a.minor_heading_id.clone(),
                speech_id: a.speech_id.clone(),
                paragraph_pid: a.paragraph_pid.clone(),
                agreed_text: a.agreed_text.clone(),
                negative: a.negative(),
                motion_title: a
                    .motion
                    .as_ref()
                    .map(|m| m.motion_title.clone())
                    .unwrap_or_default(),
                motion_gid: a.motion.as_ref().map(Motion::gid).unwrap_or_default(),
                assignment_reason: a.motion_assignment_reason.clone(),
                chamber: self.chamber,
            })
            .collect()
    }

    pub fn snapshot(&self) -> AssignmentSnapshot {
        let mut decisions = BTreeMap::new();
        for d in &self.divisions {
            decisions.insert(
                d.gid().to_string(),
                d.motion.as_ref().map(Motion::gid).unwrap_or_default(),
            );
        }
        for a in &self.agreements {
            decisions.insert(a.gid(), a.motion.as_ref().map(Motion::gid).unwrap_or_default());
        }
        AssignmentSnapshot {
            date: self.date.clone(),
            chamber: self.chamber,
            decisions,
        }
    }
}

// ---------------------------------------------------------------------------
// Flat records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MotionRecord {
    pub gid: String,
    pub speech_id: String,
    pub date: String,
    pub motion_title: String,
    pub motion_text: String,
    pub chamber: Chamber,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DivisionLinkRecord {
    pub division_gid: String,
    pub motion_gid: String,
    pub assignment_reason: String,
    pub chamber: Chamber,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgreementRecord {
    pub gid: String,
    pub date: String,
    pub major_heading_id: String,
    pub minor_heading_id: String,
    pub speech_id: String,
    pub paragraph_pid: String,
    pub agreed_text: String,
    pub negative: bool,
    pub motion_title: String,
    pub motion_gid: String,
    pub assignment_reason: String,
    pub chamber: Chamber,
}

// ---------------------------------------------------------------------------
// Packaging
// ---------------------------------------------------------------------------

pub const MOTIONS_TABLE: &str = "motions";
pub const DIVISION_LINKS_TABLE: &str = "division-motions";
pub const AGREEMENTS_TABLE: &str = "agreements";

/// The three export tables, each unique on its key column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub motions: Vec<MotionRecord>,
    pub division_links: Vec<DivisionLinkRecord>,
    pub agreements: Vec<AgreementRecord>,
}

/// Sort by key and drop rows that are exact copies of their neighbour.
fn sorted_unique<T: Ord>(mut rows: Vec<T>) -> Vec<T> {
    rows.sort();
    rows.dedup();
    rows
}

fn ensure_unique<T>(table: &str, rows: &[T], key: impl Fn(&T) -> &str) -> Result<()> {
    for pair in rows.windows(2) {
        if key(&pair[0]) == key(&pair[1]) {
            return Err(MotionError::DuplicateKey {
                table: table.to_string(),
                key: key(&pair[0]).to_string(),
            });
        }
    }
    Ok(())
}

/// When one motion gid carries both a placeholder title and a specific
/// one, keep the specific rows.
fn prefer_specific_titles(rows: Vec<MotionRecord>) -> Vec<MotionRecord> {
    let mut by_gid: BTreeMap<String, Vec<MotionRecord>> = BTreeMap::new();
    for row in rows {
        by_gid.entry(row.gid.clone()).or_default().push(row);
    }
    by_gid
        .into_values()
        .flat_map(|group| {
            let has_specific = group.iter().any(|r| !is_placeholder_title(&r.motion_title));
            if group.len() > 1 && has_specific {
                group
                    .into_iter()
                    .filter(|r| !is_placeholder_title(&r.motion_title))
                    .collect()
            } else {
                group
            }
        })
        .collect()
}

impl Package {
    /// Gather, de-duplicate and validate the tables for `results`.
    pub fn build(results: &[ResultsHolder]) -> Result<Self> {
        let motions = sorted_unique(results.iter().flat_map(|r| r.motion_records()).collect());
        let motions = sorted_unique(prefer_specific_titles(motions));
        let division_links =
            sorted_unique(results.iter().flat_map(|r| r.division_links()).collect());
        let agreements =
            sorted_unique(results.iter().flat_map(|r| r.agreement_records()).collect());

        ensure_unique(MOTIONS_TABLE, &motions, |r| r.gid.as_str())?;
        ensure_unique(DIVISION_LINKS_TABLE, &division_links, |r| r.division_gid.as_str())?;
        ensure_unique(AGREEMENTS_TABLE, &agreements, |r| r.gid.as_str())?;

        Ok(Self {
            motions,
            division_links,
            agreements,
        })
    }

    /// Write each table as `<dir>/<table>.json`.
    pub fn write(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(dir)?;
        let tables = [
            (MOTIONS_TABLE, serde_json::to_string_pretty(&self.motions)?),
            (DIVISION_LINKS_TABLE, serde_json::to_string_pretty(&self.division_links)?),
            (AGREEMENTS_TABLE, serde_json::to_string_pretty(&self.agreements)?),
        ];
        let mut written = Vec::with_capacity(tables.len());
        for (table, body) in tables {
            let path = dir.join(format!("{table}.json"));
            std::fs::write(&path, body)?;
            written.push(path);
        }
        info!(
            dir = %dir.display(),
            motions = self.motions.len(),
            divisions = self.division_links.len(),
            agreements = self.agreements.len(),
            "package written"
        );
        Ok(written)
    }
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// Decision gid -> motion gid for one date, used as a golden regression
/// file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub date: String,
    pub chamber: Chamber,
    pub decisions: BTreeMap<String, String>,
}

impl AssignmentSnapshot {
    /// Deterministic SHA-256 of the mapping.
    pub fn digest(&self) -> String {
        let bytes = serde_json::to_vec(&self.decisions)
            .expect("string maps are always serializable for hashing");
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    pub fn path_in(&self, dir: &Path) -> PathBuf {
        dir.join(ResultsHolder::file_name(self.chamber, &self.date))
    }

    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = self.path_in(dir);
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(dir: &Path, chamber: Chamber, date: &str) -> Result<Self> {
        let raw = std::fs::read_to_string(dir.join(ResultsHolder::file_name(chamber, date)))?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Decision gids whose motion differs between `self` and `expected`,
    /// including gids present on only one side.
    pub fn diff(&self, expected: &AssignmentSnapshot) -> Vec<String> {
        let mut changed: Vec<String> = self
            .decisions
            .iter()
            .filter(|(gid, motion)| expected.decisions.get(*gid) != Some(*motion))
            .map(|(gid, _)| gid.clone())
            .collect();
        changed.extend(
            expected
                .decisions
                .keys()
                .filter(|gid| !self.decisions.contains_key(*gid))
                .cloned(),
        );
        changed.sort();
        changed
    }
}
