//! Pipeline configuration.

use std::path::{Path, PathBuf};

use crate::pipeline::BatchMode;
use crate::registry::DEFAULT_REGISTRY_URL;

/// Settings for a processing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Root of the data tree (`raw/`, `interim/`, `processed/`)
    pub data_dir: PathBuf,
    /// Where the motion registry dump is downloaded from
    pub registry_url: String,
    /// Concurrent per-date workers
    pub jobs: usize,
    /// Abort the batch on the first failing date
    pub strict: bool,
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Truthy environment values: `1`, `true`, `yes`, `on`.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            data_dir: std::env::var("PARL_MOTION_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data")),
            registry_url: std::env::var("PARL_MOTION_REGISTRY_URL")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string()),
            jobs: std::env::var("PARL_MOTION_JOBS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or_else(default_jobs),
            strict: std::env::var("PARL_MOTION_STRICT")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
        }
    }
}

impl PipelineConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config rooted at a specific data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        PipelineConfig {
            data_dir: data_dir.into(),
            registry_url: DEFAULT_REGISTRY_URL.to_string(),
            jobs: 1,
            strict: false,
        }
    }

    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    pub fn with_registry_url(mut self, url: &str) -> Self {
        self.registry_url = url.to_string();
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn batch_mode(&self) -> BatchMode {
        if self.strict {
            BatchMode::Strict
        } else {
            BatchMode::Tolerant
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn manual_overrides_path(&self) -> PathBuf {
        self.data_dir.join("raw").join("manual_motion_linking.json")
    }

    pub fn registry_path(&self) -> PathBuf {
        self.data_dir.join("raw").join("sp").join("motions.json")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.data_dir.join("interim").join("results")
    }

    pub fn package_dir(&self) -> PathBuf {
        self.data_dir.join("processed").join("package")
    }

    pub fn snapshot_dir(&self) -> PathBuf {
        self.data_dir.join("tests").join("snapshots")
    }
}
