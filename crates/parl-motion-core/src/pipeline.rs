//! Per-date processing and batch bookkeeping.
//!
//! One transcript is one unit of work: validate, extract, locate, assign.
//! Units share nothing mutable, so a driver may run them concurrently;
//! the registry and override table in [`RunContext`] are read-only.

use tracing::debug;

use crate::assignment::{AssignmentSink, MotionMapper};
use crate::config::PipelineConfig;
use crate::error::Result;
use crate::obs::{self, DateSpan};
use crate::overrides::ManualOverrides;
use crate::registry::MotionRegistry;
use crate::results::ResultsHolder;
use crate::transcript::{Chamber, Transcript};

/// Shared, read-only inputs of a run.
#[derive(Debug, Clone, Default)]
pub struct RunContext {
    pub config: Option<PipelineConfig>,
    pub registry: Option<MotionRegistry>,
    pub overrides: ManualOverrides,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the override table and, when cached, the registry.
    pub fn load(config: PipelineConfig) -> Result<Self> {
        let overrides = ManualOverrides::load(&config.manual_overrides_path())?;
        let registry_path = config.registry_path();
        let registry = if registry_path.exists() {
            Some(MotionRegistry::load(&registry_path)?)
        } else {
            debug!(path = %registry_path.display(), "no cached motion registry");
            None
        };
        Ok(Self {
            config: Some(config),
            registry,
            overrides,
        })
    }

    pub fn with_registry(mut self, registry: MotionRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_overrides(mut self, overrides: ManualOverrides) -> Self {
        self.overrides = overrides;
        self
    }
}

/// Validate, extract, locate and assign one transcript.
pub fn process_transcript(
    transcript: &Transcript,
    ctx: &RunContext,
    sink: &dyn AssignmentSink,
) -> Result<ResultsHolder> {
    let _span = DateSpan::enter(transcript.chamber.as_str(), &transcript.date);
    transcript.validate()?;

    let assignment =
        MotionMapper::from_transcript(transcript, &ctx.overrides, ctx.registry.as_ref(), sink)
            .assign()?;
    let results = ResultsHolder::new(&transcript.date, transcript.chamber, assignment);

    obs::emit_date_processed(
        transcript.chamber.as_str(),
        &transcript.date,
        results.divisions.len(),
        results.agreements.len(),
    );
    Ok(results)
}

/// What a failing date does to the rest of the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Stop at the first fatal error.
    Strict,
    /// Record the error and carry on.
    #[default]
    Tolerant,
}

/// Outcome of a batch, one entry per date label (`<chamber>-<date>`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: Vec<String>,
    pub skipped: Vec<(String, String)>,
    pub failed: Vec<(String, String)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one date's outcome into the report.
    ///
    /// Malformed input is always skipped. Other errors are recorded in
    /// tolerant mode and returned in strict mode.
    pub fn record(
        &mut self,
        chamber: Chamber,
        date: &str,
        outcome: Result<ResultsHolder>,
        mode: BatchMode,
    ) -> Result<Option<ResultsHolder>> {
        let label = format!("{}-{date}", chamber.as_str());
        match outcome {
            Ok(results) => {
                self.processed.push(label);
                Ok(Some(results))
            }
            Err(err) if err.is_skippable() => {
                obs::emit_date_failed(chamber.as_str(), date, &err);
                self.skipped.push((label, err.to_string()));
                Ok(None)
            }
            Err(err) => match mode {
                BatchMode::Strict => Err(err),
                BatchMode::Tolerant => {
                    obs::emit_date_failed(chamber.as_str(), date, &err);
                    self.failed.push((label, err.to_string()));
                    Ok(None)
                }
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} processed, {} skipped, {} failed",
            self.processed.len(),
            self.skipped.len(),
            self.failed.len()
        )
    }
}

/// Label for one unit of work.
pub fn date_label(transcript: &Transcript) -> String {
    format!("{}-{}", transcript.chamber.as_str(), transcript.date)
}

/// Process transcripts one after another.
pub fn process_batch(
    transcripts: &[Transcript],
    ctx: &RunContext,
    sink: &dyn AssignmentSink,
    mode: BatchMode,
) -> Result<(Vec<ResultsHolder>, BatchReport)> {
    let mut report = BatchReport::new();
    let mut results = Vec::new();
    for transcript in transcripts {
        let outcome = process_transcript(transcript, ctx, sink);
        if let Some(holder) = report.record(transcript.chamber, &transcript.date, outcome, mode)? {
            results.push(holder);
        }
    }
    Ok((results, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MotionError;

    fn unresolved() -> MotionError {
        MotionError::UnresolvedDivision {
            date: "2024-04-24".to_string(),
            decisions: vec!["div.1".to_string()],
            motions: vec![],
        }
    }

    #[test]
    fn tolerant_mode_records_failures() {
        let mut report = BatchReport::new();
        let out = report
            .record(Chamber::Commons, "2024-04-24", Err(unresolved()), BatchMode::Tolerant)
            .expect("tolerant");
        assert!(out.is_none());
        assert_eq!(report.failed[0].0, "commons-2024-04-24");
        assert!(!report.is_success());
    }

    #[test]
    fn strict_mode_returns_fatal_errors() {
        let mut report = BatchReport::new();
        let err = report
            .record(Chamber::Commons, "2024-04-24", Err(unresolved()), BatchMode::Strict)
            .expect_err("strict");
        assert!(matches!(err, MotionError::UnresolvedDivision { .. }));
    }

    #[test]
    fn invalid_input_is_skipped_even_when_strict() {
        let mut report = BatchReport::new();
        let out = report
            .record(
                Chamber::Commons,
                "2024-13-40",
                Err(MotionError::InputValidation("bad date".to_string())),
                BatchMode::Strict,
            )
            .expect("skipped");
        assert!(out.is_none());
        assert_eq!(report.skipped.len(), 1);
        assert!(report.is_success());
        assert_eq!(report.summary(), "0 processed, 1 skipped, 0 failed");
    }

    #[test]
    fn empty_transcript_processes_cleanly() {
        let transcript = Transcript::new("2024-04-24", Chamber::Lords, vec![]);
        let sink = crate::assignment::RecordingSink::new();
        let results = process_transcript(&transcript, &RunContext::new(), &sink).expect("process");
        assert!(results.divisions.is_empty());
        assert_eq!(date_label(&transcript), "lords-2024-04-24");
    }
}
