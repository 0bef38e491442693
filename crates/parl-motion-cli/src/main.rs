//! Parliamentary motion linker CLI
//!
//! The `parl-motion` command drives the linker over transcript files.
//!
//! ## Commands
//!
//! - `process`: assign every decision in one or more transcripts to its motion
//! - `extract`: print the motions found in a single transcript
//! - `snapshot`: write or verify golden decision-to-motion snapshots
//! - `package`: build the export tables from stored results
//! - `fetch-registry`: download the Scottish motion registry dump

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use parl_motion_core::{
    download_registry, extract_motions, process_transcript, AssignmentSnapshot, BatchMode,
    BatchReport, Chamber, LogSettings, MotionError, Package, PipelineConfig, ResultsHolder,
    RunContext, TracingSink, Transcript,
};

#[derive(Parser)]
#[command(name = "parl-motion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Link parliamentary decisions to the motions they decided", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Root of the data tree (default: $PARL_MOTION_DATA_DIR or ./data)
    #[arg(long, global = true, env = "PARL_MOTION_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assign decisions to motions and store the per-date results
    Process {
        /// Transcript files, or directories of `*.json` transcripts
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Concurrent per-date workers
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Stop at the first date that fails
        #[arg(long)]
        strict: bool,

        /// Do not write results, only report
        #[arg(long)]
        dry_run: bool,
    },

    /// Print the motions extracted from one transcript as JSON
    Extract {
        /// Transcript file
        transcript: PathBuf,
    },

    /// Write golden snapshots, or check results against them
    Snapshot {
        /// Transcript files, or directories of `*.json` transcripts
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Compare against stored snapshots instead of writing them
        #[arg(long)]
        check: bool,
    },

    /// Build the motion, division-link and agreement tables
    Package {
        /// Chamber whose results are packaged
        #[arg(short, long, default_value = "commons")]
        chamber: Chamber,

        /// Only results whose date starts with this prefix (e.g. 2024-04)
        #[arg(short, long, default_value = "")]
        prefix: String,
    },

    /// Download the motion registry dump to the data directory
    FetchRegistry {
        /// Override the registry URL
        #[arg(long)]
        url: Option<String>,

        /// Download even if a cached copy exists
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    parl_motion_core::init_tracing(&LogSettings::from_flags(cli.verbose, cli.json));

    let mut config = PipelineConfig::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }

    match cli.command {
        Commands::Process {
            inputs,
            jobs,
            strict,
            dry_run,
        } => {
            if let Some(jobs) = jobs {
                config = config.with_jobs(jobs);
            }
            if strict {
                config = config.with_strict(true);
            }
            cmd_process(config, &inputs, dry_run).await
        }
        Commands::Extract { transcript } => cmd_extract(config, &transcript),
        Commands::Snapshot { inputs, check } => cmd_snapshot(config, &inputs, check),
        Commands::Package { chamber, prefix } => cmd_package(&config, chamber, &prefix),
        Commands::FetchRegistry { url, force } => {
            if let Some(url) = url {
                config = config.with_registry_url(&url);
            }
            cmd_fetch_registry(&config, force).await
        }
    }
}

// ---------------------------------------------------------------------------
// Input discovery
// ---------------------------------------------------------------------------

/// Expand directories into their `*.json` files. Explicit files are kept as
/// given; the result is sorted and de-duplicated.
fn collect_transcripts(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let entries = std::fs::read_dir(input)
                .with_context(|| format!("Failed to read directory {}", input.display()))?;
            for entry in entries {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    paths.push(path);
                }
            }
        } else if input.exists() {
            paths.push(input.clone());
        } else {
            bail!("No such transcript: {}", input.display());
        }
    }
    paths.sort();
    paths.dedup();
    Ok(paths)
}

fn load_context(config: PipelineConfig) -> Result<RunContext> {
    let overrides_path = config.manual_overrides_path();
    RunContext::load(config)
        .with_context(|| format!("Failed to load overrides from {}", overrides_path.display()))
}

// ---------------------------------------------------------------------------
// process
// ---------------------------------------------------------------------------

/// What one worker produced for one input file.
enum Outcome {
    Processed {
        chamber: Chamber,
        date: String,
        result: parl_motion_core::Result<ResultsHolder>,
    },
    /// The file could not be read as a transcript.
    Unreadable { path: PathBuf, error: MotionError },
}

impl Outcome {
    /// A failure that strict mode must not skip past.
    fn is_hard_failure(&self) -> bool {
        match self {
            Outcome::Processed { result, .. } => {
                result.as_ref().is_err_and(|e| !e.is_skippable())
            }
            Outcome::Unreadable { error, .. } => !error.is_skippable(),
        }
    }
}

fn run_one(path: &Path, ctx: &RunContext) -> Outcome {
    match Transcript::from_json_path(path) {
        Ok(transcript) => Outcome::Processed {
            chamber: transcript.chamber,
            date: transcript.date.clone(),
            result: process_transcript(&transcript, ctx, &TracingSink),
        },
        Err(error) => Outcome::Unreadable {
            path: path.to_path_buf(),
            error,
        },
    }
}

/// Run every input on blocking workers, at most `jobs` at a time. Outcomes
/// come back in input order.
///
/// With `fail_fast`, the first hard failure aborts the remaining work and
/// only the outcomes finished so far are returned.
async fn run_all(
    paths: Vec<PathBuf>,
    ctx: Arc<RunContext>,
    jobs: usize,
    fail_fast: bool,
) -> Result<Vec<Outcome>> {
    let total = paths.len();
    let mut join_set = JoinSet::new();
    let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
    let mut pending = paths.into_iter().enumerate();

    loop {
        while join_set.len() < jobs.max(1) {
            let Some((idx, path)) = pending.next() else {
                break;
            };
            let ctx = Arc::clone(&ctx);
            join_set.spawn_blocking(move || (idx, run_one(&path, &ctx)));
        }
        let Some(joined) = join_set.join_next().await else {
            break;
        };
        let (idx, outcome) = joined.context("Transcript worker panicked")?;
        let stop = fail_fast && outcome.is_hard_failure();
        slots[idx] = Some(outcome);
        if stop {
            warn!(input = idx, "hard failure in strict mode; abandoning remaining transcripts");
            join_set.abort_all();
            return Ok(slots.into_iter().flatten().collect());
        }
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.with_context(|| format!("Missing outcome for input {idx}")))
        .collect()
}

async fn cmd_process(config: PipelineConfig, inputs: &[PathBuf], dry_run: bool) -> Result<()> {
    let paths = collect_transcripts(inputs)?;
    let mode = config.batch_mode();
    let jobs = config.jobs;
    let results_dir = config.results_dir();
    let ctx = Arc::new(load_context(config)?);

    info!(files = paths.len(), jobs, ?mode, "processing transcripts");
    let outcomes = run_all(paths, ctx, jobs, mode == BatchMode::Strict).await?;

    let mut report = BatchReport::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Processed {
                chamber,
                date,
                result,
            } => {
                let Some(results) = report
                    .record(chamber, &date, result, mode)
                    .with_context(|| format!("Processing {chamber} {date} failed"))?
                else {
                    continue;
                };
                if !dry_run {
                    let path = results.to_data_dir(&results_dir).with_context(|| {
                        format!("Failed to write results to {}", results_dir.display())
                    })?;
                    debug!(path = %path.display(), "results stored");
                }
            }
            Outcome::Unreadable { path, error } => {
                let label = path.display().to_string();
                if error.is_skippable() {
                    warn!(path = %label, error = %error, "skipping unreadable transcript");
                    report.skipped.push((label, error.to_string()));
                } else if mode == BatchMode::Strict {
                    return Err(error).with_context(|| format!("Failed to read {label}"));
                } else {
                    report.failed.push((label, error.to_string()));
                }
            }
        }
    }

    for (label, reason) in &report.skipped {
        println!("skipped {label}: {reason}");
    }
    for (label, reason) in &report.failed {
        println!("FAILED  {label}: {reason}");
    }
    println!("{}", report.summary());
    Ok(())
}

// ---------------------------------------------------------------------------
// extract
// ---------------------------------------------------------------------------

fn cmd_extract(config: PipelineConfig, path: &Path) -> Result<()> {
    let transcript = Transcript::from_json_path(path)
        .with_context(|| format!("Failed to load transcript {}", path.display()))?;
    let ctx = load_context(config)?;
    let motions = extract_motions(&transcript, ctx.registry.as_ref());
    println!("{}", serde_json::to_string_pretty(&motions.summaries())?);
    Ok(())
}

// ---------------------------------------------------------------------------
// snapshot
// ---------------------------------------------------------------------------

fn cmd_snapshot(config: PipelineConfig, inputs: &[PathBuf], check: bool) -> Result<()> {
    let paths = collect_transcripts(inputs)?;
    let snapshot_dir = config.snapshot_dir();
    let ctx = load_context(config)?;

    let mut mismatched = Vec::new();
    for path in &paths {
        let transcript = Transcript::from_json_path(path)
            .with_context(|| format!("Failed to load transcript {}", path.display()))?;
        let results = process_transcript(&transcript, &ctx, &TracingSink)
            .with_context(|| format!("Failed to process {}", path.display()))?;
        let snapshot = results.snapshot();

        if !check {
            let written = snapshot.write(&snapshot_dir)?;
            println!("wrote {} ({})", written.display(), &snapshot.digest()[..12]);
            continue;
        }

        let golden = AssignmentSnapshot::load(&snapshot_dir, snapshot.chamber, &snapshot.date)
            .with_context(|| {
                format!(
                    "No golden snapshot for {} {} in {}",
                    snapshot.chamber,
                    snapshot.date,
                    snapshot_dir.display()
                )
            })?;
        if golden.digest() == snapshot.digest() {
            println!("ok      {} {}", snapshot.chamber, snapshot.date);
        } else {
            let changed = snapshot.diff(&golden);
            println!(
                "CHANGED {} {}: {}",
                snapshot.chamber,
                snapshot.date,
                changed.join(", ")
            );
            mismatched.push(format!("{}-{}", snapshot.chamber, snapshot.date));
        }
    }

    if !mismatched.is_empty() {
        bail!("{} snapshot(s) changed: {}", mismatched.len(), mismatched.join(", "));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// package
// ---------------------------------------------------------------------------

fn cmd_package(config: &PipelineConfig, chamber: Chamber, prefix: &str) -> Result<()> {
    let results_dir = config.results_dir();
    let results = ResultsHolder::load_matching(&results_dir, chamber, prefix)
        .with_context(|| format!("Failed to load results from {}", results_dir.display()))?;
    if results.is_empty() {
        bail!("No {chamber} results matching '{prefix}' in {}", results_dir.display());
    }

    let package = Package::build(&results).context("Export tables are inconsistent")?;
    let written = package.write(&config.package_dir())?;
    println!(
        "Packaged {} dates: {} motions, {} divisions, {} agreements",
        results.len(),
        package.motions.len(),
        package.division_links.len(),
        package.agreements.len()
    );
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// fetch-registry
// ---------------------------------------------------------------------------

async fn cmd_fetch_registry(config: &PipelineConfig, force: bool) -> Result<()> {
    let dest = config.registry_path();
    let path = download_registry(&config.registry_url, &dest, force)
        .await
        .with_context(|| format!("Failed to fetch registry from {}", config.registry_url))?;
    println!("Registry cached at {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn process_flags_parse() {
        let cli = Cli::try_parse_from([
            "parl-motion",
            "--data-dir",
            "/tmp/parl",
            "process",
            "--jobs",
            "4",
            "--strict",
            "a.json",
            "b.json",
        ])
        .expect("parse");
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/parl")));
        match cli.command {
            Commands::Process {
                inputs,
                jobs,
                strict,
                dry_run,
            } => {
                assert_eq!(inputs.len(), 2);
                assert_eq!(jobs, Some(4));
                assert!(strict);
                assert!(!dry_run);
            }
            _ => panic!("expected process"),
        }
    }

    #[test]
    fn package_chamber_parses_aliases() {
        let cli = Cli::try_parse_from(["parl-motion", "package", "--chamber", "senedd"])
            .expect("parse");
        assert!(matches!(
            cli.command,
            Commands::Package {
                chamber: Chamber::Wales,
                ..
            }
        ));
        assert!(Cli::try_parse_from(["parl-motion", "package", "--chamber", "moon"]).is_err());
    }

    #[test]
    fn directories_expand_to_sorted_json_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        for name in ["b.json", "a.json", "notes.txt"] {
            std::fs::write(dir.path().join(name), "{}").expect("write");
        }
        let explicit = dir.path().join("a.json");
        let paths =
            collect_transcripts(&[dir.path().to_path_buf(), explicit.clone()]).expect("collect");
        assert_eq!(paths, vec![explicit, dir.path().join("b.json")]);

        assert!(collect_transcripts(&[dir.path().join("missing.json")]).is_err());
    }

    #[tokio::test]
    async fn workers_return_outcomes_in_input_order() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut paths = Vec::new();
        for (i, date) in ["2024-01-01", "2024-01-02", "2024-01-03"].iter().enumerate() {
            let path = dir.path().join(format!("{i}.json"));
            std::fs::write(
                &path,
                format!(r#"{{"date": "{date}", "chamber": "lords", "items": []}}"#),
            )
            .expect("write");
            paths.push(path);
        }
        paths.push(dir.path().join("broken.json"));
        std::fs::write(&paths[3], "not json").expect("write");

        let outcomes = run_all(paths, Arc::new(RunContext::new()), 2, false)
            .await
            .expect("run");
        assert_eq!(outcomes.len(), 4);
        let dates: Vec<String> = outcomes
            .iter()
            .filter_map(|o| match o {
                Outcome::Processed { date, result, .. } if result.is_ok() => Some(date.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert!(matches!(
            &outcomes[3],
            Outcome::Unreadable { error, .. } if error.is_skippable()
        ));
    }

    #[tokio::test]
    async fn strict_workers_stop_at_first_hard_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let unassignable = r#"{
          "date": "2024-06-04",
          "chamber": "commons",
          "items": [
            {"type": "major_heading", "id": "d.4.0", "text": "Points of Order"},
            {"type": "speech", "id": "d.4.1", "person_id": "p1", "paragraphs": [
              {"pid": "a4.1/1", "text": "I thank the Minister for her answer."}
            ]},
            {"type": "division", "id": "d.4.2", "number": 7}
          ]
        }"#;
        let mut paths = vec![dir.path().join("0.json")];
        std::fs::write(&paths[0], unassignable).expect("write");
        for i in 1..4 {
            let path = dir.path().join(format!("{i}.json"));
            std::fs::write(
                &path,
                format!(r#"{{"date": "2024-01-0{i}", "chamber": "lords", "items": []}}"#),
            )
            .expect("write");
            paths.push(path);
        }

        let outcomes = run_all(paths, Arc::new(RunContext::new()), 1, true)
            .await
            .expect("run");
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].is_hard_failure());
        assert!(matches!(
            &outcomes[0],
            Outcome::Processed { result: Err(MotionError::UnresolvedDivision { .. }), .. }
        ));
    }
}
