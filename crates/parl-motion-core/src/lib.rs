//! Parliamentary motion linker.
//!
//! Cuts legislative transcripts into motions, finds the divisions and
//! agreements that decide them, and pairs each decision with its motion.

pub mod assignment;
pub mod config;
pub mod decision;
pub mod detector;
pub mod error;
pub mod extractor;
pub mod locator;
pub mod motion;
pub mod obs;
pub mod overrides;
pub mod pipeline;
pub mod registry;
pub mod results;
pub mod telemetry;
pub mod title;
pub mod transcript;

pub use assignment::{
    Assignment, AssignmentEvent, AssignmentSink, MotionMapper, RecordingSink, TracingSink,
};
pub use config::PipelineConfig;
pub use decision::{Agreement, AgreementTrigger, Decision, Division};
pub use detector::{ComplexPhrase, PhraseDetector};
pub use error::{MotionError, RegistryError, Result};
pub use extractor::extract_motions;
pub use locator::{get_agreements, get_divisions};
pub use motion::{Flag, Motion, MotionCollection, MotionSummary};
pub use overrides::{gid_matches_pattern, ManualEntry, ManualLink, ManualOverrides, ManualText};
pub use pipeline::{process_batch, process_transcript, BatchMode, BatchReport, RunContext};
pub use registry::{download_registry, extract_motion_ids, MotionRegistry, RegistryEntry};
pub use results::{AssignmentSnapshot, Package, ResultsHolder};
pub use telemetry::{init_tracing, LogFormat, LogSettings};
pub use transcript::{
    Chamber, DivisionRecord, Heading, Paragraph, Speech, Table, Transcript, TranscriptItem,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
