//! Clone and generation jobs against the voice store.
//!
//! The pipeline is thin glue: it validates jobs, plans directories through
//! `voicebank-store`, hands media work to external tools, and records a
//! manifest for every run. Jobs run strictly one after another.
//!
//! # Design decisions
//!
//! - **Validate everything first**: [`plan_jobs`] checks every job and the
//!   clip window before the first directory is created or tool is started.
//! - **Tools behind a trait**: [`ToolRunner`] is the only place a process is
//!   spawned. [`SubprocessRunner`] is the real one; tests use a fake that
//!   writes the expected output files.
//! - **Outcomes instead of console output**: every job returns a
//!   [`JobOutcome`] listing what it did (or would do, in dry-run mode).

pub mod error;
pub mod hints;
pub mod job;
pub mod library;
pub mod options;
pub mod orchestrator;
pub mod tools;

pub use error::{PipelineError, ToolFailure, FAILURE_EXIT_CODE};
pub use hints::failure_hints;
pub use job::{load_jobs_tsv, plan_jobs, Job, JobKind, JobSource, PlannedJob};
pub use library::{library, ProfileSummary, RunSummary};
pub use options::{PipelineOptions, DEFAULT_PROMPT_SAMPLE_RATE};
pub use orchestrator::{JobOutcome, Pipeline};
pub use tools::{
    SubprocessRunner, ToolCommand, ToolKind, ToolOutput, ToolRunner, ToolSettings,
    DOWNLOAD_EXTENSION_TEMPLATE,
};
