//! Error types for pipeline jobs.

use std::path::PathBuf;

use thiserror::Error;
use voicebank_manifest::ManifestError;
use voicebank_store::StoreError;
use voicebank_types::VoiceNameError;

/// Exit status used for every failure that is not an external tool's own.
pub const FAILURE_EXIT_CODE: i32 = 2;

/// An external tool ran and did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "command failed with exit code {}: {command}",
    .status.map_or_else(|| "none".to_string(), |s| s.to_string())
)]
pub struct ToolFailure {
    /// The full command line, shell-quoted.
    pub command: String,
    /// Exit status, or `None` if the tool was killed or timed out.
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Errors that can stop a job.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A job or option failed validation before anything was touched.
    #[error("{0}")]
    Validation(String),

    /// A referenced profile, version, or source file does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A directory the job must create already exists.
    #[error("refusing to reuse existing directory: {0}")]
    Collision(PathBuf),

    /// Required external commands are not on `PATH`.
    #[error("missing required commands: {}. Install them and retry.", .0.join(", "))]
    MissingTools(Vec<String>),

    /// An external tool exited unsuccessfully.
    #[error(transparent)]
    Tool(#[from] ToolFailure),

    /// A store operation failed for a reason other than validation or collision.
    #[error(transparent)]
    Store(StoreError),

    /// A manifest could not be written.
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// A filesystem or process operation failed.
    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl PipelineError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Process exit status for this failure.
    ///
    /// Tool failures pass the tool's own status through; everything else is `2`.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Tool(failure) => match failure.status {
                Some(status) if status != 0 => status,
                _ => 1,
            },
            _ => FAILURE_EXIT_CODE,
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Collision(path) => Self::Collision(path),
            StoreError::InvalidTimeSpec { .. }
            | StoreError::InvalidWindow { .. }
            | StoreError::ConflictingWindowSpec => Self::Validation(err.to_string()),
            other => Self::Store(other),
        }
    }
}

impl From<VoiceNameError> for PipelineError {
    fn from(err: VoiceNameError) -> Self {
        Self::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(status: Option<i32>) -> PipelineError {
        PipelineError::Tool(ToolFailure {
            command: "ffmpeg -y".to_string(),
            status,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    #[test]
    fn tool_status_is_passed_through() {
        assert_eq!(failure(Some(7)).exit_code(), 7);
        assert_eq!(failure(None).exit_code(), 1);
    }

    #[test]
    fn other_failures_exit_with_two() {
        assert_eq!(PipelineError::Validation("x".into()).exit_code(), 2);
        assert_eq!(PipelineError::NotFound("x".into()).exit_code(), 2);
        assert_eq!(PipelineError::Collision(PathBuf::from("d")).exit_code(), 2);
    }

    #[test]
    fn store_errors_are_classified() {
        assert!(matches!(
            PipelineError::from(StoreError::ConflictingWindowSpec),
            PipelineError::Validation(_)
        ));
        assert!(matches!(
            PipelineError::from(StoreError::Collision(PathBuf::from("d"))),
            PipelineError::Collision(_)
        ));
    }

    #[test]
    fn missing_tools_message_lists_names() {
        let err = PipelineError::MissingTools(vec!["uv".into(), "ffmpeg".into()]);
        assert_eq!(
            err.to_string(),
            "missing required commands: uv, ffmpeg. Install them and retry."
        );
    }
}
