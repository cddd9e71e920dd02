//! Error types for store operations.

use std::path::PathBuf;

/// Errors that can occur while reading or allocating store entries.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A human time string could not be parsed.
    #[error("invalid time value {value:?}: {reason}")]
    InvalidTimeSpec {
        /// The text as supplied by the caller.
        value: String,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// A clip window's end does not come after its start.
    #[error("invalid clip window: end ({end}) must be greater than start ({start})")]
    InvalidWindow {
        /// Start as supplied, or `0` when omitted.
        start: String,
        /// End as supplied.
        end: String,
    },

    /// Time-window options and trim options were both supplied.
    #[error("use either --start/--end or --trim-start-seconds/--trim-duration-seconds, not both")]
    ConflictingWindowSpec,

    /// A numeric version directory is beyond the largest allocatable version.
    #[error("version directory {0} is out of range")]
    VersionOutOfRange(PathBuf),

    /// A directory that must be fresh already exists.
    #[error("refusing to reuse existing directory: {0}")]
    Collision(PathBuf),

    /// A filesystem operation failed.
    #[error("store I/O error at {path}: {source}")]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
