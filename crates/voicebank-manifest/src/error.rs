//! Error types for manifest I/O.

use std::path::PathBuf;

/// Errors that can occur while reading or writing a manifest file.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// The manifest file could not be read or written.
    #[error("manifest I/O error at {path}: {source}")]
    Io {
        /// The manifest path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// The manifest file is not valid JSON.
    #[error("manifest at {path} is not valid JSON: {source}")]
    Parse {
        /// The manifest path.
        path: PathBuf,
        /// The underlying parse error.
        source: serde_json::Error,
    },

    /// The manifest tree could not be serialised.
    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
