//! Error types for the layout migrator.

use std::path::PathBuf;

/// Errors that abort a migration.
///
/// Per-manifest failures are not errors; they are recorded in the
/// [`crate::MigrationReport`] and the migration continues.
#[derive(Debug, thiserror::Error)]
pub enum MigrateError {
    /// The store root does not exist or is not a directory.
    #[error("repo root does not exist: {0}")]
    RootMissing(PathBuf),

    /// A directory listing or move failed.
    #[error("migration I/O error at {path}: {source}")]
    Io {
        /// The path being listed or moved.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl MigrateError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
