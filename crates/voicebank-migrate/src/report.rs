//! The record of what a migration did, or would do in dry-run mode.

use std::path::PathBuf;

/// One decision taken by the migrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationAction {
    /// `from` was (or would be) moved to the free destination `to`.
    Move { from: PathBuf, to: PathBuf },
    /// `existing` already exists, so `source` stays where it is.
    KeepExisting { source: PathBuf, existing: PathBuf },
    /// A manifest's recorded paths were (or would be) rewritten in place.
    RewriteManifest(PathBuf),
    /// A manifest could not be read or rewritten and was left alone.
    SkipManifest { path: PathBuf, reason: String },
    /// An emptied legacy directory or stray file was removed.
    Remove(PathBuf),
}

/// Ordered list of migration decisions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub dry_run: bool,
    pub actions: Vec<MigrationAction>,
}

impl MigrationReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            actions: Vec::new(),
        }
    }

    /// Appends `action` and logs it.
    pub(crate) fn record(&mut self, action: MigrationAction) {
        let prefix = if self.dry_run { "[dry-run] " } else { "" };
        match &action {
            MigrationAction::Move { from, to } => {
                tracing::info!("{prefix}move {} -> {}", from.display(), to.display());
            }
            MigrationAction::KeepExisting { source, existing } => {
                tracing::info!(
                    "{prefix}skip existing {} (source: {})",
                    existing.display(),
                    source.display()
                );
            }
            MigrationAction::RewriteManifest(path) => {
                tracing::info!("{prefix}rewrite manifest paths: {}", path.display());
            }
            MigrationAction::SkipManifest { path, reason } => {
                tracing::warn!(%reason, "skipping unreadable manifest: {}", path.display());
            }
            MigrationAction::Remove(path) => {
                tracing::debug!("removed {}", path.display());
            }
        }
        self.actions.push(action);
    }

    pub fn moves(&self) -> usize {
        self.count(|a| matches!(a, MigrationAction::Move { .. }))
    }

    pub fn kept(&self) -> usize {
        self.count(|a| matches!(a, MigrationAction::KeepExisting { .. }))
    }

    pub fn rewritten_manifests(&self) -> usize {
        self.count(|a| matches!(a, MigrationAction::RewriteManifest(_)))
    }

    pub fn skipped_manifests(&self) -> usize {
        self.count(|a| matches!(a, MigrationAction::SkipManifest { .. }))
    }

    fn count(&self, pred: impl Fn(&MigrationAction) -> bool) -> usize {
        self.actions.iter().filter(|a| pred(a)).count()
    }
}
