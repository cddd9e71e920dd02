//! The four migration phases plus cleanup.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use voicebank_manifest::{rewrite_manifest_file, LEGACY_LAYOUT_RULES};
use voicebank_store::StoreLayout;
use voicebank_types::{MANIFEST_FILE_NAME, RUNS_DIR_NAME};

use crate::error::MigrateError;
use crate::merge::{merge_move, sorted_children};
use crate::report::{MigrationAction, MigrationReport};

/// Finder metadata that would otherwise keep legacy directories alive.
const STRAY_FILE: &str = ".DS_Store";

/// Directories of the legacy layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyLayout {
    /// `runs/`
    pub runs_root: PathBuf,
    /// `runs/voice-clones/<base>/<version>`
    pub clones_root: PathBuf,
    /// `runs/voices/<base>/<version>/<run>`
    pub generations_root: PathBuf,
    /// `runs/downloads/<entry>`
    pub downloads_root: PathBuf,
}

impl LegacyLayout {
    pub fn under(root: &Path) -> Self {
        let runs_root = root.join("runs");
        Self {
            clones_root: runs_root.join("voice-clones"),
            generations_root: runs_root.join("voices"),
            downloads_root: runs_root.join("downloads"),
            runs_root,
        }
    }
}

/// Migrates the store under `root` from the legacy layout.
///
/// Phases run in order: clone profiles, generation runs, the download
/// cache, then manifest rewrites under `voices/`. Each phase is safe to
/// repeat. Outside dry-run mode, emptied legacy directories are removed at
/// the end.
///
/// # Errors
///
/// Returns [`MigrateError::RootMissing`] if `root` is not a directory, or
/// [`MigrateError::Io`] if a listing or move fails. Unreadable manifests
/// are recorded in the report instead.
pub fn migrate(root: &Path, dry_run: bool) -> Result<MigrationReport, MigrateError> {
    if !root.is_dir() {
        return Err(MigrateError::RootMissing(root.to_path_buf()));
    }

    let legacy = LegacyLayout::under(root);
    let layout = StoreLayout::under(root);
    let mut report = MigrationReport::new(dry_run);

    tracing::info!(dry_run, root = %root.display(), "starting layout migration");

    relocate_clones(&legacy, &layout, &mut report)?;
    relocate_runs(&legacy, &layout, &mut report)?;
    relocate_downloads(&legacy, &layout, &mut report)?;
    rewrite_manifests(&layout.voices_root, &mut report);

    if !dry_run {
        cleanup(&legacy, &mut report);
    }

    tracing::info!(
        moves = report.moves(),
        kept = report.kept(),
        rewritten = report.rewritten_manifests(),
        skipped = report.skipped_manifests(),
        "layout migration finished"
    );
    Ok(report)
}

/// `runs/voice-clones/<base>/<version>` -> `voices/<base>/<version>`
fn relocate_clones(
    legacy: &LegacyLayout,
    layout: &StoreLayout,
    report: &mut MigrationReport,
) -> Result<(), MigrateError> {
    let dry_run = report.dry_run;
    for base_dir in subdirs(&legacy.clones_root)? {
        for version_dir in subdirs(&base_dir)? {
            let target = layout
                .voices_root
                .join(file_name(&base_dir))
                .join(file_name(&version_dir));
            merge_move(&version_dir, &target, dry_run, report)?;
        }
    }
    Ok(())
}

/// `runs/voices/<base>/<version>/<run>` -> `voices/<base>/<version>/runs/<run>`
fn relocate_runs(
    legacy: &LegacyLayout,
    layout: &StoreLayout,
    report: &mut MigrationReport,
) -> Result<(), MigrateError> {
    let dry_run = report.dry_run;
    for base_dir in subdirs(&legacy.generations_root)? {
        for version_dir in subdirs(&base_dir)? {
            for run_dir in subdirs(&version_dir)? {
                let target = layout
                    .voices_root
                    .join(file_name(&base_dir))
                    .join(file_name(&version_dir))
                    .join(RUNS_DIR_NAME)
                    .join(file_name(&run_dir));
                merge_move(&run_dir, &target, dry_run, report)?;
            }
        }
    }
    Ok(())
}

/// `runs/downloads/<entry>` -> `media/downloads/<entry>`
fn relocate_downloads(
    legacy: &LegacyLayout,
    layout: &StoreLayout,
    report: &mut MigrationReport,
) -> Result<(), MigrateError> {
    if !legacy.downloads_root.is_dir() {
        return Ok(());
    }
    let dry_run = report.dry_run;
    for entry in sorted_children(&legacy.downloads_root)? {
        let target = layout.downloads_dir.join(file_name(&entry));
        merge_move(&entry, &target, dry_run, report)?;
    }
    Ok(())
}

/// Rewrites every manifest below `voices_root`, at any depth.
fn rewrite_manifests(voices_root: &Path, report: &mut MigrationReport) {
    if !voices_root.is_dir() {
        return;
    }

    let manifests = WalkDir::new(voices_root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE_NAME)
        .map(walkdir::DirEntry::into_path);

    let dry_run = report.dry_run;
    for path in manifests {
        match rewrite_manifest_file(&path, LEGACY_LAYOUT_RULES, dry_run) {
            Ok(true) => report.record(MigrationAction::RewriteManifest(path)),
            Ok(false) => {}
            Err(e) => report.record(MigrationAction::SkipManifest {
                path,
                reason: e.to_string(),
            }),
        }
    }
}

/// Best-effort removal of stray files and now-empty legacy directories.
fn cleanup(legacy: &LegacyLayout, report: &mut MigrationReport) {
    for stray in [
        legacy.runs_root.join(STRAY_FILE),
        legacy.clones_root.join(STRAY_FILE),
    ] {
        if stray.is_file() && std::fs::remove_file(&stray).is_ok() {
            report.record(MigrationAction::Remove(stray));
        }
    }

    for dir in [
        &legacy.clones_root,
        &legacy.generations_root,
        &legacy.downloads_root,
        &legacy.runs_root,
    ] {
        remove_if_empty(dir, report);
    }
}

/// Removes `dir` and any empty subdirectories, bottom-up. Errors are ignored.
fn remove_if_empty(dir: &Path, report: &mut MigrationReport) {
    if !dir.is_dir() {
        return;
    }
    if let Ok(children) = sorted_children(dir) {
        for child in children.iter().filter(|c| c.is_dir()) {
            remove_if_empty(child, report);
        }
    }
    if std::fs::remove_dir(dir).is_ok() {
        report.record(MigrationAction::Remove(dir.to_path_buf()));
    }
}

/// Immediate subdirectories of `dir` in name order; empty if `dir` is absent.
fn subdirs(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    Ok(sorted_children(dir)?
        .into_iter()
        .filter(|p| p.is_dir())
        .collect())
}

fn file_name(path: &Path) -> &std::ffi::OsStr {
    path.file_name().unwrap_or(path.as_os_str())
}
