//! Merge-move of directory trees.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::MigrateError;
use crate::report::{MigrationAction, MigrationReport};

/// Moves `src` to `dst`, merging into anything already at `dst`.
///
/// - `dst` missing: `src` is renamed to `dst` (parents are created). When
///   the two sit on different filesystems the tree is copied, then `src`
///   is removed.
/// - `dst` present and both are directories: each child of `src` is
///   merge-moved into `dst`, then the emptied `src` is removed best-effort.
/// - otherwise `dst` wins and `src` is left untouched.
///
/// A destination file is never overwritten or deleted. With `dry_run`,
/// the same decisions are recorded in `report` but nothing is changed.
///
/// # Errors
///
/// Returns [`MigrateError::Io`] if a directory cannot be listed or a move fails.
pub fn merge_move(
    src: &Path,
    dst: &Path,
    dry_run: bool,
    report: &mut MigrationReport,
) -> Result<(), MigrateError> {
    if !present(src) {
        return Ok(());
    }

    if !present(dst) {
        report.record(MigrationAction::Move {
            from: src.to_path_buf(),
            to: dst.to_path_buf(),
        });
        if !dry_run {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
            }
            move_path(src, dst)?;
        }
        return Ok(());
    }

    if !src.is_dir() || !dst.is_dir() {
        report.record(MigrationAction::KeepExisting {
            source: src.to_path_buf(),
            existing: dst.to_path_buf(),
        });
        return Ok(());
    }

    for child in sorted_children(src)? {
        let Some(name) = child.file_name() else {
            continue;
        };
        merge_move(&child, &dst.join(name), dry_run, report)?;
    }

    if !dry_run {
        // Fails harmlessly when duplicates were left behind.
        let _ = std::fs::remove_dir(src);
    }
    Ok(())
}

fn move_path(src: &Path, dst: &Path) -> Result<(), MigrateError> {
    match std::fs::rename(src, dst) {
        Ok(()) => Ok(()),
        Err(e) if crosses_devices(&e) => {
            tracing::debug!(
                from = %src.display(),
                to = %dst.display(),
                "rename crosses filesystems, copying instead"
            );
            copy_then_remove(src, dst)
        }
        Err(e) => Err(MigrateError::io(src, e)),
    }
}

fn crosses_devices(err: &std::io::Error) -> bool {
    err.kind() == ErrorKind::CrossesDevices
}

/// Copies the tree at `src` to the free path `dst`, then removes `src`.
///
/// Files are staged next to their target and renamed into place, so an
/// interrupted copy never leaves a truncated file where the next run would
/// keep it. `src` is only removed once everything is copied.
fn copy_then_remove(src: &Path, dst: &Path) -> Result<(), MigrateError> {
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(|e| MigrateError::io(src, e.into()))?;
        let Ok(rel) = entry.path().strip_prefix(src) else {
            continue;
        };
        let target = if rel.as_os_str().is_empty() {
            dst.to_path_buf()
        } else {
            dst.join(rel)
        };

        let file_type = entry.file_type();
        let copied = if file_type.is_dir() {
            std::fs::create_dir_all(&target)
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)
        } else {
            copy_file_staged(entry.path(), &target)
        };
        copied.map_err(|e| MigrateError::io(entry.path(), e))?;
    }

    let removed = if src.symlink_metadata().is_ok_and(|m| m.is_dir()) {
        std::fs::remove_dir_all(src)
    } else {
        std::fs::remove_file(src)
    };
    removed.map_err(|e| MigrateError::io(src, e))
}

fn copy_file_staged(from: &Path, to: &Path) -> std::io::Result<()> {
    let dir = match to.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = tempfile::Builder::new()
        .prefix(".migrate.")
        .tempfile_in(dir)?
        .into_temp_path();
    std::fs::copy(from, &staged)?;
    staged.persist(to).map_err(|e| e.error)
}

#[cfg(unix)]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(std::fs::read_link(from)?, to)
}

#[cfg(not(unix))]
fn copy_symlink(from: &Path, to: &Path) -> std::io::Result<()> {
    copy_file_staged(from, to)
}

/// Exists without following symlinks, so a dangling link still counts.
pub(crate) fn present(path: &Path) -> bool {
    path.symlink_metadata().is_ok()
}

/// Children of `dir` in name order.
pub(crate) fn sorted_children(dir: &Path) -> Result<Vec<PathBuf>, MigrateError> {
    let entries = std::fs::read_dir(dir).map_err(|e| MigrateError::io(dir, e))?;
    let mut children = Vec::new();
    for entry in entries {
        children.push(entry.map_err(|e| MigrateError::io(dir, e))?.path());
    }
    children.sort();
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().expect("parent")).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn moves_into_free_destination() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("old/a");
        let dst = tmp.path().join("new/deep/a");
        write(&src.join("f.txt"), "hello");

        let mut report = MigrationReport::new(false);
        merge_move(&src, &dst, false, &mut report).expect("merge");

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("f.txt")).unwrap(), "hello");
        assert_eq!(report.moves(), 1);
    }

    #[test]
    fn existing_destination_file_wins() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write(&src.join("voice.wav"), "source copy");
        write(&src.join("sub/only_in_src.txt"), "moved");
        write(&dst.join("voice.wav"), "destination copy");

        let mut report = MigrationReport::new(false);
        merge_move(&src, &dst, false, &mut report).expect("merge");

        assert_eq!(
            fs::read_to_string(dst.join("voice.wav")).unwrap(),
            "destination copy"
        );
        assert_eq!(
            fs::read_to_string(dst.join("sub/only_in_src.txt")).unwrap(),
            "moved"
        );
        // The duplicate stays behind, so the source directory survives.
        assert_eq!(
            fs::read_to_string(src.join("voice.wav")).unwrap(),
            "source copy"
        );
        assert_eq!(report.kept(), 1);
    }

    #[test]
    fn directory_onto_file_is_kept() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write(&src.join("x"), "x");
        write(&dst, "a file");

        let mut report = MigrationReport::new(false);
        merge_move(&src, &dst, false, &mut report).expect("merge");

        assert_eq!(fs::read_to_string(&dst).unwrap(), "a file");
        assert!(src.join("x").exists());
    }

    #[test]
    fn dry_run_changes_nothing() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write(&src.join("a.txt"), "a");
        write(&src.join("b.txt"), "b");
        write(&dst.join("a.txt"), "existing");

        let mut report = MigrationReport::new(true);
        merge_move(&src, &dst, true, &mut report).expect("merge");

        assert!(src.join("a.txt").exists());
        assert!(src.join("b.txt").exists());
        assert!(!dst.join("b.txt").exists());
        assert_eq!(
            report.actions,
            vec![
                MigrationAction::KeepExisting {
                    source: src.join("a.txt"),
                    existing: dst.join("a.txt"),
                },
                MigrationAction::Move {
                    from: src.join("b.txt"),
                    to: dst.join("b.txt"),
                },
            ]
        );
    }

    #[test]
    fn missing_source_is_a_no_op() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut report = MigrationReport::new(false);
        merge_move(
            &tmp.path().join("nope"),
            &tmp.path().join("dst"),
            false,
            &mut report,
        )
        .expect("merge");
        assert!(report.actions.is_empty());
        assert!(!tmp.path().join("dst").exists());
    }

    // ── cross-filesystem fallback ──

    #[test]
    fn only_cross_device_errors_trigger_the_copy() {
        assert!(crosses_devices(&std::io::Error::from(ErrorKind::CrossesDevices)));
        assert!(!crosses_devices(&std::io::Error::from(ErrorKind::PermissionDenied)));
        assert!(!crosses_devices(&std::io::Error::from(ErrorKind::NotFound)));
    }

    #[test]
    fn copy_then_remove_moves_a_tree() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("runs/voice-clones/abby/1");
        let dst = tmp.path().join("voices/abby/1");
        write(&src.join("voice.wav"), "wav");
        write(&src.join("runs/take/cloned_output.wav"), "out");
        fs::create_dir_all(src.join("empty")).unwrap();
        fs::create_dir_all(dst.parent().expect("parent")).unwrap();

        copy_then_remove(&src, &dst).expect("copy");

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(dst.join("voice.wav")).unwrap(), "wav");
        assert_eq!(
            fs::read_to_string(dst.join("runs/take/cloned_output.wav")).unwrap(),
            "out"
        );
        assert!(dst.join("empty").is_dir());
        let leftovers: Vec<_> = fs::read_dir(&dst)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .filter(|n| n.to_string_lossy().starts_with(".migrate."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn copy_then_remove_moves_a_single_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("runs/downloads/source_a.mp3");
        let dst = tmp.path().join("media/source_a.mp3");
        write(&src, "mp3");
        fs::create_dir_all(tmp.path().join("media")).unwrap();

        copy_then_remove(&src, &dst).expect("copy");

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).unwrap(), "mp3");
    }

    #[cfg(unix)]
    #[test]
    fn copy_then_remove_keeps_symlinks_as_links() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        write(&src.join("voice.wav"), "wav");
        std::os::unix::fs::symlink("voice.wav", src.join("latest.wav")).unwrap();

        copy_then_remove(&src, &dst).expect("copy");

        assert_eq!(
            fs::read_link(dst.join("latest.wav")).unwrap(),
            PathBuf::from("voice.wav")
        );
        assert_eq!(fs::read_to_string(dst.join("latest.wav")).unwrap(), "wav");
    }
}
