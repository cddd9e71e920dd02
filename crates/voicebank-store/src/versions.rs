//! Version allocation for voice profiles.
//!
//! Versions are the numeric subdirectories of `<voices_root>/<base>`.
//! Allocation reads the directory and returns `max + 1`; it does not
//! reserve anything. Two callers racing on the same base can compute the
//! same version, and the loser finds out when [`crate::create_exclusive`]
//! reports a collision.

use std::num::ParseIntError;
use std::path::Path;

use voicebank_types::VoiceBase;

use crate::error::StoreError;

/// Lists existing versions of `base`, ascending.
///
/// Entries that are not directories, or whose names are not purely
/// decimal digits, are ignored, as is `0`. A missing base directory yields
/// an empty list.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the base directory exists but cannot be
/// read, or [`StoreError::VersionOutOfRange`] for an all-digit directory
/// name too large to be a version. Skipping it would let the allocator hand
/// out a version below it.
pub fn list_versions(voices_root: &Path, base: &VoiceBase) -> Result<Vec<u32>, StoreError> {
    let base_dir = voices_root.join(base.as_str());
    if !base_dir.is_dir() {
        return Ok(Vec::new());
    }

    let entries = std::fs::read_dir(&base_dir).map_err(|e| StoreError::io(&base_dir, e))?;
    let mut versions = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::io(&base_dir, e))?;
        if !entry.path().is_dir() {
            continue;
        }
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        match version_from_name(name) {
            Some(Ok(version)) => versions.push(version),
            Some(Err(_)) => return Err(StoreError::VersionOutOfRange(entry.path())),
            None => {}
        }
    }

    versions.sort_unstable();
    Ok(versions)
}

/// Returns the version a new clone of `base` should be written to.
///
/// This is one more than the highest existing version, or `1` when none
/// exist. Deleted versions are never handed out again.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if the base directory cannot be read, or
/// [`StoreError::VersionOutOfRange`] if no version above the existing ones
/// is left.
pub fn next_version(voices_root: &Path, base: &VoiceBase) -> Result<u32, StoreError> {
    let versions = list_versions(voices_root, base)?;
    match versions.last() {
        None => Ok(1),
        Some(&max) => max.checked_add(1).ok_or_else(|| {
            StoreError::VersionOutOfRange(voices_root.join(base.as_str()).join(max.to_string()))
        }),
    }
}

/// Parses a version directory name, skipping names that do not fit.
pub(crate) fn parse_version_dir(name: &str) -> Option<u32> {
    version_from_name(name)?.ok()
}

/// `None` for names that are not versions at all, `Some(Err)` for all-digit
/// names beyond `u32`.
fn version_from_name(name: &str) -> Option<Result<u32, ParseIntError>> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if name.bytes().all(|b| b == b'0') {
        return None;
    }
    Some(name.parse())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abby() -> VoiceBase {
        VoiceBase::parse("abby").expect("valid base")
    }

    #[test]
    fn empty_store_starts_at_one() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert_eq!(list_versions(tmp.path(), &abby()).unwrap(), Vec::<u32>::new());
        assert_eq!(next_version(tmp.path(), &abby()).unwrap(), 1);
    }

    #[test]
    fn allocation_never_reuses_gaps() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base_dir = tmp.path().join("abby");

        std::fs::create_dir_all(base_dir.join("1")).unwrap();
        assert_eq!(next_version(tmp.path(), &abby()).unwrap(), 2);

        std::fs::create_dir_all(base_dir.join("2")).unwrap();
        std::fs::remove_dir(base_dir.join("1")).unwrap();
        assert_eq!(next_version(tmp.path(), &abby()).unwrap(), 3);
    }

    #[test]
    fn non_numeric_entries_are_ignored() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base_dir = tmp.path().join("abby");
        for name in ["10", "2", "runs", "3a", "0"] {
            std::fs::create_dir_all(base_dir.join(name)).unwrap();
        }
        std::fs::write(base_dir.join("7"), b"not a directory").unwrap();

        assert_eq!(list_versions(tmp.path(), &abby()).unwrap(), vec![2, 10]);
        assert_eq!(next_version(tmp.path(), &abby()).unwrap(), 11);
    }

    #[test]
    fn largest_version_cannot_be_exceeded() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::create_dir_all(tmp.path().join("abby").join(u32::MAX.to_string())).unwrap();

        assert_eq!(list_versions(tmp.path(), &abby()).unwrap(), vec![u32::MAX]);
        assert!(matches!(
            next_version(tmp.path(), &abby()),
            Err(StoreError::VersionOutOfRange(_))
        ));
    }

    #[test]
    fn oversized_version_is_an_error_not_a_gap() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base_dir = tmp.path().join("abby");
        std::fs::create_dir_all(base_dir.join("3")).unwrap();
        std::fs::create_dir_all(base_dir.join("5000000000")).unwrap();

        let err = next_version(tmp.path(), &abby()).unwrap_err();
        match err {
            StoreError::VersionOutOfRange(path) => {
                assert_eq!(path, base_dir.join("5000000000"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn zero_padded_names_count_by_value() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let base_dir = tmp.path().join("abby");
        for name in ["00", "04"] {
            std::fs::create_dir_all(base_dir.join(name)).unwrap();
        }
        assert_eq!(list_versions(tmp.path(), &abby()).unwrap(), vec![4]);
        assert_eq!(next_version(tmp.path(), &abby()).unwrap(), 5);
    }
}
