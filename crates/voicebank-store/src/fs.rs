//! Filesystem primitives shared by the pipeline and the migrator.

use std::io::ErrorKind;
use std::path::Path;

use crate::error::StoreError;

/// Creates `path` as a new directory, creating missing parents.
///
/// This is the store's only concurrency guard: if `path` already exists
/// the call fails with [`StoreError::Collision`] instead of reusing it.
/// Parents may already exist.
///
/// # Errors
///
/// Returns [`StoreError::Collision`] if `path` exists, or
/// [`StoreError::Io`] for any other failure.
pub fn create_exclusive(path: &Path) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    match std::fs::create_dir(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "created directory");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            Err(StoreError::Collision(path.to_path_buf()))
        }
        Err(e) => Err(StoreError::io(path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_directory() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let target = tmp.path().join("voices/abby/1");
        create_exclusive(&target).expect("first creation succeeds");
        assert!(target.is_dir());
    }

    #[test]
    fn second_creation_collides() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let target = tmp.path().join("voices/abby/1");
        create_exclusive(&target).unwrap();
        std::fs::write(target.join("voice.wav"), b"RIFF").unwrap();

        let err = create_exclusive(&target).unwrap_err();
        assert!(matches!(err, StoreError::Collision(ref p) if p == &target));
        assert!(target.join("voice.wav").exists(), "existing content untouched");
    }
}
