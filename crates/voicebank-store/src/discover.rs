//! Read-only discovery of saved profiles and their runs.

use std::path::{Path, PathBuf};

use voicebank_types::{RUNS_DIR_NAME, VOICE_PROFILE_SAFETENSORS, VOICE_PROFILE_WAV};

use crate::error::StoreError;
use crate::versions::parse_version_dir;

/// One saved profile version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileEntry {
    /// Directory name of the base, as found on disk.
    pub base: String,
    pub version: u32,
    pub dir: PathBuf,
    pub has_wav: bool,
    pub has_embedding: bool,
}

impl ProfileEntry {
    /// `base-version`, the form accepted as a voice selector.
    pub fn selector(&self) -> String {
        format!("{}-{}", self.base, self.version)
    }

    pub fn runs_dir(&self) -> PathBuf {
        self.dir.join(RUNS_DIR_NAME)
    }
}

/// Lists every profile version under `voices_root` holding a WAV or an embedding.
///
/// Ordered by base (case-insensitive), then version. Version directories
/// without either artifact are skipped. A missing root yields an empty list.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if a directory exists but cannot be listed.
pub fn list_profiles(voices_root: &Path) -> Result<Vec<ProfileEntry>, StoreError> {
    let mut profiles = Vec::new();
    for (base, base_dir) in named_subdirs(voices_root)? {
        for (name, dir) in named_subdirs(&base_dir)? {
            let Some(version) = parse_version_dir(&name) else {
                continue;
            };
            let has_wav = dir.join(VOICE_PROFILE_WAV).is_file();
            let has_embedding = dir.join(VOICE_PROFILE_SAFETENSORS).is_file();
            if !has_wav && !has_embedding {
                continue;
            }
            profiles.push(ProfileEntry {
                base: base.clone(),
                version,
                dir,
                has_wav,
                has_embedding,
            });
        }
    }

    profiles.sort_by(|a, b| {
        a.base
            .to_lowercase()
            .cmp(&b.base.to_lowercase())
            .then(a.version.cmp(&b.version))
    });
    Ok(profiles)
}

/// Lists run directories under `runs_dir`, newest first.
///
/// Run ids end in a fixed-width timestamp, so reverse name order is
/// close to reverse creation order.
///
/// # Errors
///
/// Returns [`StoreError::Io`] if `runs_dir` exists but cannot be listed.
pub fn list_runs(runs_dir: &Path) -> Result<Vec<PathBuf>, StoreError> {
    let mut runs: Vec<PathBuf> = named_subdirs(runs_dir)?
        .into_iter()
        .map(|(_, path)| path)
        .collect();
    runs.reverse();
    Ok(runs)
}

/// Subdirectories of `dir` with UTF-8 names, in name order.
fn named_subdirs(dir: &Path) -> Result<Vec<(String, PathBuf)>, StoreError> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| StoreError::io(dir, e))? {
        let entry = entry.map_err(|e| StoreError::io(dir, e))?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Ok(name) = entry.file_name().into_string() {
            found.push((name, path));
        }
    }
    found.sort();
    Ok(found)
}
