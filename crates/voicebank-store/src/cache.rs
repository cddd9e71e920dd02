//! Shared download cache keyed by source fingerprint.
//!
//! Cached files live directly in one flat directory as
//! `<scheme>_<fingerprint>.<ext>`. Lookups try every scheme in
//! [`CACHE_KEY_SCHEMES`] in order; writes only ever use the first one.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use voicebank_types::is_supported_audio;

use crate::error::StoreError;

/// Cache key prefixes, current scheme first. Later entries are read-only.
pub const CACHE_KEY_SCHEMES: &[&str] = &["source", "youtube"];

/// Number of hex characters of the SHA-256 digest kept in a cache key.
const FINGERPRINT_LEN: usize = 20;

/// Returns the stable fingerprint of a source identifier.
///
/// Surrounding whitespace is ignored, so `" url "` and `"url"` share a key.
pub fn source_fingerprint(source_id: &str) -> String {
    let digest = Sha256::digest(source_id.trim().as_bytes());
    let mut key = hex::encode(digest);
    key.truncate(FINGERPRINT_LEN);
    key
}

/// A flat directory of downloaded source audio.
#[derive(Debug, Clone)]
pub struct DownloadCache {
    dir: PathBuf,
}

impl DownloadCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the extension-less path a new download for `source_id` is written to.
    ///
    /// The download tool appends its own extension.
    pub fn store_path_for(&self, source_id: &str) -> PathBuf {
        self.dir
            .join(stem_for(CACHE_KEY_SCHEMES[0], &source_fingerprint(source_id)))
    }

    /// Finds a cached file for `source_id` under any known key scheme.
    ///
    /// Within a scheme, files whose extension is not a supported audio type
    /// are ignored and the lexicographically first match wins. A missing
    /// cache directory is a miss, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the cache directory exists but cannot
    /// be listed.
    pub fn lookup(&self, source_id: &str) -> Result<Option<PathBuf>, StoreError> {
        if !self.dir.is_dir() {
            return Ok(None);
        }

        let fingerprint = source_fingerprint(source_id);
        for scheme in CACHE_KEY_SCHEMES {
            let stem = stem_for(scheme, &fingerprint);
            if let Some(hit) = self.find_with_stem(&stem)? {
                tracing::debug!(scheme, path = %hit.display(), "download cache hit");
                return Ok(Some(hit));
            }
        }

        tracing::debug!(%fingerprint, "download cache miss");
        Ok(None)
    }

    fn find_with_stem(&self, stem: &str) -> Result<Option<PathBuf>, StoreError> {
        let prefix = format!("{stem}.");
        let entries = std::fs::read_dir(&self.dir).map_err(|e| StoreError::io(&self.dir, e))?;

        let mut candidates = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io(&self.dir, e))?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with(&prefix) && is_supported_audio(name) && entry.path().is_file() {
                candidates.push(entry.path());
            }
        }

        candidates.sort();
        Ok(candidates.into_iter().next())
    }
}

fn stem_for(scheme: &str, fingerprint: &str) -> String {
    format!("{scheme}_{fingerprint}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    #[test]
    fn fingerprint_is_trimmed_and_truncated() {
        let key = source_fingerprint(URL);
        assert_eq!(key.len(), FINGERPRINT_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key, source_fingerprint(&format!("  {URL}\n")));
        assert_ne!(key, source_fingerprint("https://example.com/other"));
    }

    #[test]
    fn fingerprint_matches_sha256_prefix() {
        // sha256("abc") = ba7816bf8f01cfea414140de5dae2223b00361a3...
        assert_eq!(source_fingerprint("abc"), "ba7816bf8f01cfea4141");
    }

    #[test]
    fn store_path_uses_current_scheme() {
        let cache = DownloadCache::new("media/downloads");
        let path = cache.store_path_for(URL);
        assert_eq!(
            path,
            PathBuf::from("media/downloads").join(format!("source_{}", source_fingerprint(URL)))
        );
    }

    #[test]
    fn missing_directory_is_a_miss() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let cache = DownloadCache::new(tmp.path().join("absent"));
        assert_eq!(cache.lookup(URL).expect("lookup"), None);
    }
}
