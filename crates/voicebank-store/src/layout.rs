//! Path layout of the store.
//!
//! ```text
//! <voices_root>/<base>/<version>/voice.wav
//! <voices_root>/<base>/<version>/voice.safetensors
//! <voices_root>/<base>/<version>/run_manifest.json
//! <voices_root>/<base>/<version>/runs/<run-id>/run_manifest.json
//! <voices_root>/<base>/<version>/runs/<run-id>/cloned_output.wav
//! <downloads_dir>/source_<fingerprint>.<ext>
//! ```

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use voicebank_types::{
    VoiceSelector, CLONED_OUTPUT_WAV, MANIFEST_FILE_NAME, RUNS_DIR_NAME, VOICE_PROFILE_SAFETENSORS,
    VOICE_PROFILE_WAV, VOICE_PROMPT_WAV,
};

use crate::cache::DownloadCache;

/// `strftime` format of the timestamp part of a run id (microsecond resolution).
pub const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S_%6f";

/// Root directories of a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    pub voices_root: PathBuf,
    pub downloads_dir: PathBuf,
}

impl StoreLayout {
    pub fn new(voices_root: impl Into<PathBuf>, downloads_dir: impl Into<PathBuf>) -> Self {
        Self {
            voices_root: voices_root.into(),
            downloads_dir: downloads_dir.into(),
        }
    }

    /// Layout under `root` using the default directory names.
    pub fn under(root: &Path) -> Self {
        Self::new(root.join("voices"), root.join("media").join("downloads"))
    }

    pub fn download_cache(&self) -> DownloadCache {
        DownloadCache::new(&self.downloads_dir)
    }

    /// `<voices_root>/<base>/<version>`
    pub fn profile_dir(&self, selector: &VoiceSelector) -> PathBuf {
        self.voices_root
            .join(selector.base.as_str())
            .join(selector.version.to_string())
    }

    pub fn profile_wav(&self, selector: &VoiceSelector) -> PathBuf {
        self.profile_dir(selector).join(VOICE_PROFILE_WAV)
    }

    pub fn profile_safetensors(&self, selector: &VoiceSelector) -> PathBuf {
        self.profile_dir(selector).join(VOICE_PROFILE_SAFETENSORS)
    }

    pub fn prompt_wav(&self, selector: &VoiceSelector) -> PathBuf {
        self.profile_dir(selector).join(VOICE_PROMPT_WAV)
    }

    pub fn runs_dir(&self, selector: &VoiceSelector) -> PathBuf {
        self.profile_dir(selector).join(RUNS_DIR_NAME)
    }

    pub fn run_dir(&self, selector: &VoiceSelector, run_id: &str) -> PathBuf {
        self.runs_dir(selector).join(run_id)
    }
}

/// Manifest path inside a profile or run directory.
pub fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE_NAME)
}

/// Output WAV path inside a run directory.
pub fn output_wav_path(run_dir: &Path) -> PathBuf {
    run_dir.join(CLONED_OUTPUT_WAV)
}

/// Builds a run directory name: `<slug>_<timestamp>` or just `<timestamp>`.
pub fn run_id(label: Option<&str>, at: NaiveDateTime) -> String {
    let timestamp = at.format(RUN_TIMESTAMP_FORMAT).to_string();
    match label {
        Some(label) => format!("{}_{timestamp}", sanitize_slug(label)),
        None => timestamp,
    }
}

/// Reduces a free-form label to `[a-z0-9._-]`, never returning an empty string.
pub fn sanitize_slug(value: &str) -> String {
    let lowered = value.trim().to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut in_gap = false;
    for c in lowered.chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-') {
            slug.push(c);
            in_gap = false;
        } else if !in_gap {
            slug.push('-');
            in_gap = true;
        }
    }

    let trimmed = slug.trim_matches(|c| matches!(c, '-' | '.' | '_'));
    if trimmed.is_empty() {
        "job".to_string()
    } else {
        trimmed.to_string()
    }
}
