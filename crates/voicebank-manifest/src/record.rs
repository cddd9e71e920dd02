//! Building, writing, and reading run manifests.

use chrono::NaiveDateTime;
use std::io::Write;
use std::path::{Path, PathBuf};

use voicebank_types::{VoiceSelector, MANIFEST_FILE_NAME};

use crate::error::ManifestError;
use crate::value::ManifestValue;

/// `strftime` format of `created_at` (ISO-8601, second precision).
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Named files a run produced or used. Absent entries are recorded as `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Artifacts {
    pub source_audio: Option<PathBuf>,
    pub voice_prompt_wav: Option<PathBuf>,
    pub voice_profile_wav: Option<PathBuf>,
    pub voice_profile_safetensors: Option<PathBuf>,
    /// A profile WAV path or the name of a built-in voice.
    pub voice_reference_used: Option<String>,
    pub cloned_output_wav: Option<PathBuf>,
}

/// Everything a manifest records about one run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub created_at: NaiveDateTime,
    pub source_url: Option<String>,
    pub source_path: Option<PathBuf>,
    pub text: Option<String>,
    pub run_name: Option<String>,
    pub voice: Option<VoiceSelector>,
    pub artifacts: Artifacts,
    /// Resolved job parameters, normally a [`ManifestValue::Mapping`].
    pub options: ManifestValue,
}

fn path_value(path: Option<&Path>) -> ManifestValue {
    path.map(|p| p.display().to_string()).into()
}

/// Builds the manifest tree for `record`.
///
/// The output depends only on `record`; field order is fixed.
pub fn build_manifest(record: &RunRecord) -> ManifestValue {
    let artifacts = &record.artifacts;
    ManifestValue::mapping([
        (
            "created_at",
            record.created_at.format(CREATED_AT_FORMAT).to_string().into(),
        ),
        ("source_url", record.source_url.clone().into()),
        ("source_path", path_value(record.source_path.as_deref())),
        ("text", record.text.clone().into()),
        ("run_name", record.run_name.clone().into()),
        (
            "voice_profile_name",
            record.voice.as_ref().map(|v| v.base.to_string()).into(),
        ),
        (
            "voice_profile_version",
            record.voice.as_ref().map(|v| v.version).into(),
        ),
        (
            "artifacts",
            ManifestValue::mapping([
                ("source_audio", path_value(artifacts.source_audio.as_deref())),
                (
                    "voice_prompt_wav",
                    path_value(artifacts.voice_prompt_wav.as_deref()),
                ),
                (
                    "voice_profile_wav",
                    path_value(artifacts.voice_profile_wav.as_deref()),
                ),
                (
                    "voice_profile_safetensors",
                    path_value(artifacts.voice_profile_safetensors.as_deref()),
                ),
                (
                    "voice_reference_used",
                    artifacts.voice_reference_used.clone().into(),
                ),
                (
                    "cloned_output_wav",
                    path_value(artifacts.cloned_output_wav.as_deref()),
                ),
            ]),
        ),
        ("options", record.options.clone()),
    ])
}

/// Writes `manifest` as `run_manifest.json` inside `dir` and returns its path.
///
/// Output is pretty-printed with two-space indentation and a trailing newline.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the file cannot be written.
pub fn write_manifest(dir: &Path, manifest: &ManifestValue) -> Result<PathBuf, ManifestError> {
    let path = dir.join(MANIFEST_FILE_NAME);
    write_manifest_file(&path, manifest)?;
    Ok(path)
}

/// Prefix of the sibling temp file a manifest is staged in before it
/// replaces the real one.
const STAGING_PREFIX: &str = ".run_manifest.";

/// Replaces the manifest at `path`.
///
/// The new content is staged in a temp file next to `path` and renamed over
/// it, so an interrupted write leaves the previous manifest intact.
pub(crate) fn write_manifest_file(
    path: &Path,
    manifest: &ManifestValue,
) -> Result<(), ManifestError> {
    let mut json = serde_json::to_string_pretty(manifest)?;
    json.push('\n');

    let io_error = |source: std::io::Error| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    };
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut staged = tempfile::Builder::new()
        .prefix(STAGING_PREFIX)
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(io_error)?;
    staged.write_all(json.as_bytes()).map_err(io_error)?;
    staged.as_file().sync_all().map_err(io_error)?;
    staged.persist(path).map_err(|e| io_error(e.error))?;

    tracing::debug!(path = %path.display(), "wrote manifest");
    Ok(())
}

/// Reads and parses the manifest at `path`.
///
/// # Errors
///
/// Returns [`ManifestError::Io`] if the file cannot be read, or
/// [`ManifestError::Parse`] if it is not valid JSON.
pub fn read_manifest(path: &Path) -> Result<ManifestValue, ManifestError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ManifestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
