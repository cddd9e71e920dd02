//! Listing saved voices and their runs.

use std::path::{Path, PathBuf};

use voicebank_manifest::{read_manifest, ManifestValue};
use voicebank_store::{list_profiles, list_runs, manifest_path, output_wav_path, ProfileEntry};

use crate::error::PipelineError;

/// One generation run as shown in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Directory name of the run.
    pub run_id: String,
    pub dir: PathBuf,
    pub created_at: Option<String>,
    pub run_name: Option<String>,
    pub text: Option<String>,
    pub output_wav: Option<PathBuf>,
}

/// A profile version with its runs, newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSummary {
    pub profile: ProfileEntry,
    pub runs: Vec<RunSummary>,
}

/// Lists every saved profile under `voices_root` with its runs.
///
/// # Errors
///
/// Returns [`PipelineError::Store`] if a store directory cannot be listed.
/// Unreadable manifests are not errors; those runs fall back to what the
/// directory itself shows.
pub fn library(voices_root: &Path) -> Result<Vec<ProfileSummary>, PipelineError> {
    list_profiles(voices_root)?
        .into_iter()
        .map(|profile| {
            let runs = list_runs(&profile.runs_dir())?
                .into_iter()
                .map(summarize_run)
                .collect();
            Ok::<_, PipelineError>(ProfileSummary { profile, runs })
        })
        .collect()
}

fn summarize_run(dir: PathBuf) -> RunSummary {
    let run_id = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let on_disk = Some(output_wav_path(&dir)).filter(|p| p.is_file());

    let path = manifest_path(&dir);
    let manifest = if path.is_file() {
        match read_manifest(&path) {
            Ok(manifest) => Some(manifest),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "ignoring unreadable manifest");
                None
            }
        }
    } else {
        None
    };

    let field = |key: &str| {
        manifest
            .as_ref()
            .and_then(|m| m.get(key))
            .and_then(ManifestValue::as_str)
            .map(str::to_string)
    };
    let recorded_output = manifest
        .as_ref()
        .and_then(|m| m.get("artifacts"))
        .and_then(|a| a.get("cloned_output_wav"))
        .and_then(ManifestValue::as_str)
        .map(PathBuf::from);

    RunSummary {
        created_at: field("created_at"),
        run_name: field("run_name"),
        text: field("text"),
        output_wav: on_disk.or(recorded_output),
        run_id,
        dir,
    }
}
