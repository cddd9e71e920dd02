//! Shared types and constants for the voicebank store.
//!
//! This crate holds the vocabulary every other crate agrees on: the file
//! names that make up a voice profile and a run, the audio extensions the
//! pipeline accepts, the built-in voices of the synthesis tool, and the
//! validated voice name types.
//!
//! No crate in the workspace depends on anything *except* `voicebank-types`
//! for cross-cutting type definitions.

pub mod voice;

pub use voice::{VoiceBase, VoiceNameError, VoiceSelector};

/// Prompt audio stored in every profile version directory.
pub const VOICE_PROFILE_WAV: &str = "voice.wav";

/// Embedding derived from the prompt audio.
pub const VOICE_PROFILE_SAFETENSORS: &str = "voice.safetensors";

/// Trimmed clip produced from the source audio before it becomes the profile WAV.
pub const VOICE_PROMPT_WAV: &str = "voice_prompt.wav";

/// Provenance manifest written once per run.
pub const MANIFEST_FILE_NAME: &str = "run_manifest.json";

/// Synthesised output of a generation run.
pub const CLONED_OUTPUT_WAV: &str = "cloned_output.wav";

/// Subdirectory of a profile version that holds generation runs.
pub const RUNS_DIR_NAME: &str = "runs";

/// Source audio extensions accepted for local files and download cache hits.
///
/// Entries include the leading dot and are compared case-insensitively.
pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[
    ".aac", ".flac", ".m4a", ".mp3", ".mp4", ".opus", ".wav", ".webm",
];

/// Voices shipped with the synthesis tool, usable without a saved profile.
pub const PREDEFINED_VOICES: &[&str] = &[
    "alba", "marius", "javert", "jean", "fantine", "cosette", "eponine", "azelma",
];

/// Returns `true` if `name` ends with one of [`SUPPORTED_AUDIO_EXTENSIONS`].
pub fn is_supported_audio(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    SUPPORTED_AUDIO_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext) && lower.len() > ext.len())
}

/// Returns `true` if `name` is one of the synthesis tool's built-in voices.
pub fn is_predefined_voice(name: &str) -> bool {
    PREDEFINED_VOICES.contains(&name)
}
