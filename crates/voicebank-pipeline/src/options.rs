//! Parameters shared by every job of one invocation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use voicebank_manifest::ManifestValue;
use voicebank_store::{ClipWindow, ClipWindowOptions};

/// Default sample rate of the trimmed voice prompt.
pub const DEFAULT_PROMPT_SAMPLE_RATE: u32 = 24_000;

/// Generation, trimming, and download options.
///
/// Unset generation parameters are left to the synthesis tool's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOptions {
    pub device: String,
    pub variant: Option<String>,
    pub temperature: Option<f64>,
    pub lsd_decode_steps: Option<u32>,
    pub max_tokens: Option<u32>,
    pub noise_clamp: Option<f64>,
    pub eos_threshold: Option<f64>,
    pub frames_after_eos: Option<u32>,

    pub window: ClipWindowOptions,
    pub prompt_sample_rate: u32,

    pub cookies_from_browser: Option<String>,
    pub cookies_file: Option<PathBuf>,
    pub force_ipv4: bool,

    /// Build the profile only; no synthesis, no generation run.
    pub skip_generate: bool,
    /// Plan and log every step without running tools or writing files.
    pub dry_run: bool,
    /// Log full tool command lines and output at info level.
    pub verbose: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            device: "cpu".to_string(),
            variant: None,
            temperature: None,
            lsd_decode_steps: None,
            max_tokens: None,
            noise_clamp: None,
            eos_threshold: None,
            frames_after_eos: None,
            window: ClipWindowOptions::default(),
            prompt_sample_rate: DEFAULT_PROMPT_SAMPLE_RATE,
            cookies_from_browser: None,
            cookies_file: None,
            force_ipv4: false,
            skip_generate: false,
            dry_run: false,
            verbose: false,
        }
    }
}

impl PipelineOptions {
    /// The `options` mapping recorded in a run manifest.
    ///
    /// `window` must be the result of resolving `self.window`, so the
    /// recorded clip matches the one handed to the trim tool.
    pub fn manifest_options(&self, voice: &str, window: &ClipWindow) -> ManifestValue {
        ManifestValue::mapping([
            ("voice", ManifestValue::from(voice)),
            ("device", self.device.clone().into()),
            ("variant", self.variant.clone().into()),
            ("temperature", self.temperature.into()),
            ("lsd_decode_steps", self.lsd_decode_steps.into()),
            ("max_tokens", self.max_tokens.into()),
            ("noise_clamp", self.noise_clamp.into()),
            ("eos_threshold", self.eos_threshold.into()),
            ("frames_after_eos", self.frames_after_eos.into()),
            ("trim_start_seconds", self.window.trim_start_seconds.into()),
            (
                "trim_duration_seconds",
                self.window.trim_duration_seconds.into(),
            ),
            ("start", self.window.start.clone().into()),
            ("end", self.window.end.clone().into()),
            ("resolved_clip_start_seconds", window.start_seconds.into()),
            (
                "resolved_clip_duration_seconds",
                window.duration_seconds.into(),
            ),
            (
                "auto_truncate_seconds",
                self.window.auto_truncate_seconds.into(),
            ),
            ("prompt_sample_rate", self.prompt_sample_rate.into()),
            ("cookies_from_browser", self.cookies_from_browser.clone().into()),
            (
                "cookies_file",
                self.cookies_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .into(),
            ),
            ("force_ipv4", self.force_ipv4.into()),
            ("skip_generate", self.skip_generate.into()),
        ])
    }
}
