//! Configuration loading from file and environment variables.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use voicebank_pipeline::ToolSettings;
use voicebank_store::StoreLayout;

/// Config file used when neither `--config` nor `VOICEBANK_CONFIG_PATH` is set.
pub const DEFAULT_CONFIG_PATH: &str = "voicebank.toml";

/// Top-level configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Store locations.
    #[serde(default)]
    pub store: StoreConfig,

    /// External tool settings.
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where profiles and downloads live.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Root of `<base>/<version>` profile directories.
    #[serde(default = "default_voices_root")]
    pub voices_root: PathBuf,

    /// Shared download cache directory.
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
}

/// How external tools are invoked.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsConfig {
    /// Run tools from `PATH` instead of through `uv run`.
    #[serde(default)]
    pub use_system_tools: bool,

    /// Pass `--no-sync` to `uv run`.
    #[serde(default)]
    pub uv_no_sync: bool,

    /// Per-call timeout in seconds; `0` waits indefinitely.
    #[serde(default)]
    pub timeout_seconds: u64,

    #[serde(default = "default_uv")]
    pub uv: String,

    #[serde(default = "default_ffmpeg")]
    pub ffmpeg: String,

    #[serde(default = "default_yt_dlp")]
    pub yt_dlp: String,

    #[serde(default = "default_pocket_tts")]
    pub pocket_tts: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "voicebank_pipeline=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

fn default_voices_root() -> PathBuf {
    PathBuf::from("voices")
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("media").join("downloads")
}

fn default_uv() -> String {
    "uv".to_string()
}

fn default_ffmpeg() -> String {
    "ffmpeg".to_string()
}

fn default_yt_dlp() -> String {
    "yt-dlp".to_string()
}

fn default_pocket_tts() -> String {
    "pocket-tts".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            voices_root: default_voices_root(),
            downloads_dir: default_downloads_dir(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            use_system_tools: false,
            uv_no_sync: false,
            timeout_seconds: 0,
            uv: default_uv(),
            ffmpeg: default_ffmpeg(),
            yt_dlp: default_yt_dlp(),
            pocket_tts: default_pocket_tts(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl StoreConfig {
    pub fn layout(&self) -> StoreLayout {
        StoreLayout::new(&self.voices_root, &self.downloads_dir)
    }
}

impl ToolsConfig {
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }

    pub fn settings(&self) -> ToolSettings {
        ToolSettings {
            use_system_tools: self.use_system_tools,
            uv_no_sync: self.uv_no_sync,
            timeout: self.timeout(),
            uv: self.uv.clone(),
            ffmpeg: self.ffmpeg.clone(),
            yt_dlp: self.yt_dlp.clone(),
            pocket_tts: self.pocket_tts.clone(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Loads configuration from a TOML file, falling back to defaults.
///
/// Environment variable overrides:
/// - `VOICEBANK_VOICES_ROOT` overrides `store.voices_root`
/// - `VOICEBANK_DOWNLOADS_DIR` overrides `store.downloads_dir`
/// - `VOICEBANK_TOOL_TIMEOUT` overrides `tools.timeout_seconds`
/// - `VOICEBANK_LOG_LEVEL` overrides `logging.level`
/// - `VOICEBANK_LOG_JSON` overrides `logging.json` (set to "true" to enable)
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Applies `VOICEBANK_*` overrides read through `lookup`.
///
/// Unparseable numeric values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(root) = lookup("VOICEBANK_VOICES_ROOT") {
        config.store.voices_root = PathBuf::from(root);
    }
    if let Some(dir) = lookup("VOICEBANK_DOWNLOADS_DIR") {
        config.store.downloads_dir = PathBuf::from(dir);
    }
    if let Some(timeout) = lookup("VOICEBANK_TOOL_TIMEOUT") {
        if let Ok(parsed) = timeout.trim().parse() {
            config.tools.timeout_seconds = parsed;
        }
    }
    if let Some(level) = lookup("VOICEBANK_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("VOICEBANK_LOG_JSON") {
        config.logging.json = json == "true" || json == "1";
    }
}

/// Picks the config path: explicit flag, then `VOICEBANK_CONFIG_PATH`, then
/// [`DEFAULT_CONFIG_PATH`]. Returns the path and where it came from.
pub fn resolve_config_path(flag: Option<&str>) -> (String, &'static str) {
    if let Some(path) = flag.filter(|value| !value.trim().is_empty()) {
        return (path.to_string(), "cli-arg");
    }
    if let Ok(path) = std::env::var("VOICEBANK_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }
    (DEFAULT_CONFIG_PATH.to_string(), "default")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_means_defaults() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("absent.toml");
        let config = load_config(path.to_str()).expect("defaults");
        assert_eq!(config.tools.uv, "uv");
        assert_eq!(config.tools.timeout(), None);
    }

    #[test]
    fn file_values_fill_sections() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("voicebank.toml");
        std::fs::write(
            &path,
            r#"
[store]
voices_root = "/data/voices"

[tools]
use_system_tools = true
timeout_seconds = 600
ffmpeg = "/opt/ffmpeg/bin/ffmpeg"

[logging]
level = "debug"
"#,
        )
        .expect("should write config");

        let config = load_config(path.to_str()).expect("should parse");
        assert_eq!(config.store.voices_root, PathBuf::from("/data/voices"));
        assert_eq!(
            config.store.downloads_dir,
            PathBuf::from("media").join("downloads")
        );
        let settings = config.tools.settings();
        assert!(settings.use_system_tools);
        assert_eq!(settings.timeout, Some(Duration::from_secs(600)));
        assert_eq!(settings.ffmpeg, "/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(settings.pocket_tts, "pocket-tts");
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("voicebank.toml");
        std::fs::write(&path, "[tools\nuv = ").expect("should write config");
        assert!(matches!(
            load_config(path.to_str()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn env_overrides_win() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("VOICEBANK_VOICES_ROOT", "/srv/voices"),
            ("VOICEBANK_TOOL_TIMEOUT", "45"),
            ("VOICEBANK_LOG_JSON", "1"),
        ]);
        let mut config = Config::default();
        apply_env_overrides(&mut config, |key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.store.voices_root, PathBuf::from("/srv/voices"));
        assert_eq!(config.tools.timeout_seconds, 45);
        assert!(config.logging.json);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn bad_timeout_override_is_ignored() {
        let mut config = Config::default();
        config.tools.timeout_seconds = 10;
        apply_env_overrides(&mut config, |key| {
            (key == "VOICEBANK_TOOL_TIMEOUT").then(|| "soon".to_string())
        });
        assert_eq!(config.tools.timeout_seconds, 10);
    }

    #[test]
    fn explicit_flag_beats_default() {
        assert_eq!(
            resolve_config_path(Some("custom.toml")),
            ("custom.toml".to_string(), "cli-arg")
        );
    }
}
