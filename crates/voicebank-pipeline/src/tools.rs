//! External tool commands and the seam that runs them.
//!
//! Commands are plain values: [`ToolSettings`] builds them, a
//! [`ToolRunner`] executes them. The orchestrator never spawns a process
//! itself, so tests substitute a runner that just writes the expected
//! output file.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use voicebank_store::ClipWindow;

use crate::error::{PipelineError, ToolFailure};
use crate::job::{JobSource, PlannedJob};
use crate::options::PipelineOptions;

/// Placeholder the download tool replaces with the real extension.
pub const DOWNLOAD_EXTENSION_TEMPLATE: &str = "%(ext)s";

/// Which step a command performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    Download,
    Trim,
    ExportEmbedding,
    Synthesize,
}

/// A fully resolved command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub kind: ToolKind,
    pub program: String,
    pub args: Vec<String>,
    /// The file the tool is expected to produce. For downloads this still
    /// contains [`DOWNLOAD_EXTENSION_TEMPLATE`].
    pub output: PathBuf,
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(arg: &str) -> String {
    shlex::try_quote(arg)
        .map(|quoted| quoted.into_owned())
        .unwrap_or_else(|_| arg.to_string())
}

/// Renders a float with at least one decimal place (`30.0`, not `30`).
fn decimal(value: f64) -> String {
    format!("{value:?}")
}

/// How external tools are located and invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolSettings {
    /// Run tools from `PATH` instead of through `uv run`.
    pub use_system_tools: bool,
    /// Pass `--no-sync` to `uv run`.
    pub uv_no_sync: bool,
    /// Upper bound for a single tool call. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    pub uv: String,
    pub ffmpeg: String,
    pub yt_dlp: String,
    pub pocket_tts: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            use_system_tools: false,
            uv_no_sync: false,
            timeout: None,
            uv: "uv".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            yt_dlp: "yt-dlp".to_string(),
            pocket_tts: "pocket-tts".to_string(),
        }
    }
}

impl ToolSettings {
    /// Wraps a Python-environment tool in `uv run` unless system tools are used.
    fn managed(
        &self,
        kind: ToolKind,
        tool: &str,
        args: Vec<String>,
        output: PathBuf,
    ) -> ToolCommand {
        if self.use_system_tools {
            return ToolCommand {
                kind,
                program: tool.to_string(),
                args,
                output,
            };
        }
        let mut full = vec!["run".to_string()];
        if self.uv_no_sync {
            full.push("--no-sync".to_string());
        }
        full.push(tool.to_string());
        full.extend(args);
        ToolCommand {
            kind,
            program: self.uv.clone(),
            args: full,
            output,
        }
    }

    /// Downloads audio for `url` to `<stem>.<ext>`.
    pub fn download_command(
        &self,
        options: &PipelineOptions,
        url: &str,
        stem: &Path,
    ) -> ToolCommand {
        let template = PathBuf::from(format!("{}.{DOWNLOAD_EXTENSION_TEMPLATE}", stem.display()));
        let mut args: Vec<String> = [
            "--no-playlist",
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "0",
        ]
        .map(String::from)
        .into();
        if options.force_ipv4 {
            args.push("--force-ipv4".to_string());
        }
        if let Some(browser) = &options.cookies_from_browser {
            args.extend(["--cookies-from-browser".to_string(), browser.clone()]);
        }
        if let Some(file) = &options.cookies_file {
            args.extend(["--cookies".to_string(), file.display().to_string()]);
        }
        args.extend([
            "--output".to_string(),
            template.display().to_string(),
            url.to_string(),
        ]);
        self.managed(ToolKind::Download, &self.yt_dlp, args, template)
    }

    /// Cuts `window` out of `input` as a mono WAV at the prompt sample rate.
    pub fn trim_command(
        &self,
        options: &PipelineOptions,
        window: &ClipWindow,
        input: &Path,
        output: &Path,
    ) -> ToolCommand {
        let mut args = vec!["-y".to_string()];
        if window.start_seconds > 0.0 {
            args.extend(["-ss".to_string(), decimal(window.start_seconds)]);
        }
        args.extend(["-i".to_string(), input.display().to_string()]);
        if let Some(duration) = window.duration_seconds {
            args.extend(["-t".to_string(), decimal(duration)]);
        }
        args.extend([
            "-ac".to_string(),
            "1".to_string(),
            "-ar".to_string(),
            options.prompt_sample_rate.to_string(),
            "-vn".to_string(),
            "-sn".to_string(),
            "-dn".to_string(),
            output.display().to_string(),
        ]);
        ToolCommand {
            kind: ToolKind::Trim,
            program: self.ffmpeg.clone(),
            args,
            output: output.to_path_buf(),
        }
    }

    /// Derives the voice embedding from a prompt WAV.
    ///
    /// The model is loaded on the job's device with the same variant and
    /// sampling settings synthesis uses. `--truncate` is passed unless
    /// auto-truncation is disabled.
    pub fn export_command(
        &self,
        options: &PipelineOptions,
        prompt: &Path,
        output: &Path,
    ) -> ToolCommand {
        let mut args = vec![
            "export-voice".to_string(),
            prompt.display().to_string(),
            output.display().to_string(),
            "--device".to_string(),
            options.device.clone(),
        ];
        if options.window.auto_truncate_seconds > 0.0 {
            args.push("--truncate".to_string());
        }
        let optional = [
            ("--variant", options.variant.clone()),
            ("--temperature", options.temperature.map(decimal)),
            ("--lsd-decode-steps", options.lsd_decode_steps.map(|v| v.to_string())),
            ("--noise-clamp", options.noise_clamp.map(decimal)),
            ("--eos-threshold", options.eos_threshold.map(decimal)),
        ];
        for (flag, value) in optional
            .into_iter()
            .filter_map(|(flag, value)| value.map(|v| (flag, v)))
        {
            args.extend([flag.to_string(), value]);
        }
        self.managed(
            ToolKind::ExportEmbedding,
            &self.pocket_tts,
            args,
            output.to_path_buf(),
        )
    }

    /// Synthesises `text` with `voice_reference` into `output`.
    pub fn synthesis_command(
        &self,
        options: &PipelineOptions,
        text: &str,
        voice_reference: &str,
        output: &Path,
    ) -> ToolCommand {
        let mut args = vec![
            "generate".to_string(),
            "--text".to_string(),
            text.to_string(),
            "--voice".to_string(),
            voice_reference.to_string(),
            "--output-path".to_string(),
            output.display().to_string(),
            "--device".to_string(),
            options.device.clone(),
        ];
        if !options.verbose {
            args.push("--quiet".to_string());
        }
        let optional = [
            ("--variant", options.variant.clone()),
            ("--temperature", options.temperature.map(decimal)),
            ("--lsd-decode-steps", options.lsd_decode_steps.map(|v| v.to_string())),
            ("--max-tokens", options.max_tokens.map(|v| v.to_string())),
            ("--noise-clamp", options.noise_clamp.map(decimal)),
            ("--eos-threshold", options.eos_threshold.map(decimal)),
            ("--frames-after-eos", options.frames_after_eos.map(|v| v.to_string())),
        ];
        for (flag, value) in optional
            .into_iter()
            .filter_map(|(flag, value)| value.map(|v| (flag, v)))
        {
            args.extend([flag.to_string(), value]);
        }
        self.managed(ToolKind::Synthesize, &self.pocket_tts, args, output.to_path_buf())
    }

    /// Programs `jobs` will need, in the order they are checked.
    pub fn required_programs(&self, jobs: &[PlannedJob], skip_generate: bool) -> Vec<String> {
        let needs_source = jobs.iter().any(|job| job.source().is_some());
        let needs_download = jobs
            .iter()
            .any(|job| matches!(job.source(), Some(JobSource::Url(_))));

        let mut programs = Vec::new();
        if needs_source {
            programs.push(self.ffmpeg.clone());
        }
        if self.use_system_tools {
            if needs_download {
                programs.push(self.yt_dlp.clone());
            }
            if needs_source || !skip_generate {
                programs.push(self.pocket_tts.clone());
            }
        } else {
            programs.push(self.uv.clone());
        }
        programs
    }

    /// Checks that every program `jobs` need can be found on `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingTools`] naming every missing program.
    pub fn ensure_available(
        &self,
        jobs: &[PlannedJob],
        skip_generate: bool,
    ) -> Result<(), PipelineError> {
        let missing: Vec<String> = self
            .required_programs(jobs, skip_generate)
            .into_iter()
            .filter(|program| which::which(program).is_err())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::MissingTools(missing))
        }
    }
}

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Executes tool commands.
pub trait ToolRunner {
    /// Runs `command` to completion.
    ///
    /// A non-zero exit is reported as [`PipelineError::Tool`].
    fn run(
        &self,
        command: &ToolCommand,
    ) -> impl Future<Output = Result<ToolOutput, PipelineError>> + Send;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, Default)]
pub struct SubprocessRunner {
    timeout: Option<Duration>,
}

impl SubprocessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self { timeout }
    }
}

impl ToolRunner for SubprocessRunner {
    async fn run(&self, command: &ToolCommand) -> Result<ToolOutput, PipelineError> {
        let child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PipelineError::io(format!("failed to spawn {}", command.program), e))?;

        let waited = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, waited).await.map_err(|_| {
                ToolFailure {
                    command: command.to_string(),
                    status: None,
                    stdout: String::new(),
                    stderr: format!("timed out after {} seconds", limit.as_secs()),
                }
            })?,
            None => waited.await,
        }
        .map_err(|e| PipelineError::io(format!("failed to wait for {}", command.program), e))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(ToolFailure {
                command: command.to_string(),
                status: output.status.code(),
                stdout,
                stderr,
            }
            .into());
        }
        Ok(ToolOutput { stdout, stderr })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start: f64, duration: Option<f64>) -> ClipWindow {
        ClipWindow {
            start_seconds: start,
            duration_seconds: duration,
        }
    }

    #[test]
    fn download_goes_through_uv() {
        let settings = ToolSettings {
            uv_no_sync: true,
            ..ToolSettings::default()
        };
        let options = PipelineOptions {
            force_ipv4: true,
            cookies_from_browser: Some("firefox".to_string()),
            ..PipelineOptions::default()
        };
        let cmd = settings.download_command(
            &options,
            "https://example.com/v",
            Path::new("media/downloads/source_abc"),
        );

        assert_eq!(cmd.program, "uv");
        assert_eq!(
            cmd.args,
            [
                "run",
                "--no-sync",
                "yt-dlp",
                "--no-playlist",
                "--extract-audio",
                "--audio-format",
                "mp3",
                "--audio-quality",
                "0",
                "--force-ipv4",
                "--cookies-from-browser",
                "firefox",
                "--output",
                "media/downloads/source_abc.%(ext)s",
                "https://example.com/v",
            ]
        );
        assert_eq!(cmd.output, PathBuf::from("media/downloads/source_abc.%(ext)s"));
    }

    #[test]
    fn display_quotes_arguments_with_spaces() {
        let cmd = ToolCommand {
            kind: ToolKind::Synthesize,
            program: "pocket-tts".to_string(),
            args: vec!["--text".to_string(), "Hi there".to_string()],
            output: PathBuf::from("o.wav"),
        };
        let line = cmd.to_string();
        assert!(line.starts_with("pocket-tts --text "));
        assert_ne!(line, "pocket-tts --text Hi there");
    }

    #[test]
    fn trim_is_never_wrapped() {
        let options = PipelineOptions::default();
        let cmd = ToolSettings::default().trim_command(
            &options,
            &window(1294.0, Some(30.0)),
            Path::new("in.mp3"),
            Path::new("voice_prompt.wav"),
        );
        assert_eq!(cmd.program, "ffmpeg");
        assert_eq!(
            cmd.args,
            [
                "-y", "-ss", "1294.0", "-i", "in.mp3", "-t", "30.0", "-ac", "1", "-ar",
                "24000", "-vn", "-sn", "-dn", "voice_prompt.wav",
            ]
        );
    }

    #[test]
    fn trim_omits_zero_start_and_open_duration() {
        let cmd = ToolSettings::default().trim_command(
            &PipelineOptions::default(),
            &window(0.0, None),
            Path::new("in.mp3"),
            Path::new("out.wav"),
        );
        assert!(!cmd.args.contains(&"-ss".to_string()));
        assert!(!cmd.args.contains(&"-t".to_string()));
    }

    #[test]
    fn synthesis_flags() {
        let settings = ToolSettings {
            use_system_tools: true,
            ..ToolSettings::default()
        };
        let options = PipelineOptions {
            temperature: Some(0.7),
            max_tokens: Some(200),
            ..PipelineOptions::default()
        };
        let cmd = settings.synthesis_command(&options, "Hi there", "alba", Path::new("o.wav"));

        assert_eq!(cmd.program, "pocket-tts");
        assert_eq!(
            cmd.args,
            [
                "generate", "--text", "Hi there", "--voice", "alba", "--output-path", "o.wav",
                "--device", "cpu", "--quiet", "--temperature", "0.7", "--max-tokens", "200",
            ]
        );
    }

    #[test]
    fn export_targets_embedding_file() {
        let cmd = ToolSettings::default().export_command(
            &PipelineOptions::default(),
            Path::new("p/voice_prompt.wav"),
            Path::new("p/voice.safetensors"),
        );
        assert_eq!(cmd.kind, ToolKind::ExportEmbedding);
        assert_eq!(
            cmd.args,
            [
                "run",
                "pocket-tts",
                "export-voice",
                "p/voice_prompt.wav",
                "p/voice.safetensors",
                "--device",
                "cpu",
                "--truncate",
            ]
        );
        assert_eq!(cmd.output, PathBuf::from("p/voice.safetensors"));
    }

    #[test]
    fn export_follows_job_model_settings() {
        let mut options = PipelineOptions {
            device: "cuda".to_string(),
            variant: Some("b6369a24".to_string()),
            temperature: Some(0.5),
            max_tokens: Some(100),
            ..PipelineOptions::default()
        };
        options.window.auto_truncate_seconds = 0.0;
        let settings = ToolSettings {
            use_system_tools: true,
            ..ToolSettings::default()
        };

        let cmd = settings.export_command(&options, Path::new("in.wav"), Path::new("out.st"));
        assert_eq!(cmd.program, "pocket-tts");
        assert_eq!(
            cmd.args,
            [
                "export-voice", "in.wav", "out.st", "--device", "cuda", "--variant", "b6369a24",
                "--temperature", "0.5",
            ]
        );
    }

    #[tokio::test]
    async fn subprocess_failure_carries_status_and_output() {
        let cmd = ToolCommand {
            kind: ToolKind::Trim,
            program: "sh".to_string(),
            args: vec!["-c".to_string(), "echo out; echo err >&2; exit 3".to_string()],
            output: PathBuf::from("unused"),
        };
        let err = SubprocessRunner::default()
            .run(&cmd)
            .await
            .expect_err("command should fail");

        let PipelineError::Tool(failure) = err else {
            panic!("expected a tool failure, got {err:?}");
        };
        assert_eq!(failure.status, Some(3));
        assert_eq!(failure.stdout.trim(), "out");
        assert_eq!(failure.stderr.trim(), "err");
    }

    #[tokio::test]
    async fn subprocess_timeout_is_a_tool_failure() {
        let cmd = ToolCommand {
            kind: ToolKind::Synthesize,
            program: "sleep".to_string(),
            args: vec!["5".to_string()],
            output: PathBuf::from("unused"),
        };
        let err = SubprocessRunner::new(Some(Duration::from_millis(50)))
            .run(&cmd)
            .await
            .expect_err("command should time out");
        assert!(matches!(err, PipelineError::Tool(ToolFailure { status: None, .. })));
    }
}
