//! `voicebank`: clone voices from source audio, generate speech with saved
//! voices, and list what the store holds.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use voicebank_cli::config::{load_config, resolve_config_path, Config};
use voicebank_cli::init_tracing;
use voicebank_pipeline::{
    failure_hints, library, load_jobs_tsv, plan_jobs, Job, Pipeline, PipelineError,
    PipelineOptions, SubprocessRunner, DEFAULT_PROMPT_SAMPLE_RATE, FAILURE_EXIT_CODE,
};
use voicebank_store::{ClipWindowOptions, DEFAULT_AUTO_TRUNCATE_SECONDS};

/// Versioned voice profiles built from source audio
#[derive(Parser, Debug)]
#[command(name = "voicebank")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: $VOICEBANK_CONFIG_PATH or ./voicebank.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Clone a voice from source audio and/or generate speech with a saved voice
    Run(Box<RunArgs>),
    /// List saved voices and their runs
    List {
        /// Only show profiles of this base name
        #[arg(long)]
        voice: Option<String>,
    },
}

/// Single-job flags that make no sense alongside `--jobs-tsv`.
const JOBS_TSV_CONFLICTS: [&str; 7] = [
    "source_url",
    "source_file",
    "text",
    "run_name",
    "voice",
    "start",
    "end",
];

#[derive(Args, Debug)]
struct RunArgs {
    /// Source audio URL (or a local path)
    #[arg(long, visible_alias = "youtube-url", conflicts_with = "source_file")]
    source_url: Option<String>,

    /// Local source audio file
    #[arg(long)]
    source_file: Option<PathBuf>,

    /// Batch file: <source_url>\t<text>[\t<run_name>[\t<voice>]] per line
    #[arg(long, conflicts_with_all = JOBS_TSV_CONFLICTS)]
    jobs_tsv: Option<PathBuf>,

    /// Text to synthesise
    #[arg(long)]
    text: Option<String>,

    /// Label prefixed to the run directory name
    #[arg(long)]
    run_name: Option<String>,

    /// Clone name (with a source) or voice selector like `goofy-2` (without)
    #[arg(long)]
    voice: Option<String>,

    #[arg(long, default_value = "cpu")]
    device: String,

    #[arg(long)]
    variant: Option<String>,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    lsd_decode_steps: Option<u32>,

    #[arg(long)]
    max_tokens: Option<u32>,

    #[arg(long)]
    noise_clamp: Option<f64>,

    #[arg(long)]
    eos_threshold: Option<f64>,

    #[arg(long)]
    frames_after_eos: Option<u32>,

    /// Clip start, e.g. `21:34`
    #[arg(long)]
    start: Option<String>,

    /// Clip end, e.g. `23:01`
    #[arg(long)]
    end: Option<String>,

    #[arg(long, default_value_t = 0.0)]
    trim_start_seconds: f64,

    #[arg(long)]
    trim_duration_seconds: Option<f64>,

    /// Prompt length when no trim duration is given (0 disables)
    #[arg(long, default_value_t = DEFAULT_AUTO_TRUNCATE_SECONDS)]
    auto_truncate_seconds: f64,

    #[arg(long, default_value_t = DEFAULT_PROMPT_SAMPLE_RATE)]
    prompt_sample_rate: u32,

    #[arg(long)]
    cookies_from_browser: Option<String>,

    #[arg(long)]
    cookies_file: Option<PathBuf>,

    #[arg(long)]
    force_ipv4: bool,

    /// Run tools from PATH instead of through `uv run`
    #[arg(long)]
    use_system_tools: bool,

    /// Pass --no-sync to `uv run`
    #[arg(long)]
    uv_no_sync: bool,

    /// Only build the voice profile
    #[arg(long)]
    skip_generate: bool,

    /// Print every step without running it
    #[arg(long)]
    dry_run: bool,

    /// Show tool command lines and output
    #[arg(short, long)]
    verbose: bool,
}

impl RunArgs {
    fn options(&self) -> PipelineOptions {
        PipelineOptions {
            device: self.device.clone(),
            variant: self.variant.clone(),
            temperature: self.temperature,
            lsd_decode_steps: self.lsd_decode_steps,
            max_tokens: self.max_tokens,
            noise_clamp: self.noise_clamp,
            eos_threshold: self.eos_threshold,
            frames_after_eos: self.frames_after_eos,
            window: ClipWindowOptions {
                start: self.start.clone(),
                end: self.end.clone(),
                trim_start_seconds: self.trim_start_seconds,
                trim_duration_seconds: self.trim_duration_seconds,
                auto_truncate_seconds: self.auto_truncate_seconds,
            },
            prompt_sample_rate: self.prompt_sample_rate,
            cookies_from_browser: self.cookies_from_browser.clone(),
            cookies_file: self.cookies_file.clone(),
            force_ipv4: self.force_ipv4,
            skip_generate: self.skip_generate,
            dry_run: self.dry_run,
            verbose: self.verbose,
        }
    }

    fn jobs(&self) -> Result<Vec<Job>, PipelineError> {
        match &self.jobs_tsv {
            Some(path) => load_jobs_tsv(path),
            None => Ok(vec![Job {
                source_url: self.source_url.clone(),
                source_path: self.source_file.clone(),
                text: self.text.clone(),
                run_name: self.run_name.clone(),
                voice: self.voice.clone(),
            }]),
        }
    }
}

async fn run(args: &RunArgs, config: &Config) -> Result<(), PipelineError> {
    let options = args.options();
    let jobs = plan_jobs(args.jobs()?, &options, args.jobs_tsv.is_some())?;

    let mut tools = config.tools.settings();
    tools.use_system_tools |= args.use_system_tools;
    tools.uv_no_sync |= args.uv_no_sync;
    tools.ensure_available(&jobs, options.skip_generate)?;

    let runner = SubprocessRunner::new(tools.timeout);
    let pipeline = Pipeline::new(config.store.layout(), tools, options, runner)?;
    let outcomes = pipeline.run_batch(&jobs).await?;

    tracing::info!(jobs = outcomes.len(), "all jobs completed");
    for outcome in &outcomes {
        println!("{}  {}", outcome.selector, outcome.final_dir().display());
        if let Some(wav) = &outcome.output_wav {
            println!("    output: {}", wav.display());
        }
    }
    Ok(())
}

fn list(config: &Config, voice: Option<&str>) -> Result<(), PipelineError> {
    let root = &config.store.voices_root;
    let mut profiles = library(root)?;
    if let Some(voice) = voice {
        profiles.retain(|p| p.profile.base.eq_ignore_ascii_case(voice));
    }

    if profiles.is_empty() {
        println!("No saved voices under {}", root.display());
        return Ok(());
    }

    for summary in &profiles {
        let profile = &summary.profile;
        let mut artifacts = Vec::new();
        if profile.has_wav {
            artifacts.push("wav");
        }
        if profile.has_embedding {
            artifacts.push("safetensors");
        }
        println!("{}  [{}]", profile.selector(), artifacts.join(", "));

        for run in &summary.runs {
            let label = run.run_name.as_deref().unwrap_or(&run.run_id);
            let created = run.created_at.as_deref().unwrap_or("-");
            println!("    {created}  {label}");
            if let Some(text) = &run.text {
                println!("        text: {text}");
            }
            if let Some(wav) = &run.output_wav {
                println!("        output: {}", wav.display());
            }
        }
    }
    Ok(())
}

fn report_failure(err: &PipelineError) {
    tracing::error!("{err}");
    if let PipelineError::Tool(failure) = err {
        if !failure.stderr.trim().is_empty() {
            tracing::error!(stderr = %failure.stderr.trim_end(), "tool stderr");
        }
        if !failure.stdout.trim().is_empty() {
            tracing::error!(stdout = %failure.stdout.trim_end(), "tool stdout");
        }
        for hint in failure_hints(failure) {
            tracing::warn!("hint: {hint}");
        }
    }
}

fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config_path, config_source) = resolve_config_path(cli.config.as_deref());
    let config = match load_config(Some(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return exit_code(FAILURE_EXIT_CODE);
        }
    };
    init_tracing(&config.logging);
    tracing::debug!(
        source = config_source,
        path = %config_path,
        "resolved configuration path"
    );

    let result = match &cli.command {
        Commands::Run(args) => run(args, &config).await,
        Commands::List { voice } => list(&config, voice.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report_failure(&err);
            exit_code(err.exit_code())
        }
    }
}
