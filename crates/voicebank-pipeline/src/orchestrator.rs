//! Runs planned jobs against the store.
//!
//! A clone job allocates the next profile version, creates its directory
//! exclusively, turns source audio into a prompt WAV plus embedding, and
//! optionally synthesises a first sample into a fresh run directory. A
//! voice-only job resolves an existing profile (or built-in voice) and
//! synthesises into a new run directory under it. Either way the store is
//! only ever extended: nothing existing is overwritten.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use voicebank_manifest::{build_manifest, write_manifest, Artifacts, RunRecord};
use voicebank_store::{
    create_exclusive, list_versions, next_version, output_wav_path, run_id, ClipWindow,
    StoreLayout,
};
use voicebank_types::{is_predefined_voice, VoiceBase, VoiceSelector};

use crate::error::PipelineError;
use crate::job::{JobKind, JobSource, PlannedJob};
use crate::options::PipelineOptions;
use crate::tools::{ToolCommand, ToolRunner, ToolSettings};

type Clock = Box<dyn Fn() -> NaiveDateTime + Send + Sync>;

/// What one job did, or in dry-run mode would have done.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub selector: VoiceSelector,
    /// The profile version directory.
    pub profile_dir: PathBuf,
    /// The generation run directory, if synthesis was planned.
    pub run_dir: Option<PathBuf>,
    pub source_audio: Option<PathBuf>,
    /// Whether the source audio came from the download cache.
    pub reused_download: bool,
    /// Profile WAV path or built-in voice name handed to synthesis.
    pub voice_reference: String,
    pub output_wav: Option<PathBuf>,
    pub manifests: Vec<PathBuf>,
    /// Every external step, in order, as a shell-style line.
    pub commands: Vec<String>,
}

impl JobOutcome {
    fn new(selector: VoiceSelector, profile_dir: PathBuf, run_dir: Option<PathBuf>) -> Self {
        Self {
            selector,
            profile_dir,
            run_dir,
            source_audio: None,
            reused_download: false,
            voice_reference: String::new(),
            output_wav: None,
            manifests: Vec::new(),
            commands: Vec::new(),
        }
    }

    /// The directory a user should look in: the run if there is one, else the profile.
    pub fn final_dir(&self) -> &Path {
        self.run_dir.as_deref().unwrap_or(&self.profile_dir)
    }
}

/// Executes planned jobs one at a time.
pub struct Pipeline<R> {
    layout: StoreLayout,
    tools: ToolSettings,
    options: PipelineOptions,
    window: ClipWindow,
    runner: R,
    clock: Clock,
}

impl<R: ToolRunner> Pipeline<R> {
    /// Creates a pipeline. The clip window is resolved here, once.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Validation`] if the window options are invalid.
    pub fn new(
        layout: StoreLayout,
        tools: ToolSettings,
        options: PipelineOptions,
        runner: R,
    ) -> Result<Self, PipelineError> {
        let window = options.window.resolve()?;
        Ok(Self {
            layout,
            tools,
            options,
            window,
            runner,
            clock: Box::new(|| chrono::Local::now().naive_local()),
        })
    }

    /// Replaces the wall clock used for run ids and manifest timestamps.
    pub fn with_clock(mut self, clock: impl Fn() -> NaiveDateTime + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.layout
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Runs `jobs` in order, stopping at the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first job's error; later jobs are not attempted.
    pub async fn run_batch(&self, jobs: &[PlannedJob]) -> Result<Vec<JobOutcome>, PipelineError> {
        if !self.options.dry_run {
            let root = &self.layout.voices_root;
            std::fs::create_dir_all(root)
                .map_err(|e| PipelineError::io(format!("failed to create {}", root.display()), e))?;
        }

        let mut outcomes = Vec::with_capacity(jobs.len());
        for (index, job) in jobs.iter().enumerate() {
            outcomes.push(self.run_job(job, index + 1, jobs.len()).await?);
        }
        Ok(outcomes)
    }

    /// Runs a single job. `ordinal` and `total` only label log lines.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::Collision`] if a directory the job creates exists.
    /// - [`PipelineError::NotFound`] if the selected voice does not exist.
    /// - [`PipelineError::Tool`] if an external tool fails.
    pub async fn run_job(
        &self,
        job: &PlannedJob,
        ordinal: usize,
        total: usize,
    ) -> Result<JobOutcome, PipelineError> {
        let now = (self.clock)();
        match &job.kind {
            JobKind::Clone { base, source } => {
                self.run_clone(job, base, source, now, ordinal, total).await
            }
            JobKind::Generate { selector } => {
                self.run_generate(job, selector, now, ordinal, total).await
            }
        }
    }

    async fn run_clone(
        &self,
        job: &PlannedJob,
        base: &VoiceBase,
        source: &JobSource,
        now: NaiveDateTime,
        ordinal: usize,
        total: usize,
    ) -> Result<JobOutcome, PipelineError> {
        let dry_run = self.options.dry_run;
        let version = next_version(&self.layout.voices_root, base)?;
        let selector = VoiceSelector::new(base.clone(), version);
        let profile_dir = self.layout.profile_dir(&selector);
        let run_dir = (!self.options.skip_generate)
            .then(|| self.layout.run_dir(&selector, &run_id(job.run_name.as_deref(), now)));

        tracing::info!(
            job = ordinal,
            of = total,
            voice = %selector,
            profile_dir = %profile_dir.display(),
            run_dir = ?run_dir.as_deref().map(Path::display),
            "cloning voice"
        );

        if !dry_run {
            create_exclusive(&profile_dir)?;
            if let Some(dir) = &run_dir {
                create_exclusive(dir)?;
            }
        }

        let mut outcome = JobOutcome::new(selector.clone(), profile_dir.clone(), run_dir.clone());
        let source_audio = match source {
            JobSource::File(path) => path.clone(),
            JobSource::Url(url) => self.fetch_source(url, &mut outcome).await?,
        };
        outcome.source_audio = Some(source_audio.clone());

        let prompt_wav = self.layout.prompt_wav(&selector);
        let trim = self
            .tools
            .trim_command(&self.options, &self.window, &source_audio, &prompt_wav);
        self.execute(trim, &mut outcome).await?;

        let profile_wav = self.layout.profile_wav(&selector);
        if dry_run {
            let line = format!("cp {} {}", prompt_wav.display(), profile_wav.display());
            tracing::info!(command = %line, "[dry-run] would run");
            outcome.commands.push(line);
        } else {
            std::fs::copy(&prompt_wav, &profile_wav).map_err(|e| {
                PipelineError::io(format!("failed to copy {}", prompt_wav.display()), e)
            })?;
        }

        let embedding = self.layout.profile_safetensors(&selector);
        let export = self.tools.export_command(&self.options, &prompt_wav, &embedding);
        self.execute(export, &mut outcome).await?;
        tracing::info!(
            wav = %profile_wav.display(),
            embedding = %embedding.display(),
            "saved voice profile"
        );

        outcome.voice_reference = profile_wav.display().to_string();
        self.synthesize(job, &mut outcome).await?;

        if !dry_run {
            let record = RunRecord {
                created_at: now,
                source_url: job.source_url().map(str::to_string),
                source_path: job.source_path().map(Path::to_path_buf),
                text: job.text.clone(),
                run_name: job.run_name.clone(),
                voice: Some(selector),
                artifacts: Artifacts {
                    source_audio: Some(source_audio),
                    voice_prompt_wav: Some(prompt_wav),
                    voice_profile_wav: Some(profile_wav),
                    voice_profile_safetensors: Some(embedding),
                    voice_reference_used: Some(outcome.voice_reference.clone()),
                    cloned_output_wav: outcome.output_wav.clone(),
                },
                options: self.options.manifest_options(&job.voice, &self.window),
            };
            let manifest = build_manifest(&record);
            outcome.manifests.push(write_manifest(&profile_dir, &manifest)?);
            if let Some(dir) = &run_dir {
                outcome.manifests.push(write_manifest(dir, &manifest)?);
            }
        }
        Ok(outcome)
    }

    async fn run_generate(
        &self,
        job: &PlannedJob,
        selector: &VoiceSelector,
        now: NaiveDateTime,
        ordinal: usize,
        total: usize,
    ) -> Result<JobOutcome, PipelineError> {
        let profile_dir = self.layout.profile_dir(selector);
        let run_dir = self
            .layout
            .run_dir(selector, &run_id(job.run_name.as_deref(), now));

        tracing::info!(
            job = ordinal,
            of = total,
            voice = %selector,
            run_dir = %run_dir.display(),
            "generating with saved voice"
        );

        // Resolve before creating anything so a bad selector leaves no trace.
        let voice_reference = self.resolve_voice_reference(job, selector)?;
        if !self.options.dry_run {
            create_exclusive(&run_dir)?;
        }

        let mut outcome = JobOutcome::new(selector.clone(), profile_dir, Some(run_dir.clone()));
        outcome.voice_reference = voice_reference;
        self.synthesize(job, &mut outcome).await?;

        if !self.options.dry_run {
            let record = RunRecord {
                created_at: now,
                source_url: None,
                source_path: None,
                text: job.text.clone(),
                run_name: job.run_name.clone(),
                voice: Some(selector.clone()),
                artifacts: Artifacts {
                    voice_profile_wav: Some(self.layout.profile_wav(selector)),
                    voice_profile_safetensors: Some(self.layout.profile_safetensors(selector)),
                    voice_reference_used: Some(outcome.voice_reference.clone()),
                    cloned_output_wav: outcome.output_wav.clone(),
                    ..Artifacts::default()
                },
                options: self.options.manifest_options(&job.voice, &self.window),
            };
            outcome
                .manifests
                .push(write_manifest(&run_dir, &build_manifest(&record))?);
        }
        Ok(outcome)
    }

    /// Profile WAV, else built-in voice (version 1 only), else an error
    /// naming the versions that do exist.
    fn resolve_voice_reference(
        &self,
        job: &PlannedJob,
        selector: &VoiceSelector,
    ) -> Result<String, PipelineError> {
        let wav = self.layout.profile_wav(selector);
        if self.options.dry_run || wav.is_file() {
            return Ok(wav.display().to_string());
        }
        if selector.version == 1 && is_predefined_voice(selector.base.as_str()) {
            return Ok(selector.base.to_string());
        }

        let embedding = self.layout.profile_safetensors(selector);
        if embedding.is_file() {
            return Err(PipelineError::NotFound(format!(
                "found {} but no WAV voice profile at {}; generation needs the WAV profile, \
                 so rebuild the voice from its source or restore the WAV",
                embedding.display(),
                wav.display()
            )));
        }

        let versions = list_versions(&self.layout.voices_root, &selector.base)?;
        let available = if versions.is_empty() {
            "none".to_string()
        } else {
            versions
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        Err(PipelineError::NotFound(format!(
            "voice profile not found for {:?}; expected {}. \
             Available versions for {:?}: {available}",
            job.voice,
            wav.display(),
            selector.base.as_str()
        )))
    }

    /// Returns cached audio for `url`, downloading it on a miss.
    async fn fetch_source(
        &self,
        url: &str,
        outcome: &mut JobOutcome,
    ) -> Result<PathBuf, PipelineError> {
        let cache = self.layout.download_cache();
        if let Some(hit) = cache.lookup(url)? {
            tracing::info!(path = %hit.display(), "reusing cached source audio");
            outcome.reused_download = true;
            return Ok(hit);
        }

        let stem = cache.store_path_for(url);
        if !self.options.dry_run {
            std::fs::create_dir_all(cache.dir()).map_err(|e| {
                PipelineError::io(format!("failed to create {}", cache.dir().display()), e)
            })?;
        }
        self.execute(self.tools.download_command(&self.options, url, &stem), outcome)
            .await?;

        if self.options.dry_run {
            return Ok(PathBuf::from(format!("{}.mp3", stem.display())));
        }
        cache.lookup(url)?.ok_or_else(|| {
            PipelineError::NotFound(format!(
                "could not find downloaded source audio matching {}.*",
                stem.display()
            ))
        })
    }

    /// Synthesises into the outcome's run directory unless generation is skipped.
    async fn synthesize(
        &self,
        job: &PlannedJob,
        outcome: &mut JobOutcome,
    ) -> Result<(), PipelineError> {
        if self.options.skip_generate {
            tracing::warn!("skipping synthesis (--skip-generate)");
            return Ok(());
        }
        let Some(text) = job.text.as_deref() else {
            return Err(PipelineError::Validation("generation requires text".to_string()));
        };
        let Some(run_dir) = outcome.run_dir.clone() else {
            return Ok(());
        };

        let output = output_wav_path(&run_dir);
        let command = self.tools.synthesis_command(
            &self.options,
            text,
            &outcome.voice_reference,
            &output,
        );
        self.execute(command, outcome).await?;
        outcome.output_wav = Some(output);
        Ok(())
    }

    /// Runs `command`, or only records it in dry-run mode.
    async fn execute(
        &self,
        command: ToolCommand,
        outcome: &mut JobOutcome,
    ) -> Result<(), PipelineError> {
        let line = command.to_string();
        outcome.commands.push(line.clone());

        if self.options.dry_run {
            tracing::info!(command = %line, "[dry-run] would run");
            return Ok(());
        }
        if self.options.verbose {
            tracing::info!(command = %line, "running");
        } else {
            tracing::debug!(command = %line, "running");
        }

        let output = self.runner.run(&command).await?;
        if self.options.verbose {
            if !output.stdout.is_empty() {
                tracing::info!(stdout = %output.stdout.trim_end(), "tool output");
            }
            if !output.stderr.is_empty() {
                tracing::info!(stderr = %output.stderr.trim_end(), "tool output");
            }
        }
        Ok(())
    }
}
