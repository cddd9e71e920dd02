//! Jobs: what to clone or generate, and the checks that run before any of it.

use std::path::{Path, PathBuf};

use voicebank_types::{is_supported_audio, VoiceBase, VoiceSelector, SUPPORTED_AUDIO_EXTENSIONS};

use crate::error::PipelineError;
use crate::options::PipelineOptions;

/// A job as requested, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Job {
    pub source_url: Option<String>,
    pub source_path: Option<PathBuf>,
    pub text: Option<String>,
    pub run_name: Option<String>,
    /// Clone name for source jobs, selector for voice-only jobs.
    pub voice: Option<String>,
}

/// Where a clone job's audio comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobSource {
    Url(String),
    File(PathBuf),
}

/// What a validated job does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// Build a new profile version from source audio.
    Clone { base: VoiceBase, source: JobSource },
    /// Generate with an existing profile or built-in voice.
    Generate { selector: VoiceSelector },
}

/// A job that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedJob {
    pub kind: JobKind,
    pub text: Option<String>,
    pub run_name: Option<String>,
    /// The voice string as given, recorded in the manifest options.
    pub voice: String,
}

impl PlannedJob {
    pub fn source(&self) -> Option<&JobSource> {
        match &self.kind {
            JobKind::Clone { source, .. } => Some(source),
            JobKind::Generate { .. } => None,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        match self.source() {
            Some(JobSource::Url(url)) => Some(url),
            _ => None,
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        match self.source() {
            Some(JobSource::File(path)) => Some(path),
            _ => None,
        }
    }
}

/// Loads jobs from a tab-separated file.
///
/// Each line is `<source_url>\t<text>[\t<run_name>[\t<voice>]]`. Blank
/// lines and lines whose first cell starts with `#` are skipped. Empty
/// cells count as absent.
///
/// # Errors
///
/// - [`PipelineError::NotFound`] if the file does not exist.
/// - [`PipelineError::Validation`] if a line has fewer than two columns or
///   the file holds no jobs.
pub fn load_jobs_tsv(path: &Path) -> Result<Vec<Job>, PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::NotFound(format!(
            "jobs TSV not found: {}",
            path.display()
        )));
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| PipelineError::io(format!("failed to read {}", path.display()), e))?;

    let mut jobs = Vec::new();
    for (index, line) in raw.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let cells: Vec<&str> = line.split('\t').collect();
        if cells[0].trim().starts_with('#') {
            continue;
        }
        if cells.len() < 2 {
            return Err(PipelineError::Validation(format!(
                "{}:{}: expected at least 2 columns: \
                 <source_url> <text> [optional_run_name] [optional_voice_name]",
                path.display(),
                index + 1
            )));
        }

        let cell = |i: usize| {
            cells
                .get(i)
                .map(|c| c.trim())
                .filter(|c| !c.is_empty())
                .map(str::to_string)
        };
        jobs.push(Job {
            source_url: cell(0),
            source_path: None,
            text: cell(1),
            run_name: cell(2),
            voice: cell(3),
        });
    }

    if jobs.is_empty() {
        return Err(PipelineError::Validation(format!(
            "no jobs found in {}",
            path.display()
        )));
    }
    tracing::debug!(path = %path.display(), jobs = jobs.len(), "loaded jobs file");
    Ok(jobs)
}

/// Validates every job before anything runs.
///
/// `batch` marks jobs loaded from a file. The clip window is resolved once
/// here so a bad window fails the whole invocation up front.
///
/// # Errors
///
/// Returns [`PipelineError::Validation`] for a malformed job or option, and
/// [`PipelineError::NotFound`] for a local source file that does not exist.
pub fn plan_jobs(
    jobs: Vec<Job>,
    options: &PipelineOptions,
    batch: bool,
) -> Result<Vec<PlannedJob>, PipelineError> {
    let time_window = options.window.uses_time_window();
    if batch && time_window {
        return Err(PipelineError::Validation(
            "--start/--end are currently supported only in single-job mode".to_string(),
        ));
    }
    options.window.resolve()?;

    jobs.into_iter()
        .map(|job| plan_job(job, options))
        .collect()
}

fn plan_job(job: Job, options: &PipelineOptions) -> Result<PlannedJob, PipelineError> {
    let source = match (job.source_url, job.source_path) {
        (Some(_), Some(_)) => {
            return Err(PipelineError::Validation(
                "provide only one source per job (URL or local file)".to_string(),
            ))
        }
        // A "URL" naming an existing local path is a local file.
        (Some(url), None) if Path::new(&url).exists() => Some(JobSource::File(PathBuf::from(url))),
        (Some(url), None) => Some(JobSource::Url(url)),
        (None, Some(path)) => Some(JobSource::File(path)),
        (None, None) => None,
    };

    let Some(voice) = job.voice else {
        return Err(PipelineError::Validation(match source {
            Some(_) => "when using a source audio input, a voice is required \
                        (base name without '-')"
                .to_string(),
            None => "provide either a source (build a voice from audio) \
                     or a voice (use an existing saved voice)"
                .to_string(),
        }));
    };

    if options.skip_generate && source.is_none() {
        return Err(PipelineError::Validation(
            "--skip-generate is only valid with a source input".to_string(),
        ));
    }
    if !options.skip_generate && job.text.is_none() {
        return Err(PipelineError::Validation(
            "generation requires text".to_string(),
        ));
    }
    if options.window.uses_time_window() && source.is_none() {
        return Err(PipelineError::Validation(
            "--start/--end are only valid with source cloning runs".to_string(),
        ));
    }

    let kind = match source {
        Some(source) => {
            let base = VoiceBase::parse(&voice)?;
            if let JobSource::File(path) = &source {
                check_source_file(path)?;
            }
            JobKind::Clone { base, source }
        }
        None => JobKind::Generate {
            selector: VoiceSelector::parse(&voice)?,
        },
    };

    Ok(PlannedJob {
        kind,
        text: job.text,
        run_name: job.run_name,
        voice,
    })
}

fn check_source_file(path: &Path) -> Result<(), PipelineError> {
    if !path.is_file() {
        return Err(PipelineError::NotFound(format!(
            "source audio file not found: {}",
            path.display()
        )));
    }
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
    if !is_supported_audio(name) {
        return Err(PipelineError::Validation(format!(
            "unsupported source file extension for {}; expected one of: {}",
            path.display(),
            SUPPORTED_AUDIO_EXTENSIONS.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(voice: &str) -> Job {
        Job {
            text: Some("hello".to_string()),
            voice: Some(voice.to_string()),
            ..Job::default()
        }
    }

    #[test]
    fn voice_only_job_parses_selector() {
        let planned = plan_jobs(vec![generate("Abby-2")], &PipelineOptions::default(), false)
            .expect("valid job");
        assert_eq!(
            planned[0].kind,
            JobKind::Generate {
                selector: VoiceSelector::parse("abby-2").unwrap()
            }
        );
        assert_eq!(planned[0].voice, "Abby-2");
    }

    #[test]
    fn url_job_requires_clone_name() {
        let job = Job {
            source_url: Some("https://example.com/watch?v=1".to_string()),
            text: Some("hi".to_string()),
            voice: Some("abby-2".to_string()),
            ..Job::default()
        };
        let err = plan_jobs(vec![job], &PipelineOptions::default(), false).unwrap_err();
        assert!(err.to_string().contains("cannot contain '-'"), "{err}");
    }

    #[test]
    fn job_without_source_or_voice_fails() {
        let job = Job {
            text: Some("hi".to_string()),
            ..Job::default()
        };
        assert!(matches!(
            plan_jobs(vec![job], &PipelineOptions::default(), false),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn generation_requires_text() {
        let job = Job {
            voice: Some("alba".to_string()),
            ..Job::default()
        };
        let err = plan_jobs(vec![job], &PipelineOptions::default(), false).unwrap_err();
        assert_eq!(err.to_string(), "generation requires text");
    }

    #[test]
    fn skip_generate_requires_source() {
        let options = PipelineOptions {
            skip_generate: true,
            ..PipelineOptions::default()
        };
        assert!(matches!(
            plan_jobs(vec![generate("alba")], &options, false),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn time_window_rules() {
        let mut options = PipelineOptions::default();
        options.window.start = Some("1:00".to_string());

        // Only with a source.
        assert!(plan_jobs(vec![generate("alba")], &options, false).is_err());
        // Never in batch mode.
        let err = plan_jobs(Vec::new(), &options, true).unwrap_err();
        assert!(err.to_string().contains("single-job mode"));

        options.window.trim_duration_seconds = Some(5.0);
        assert!(matches!(
            plan_jobs(Vec::new(), &options, false),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn local_source_must_exist_with_audio_extension() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = Job {
            source_path: Some(tmp.path().join("nope.mp3")),
            voice: Some("abby".to_string()),
            text: Some("hi".to_string()),
            ..Job::default()
        };
        assert!(matches!(
            plan_jobs(vec![missing], &PipelineOptions::default(), false),
            Err(PipelineError::NotFound(_))
        ));

        let notes = tmp.path().join("notes.txt");
        std::fs::write(&notes, "x").unwrap();
        let wrong_ext = Job {
            source_path: Some(notes),
            voice: Some("abby".to_string()),
            text: Some("hi".to_string()),
            ..Job::default()
        };
        assert!(matches!(
            plan_jobs(vec![wrong_ext], &PipelineOptions::default(), false),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn url_naming_local_file_becomes_file_source() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let clip = tmp.path().join("clip.WAV");
        std::fs::write(&clip, "x").unwrap();
        let job = Job {
            source_url: Some(clip.display().to_string()),
            voice: Some(" Abby ".to_string()),
            text: Some("hi".to_string()),
            ..Job::default()
        };

        let planned = plan_jobs(vec![job], &PipelineOptions::default(), false).expect("valid");
        assert_eq!(planned[0].source_path(), Some(clip.as_path()));
        assert!(planned[0].source_url().is_none());
    }

    // ── jobs file ──

    #[test]
    fn tsv_skips_comments_and_blank_lines() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("jobs.tsv");
        std::fs::write(
            &path,
            "# source\ttext\n\nhttps://a\tHello there\tintro\tabby\n\tJust text\t\talba\n",
        )
        .unwrap();

        let jobs = load_jobs_tsv(&path).expect("load");
        assert_eq!(jobs.len(), 2);
        assert_eq!(jobs[0].source_url.as_deref(), Some("https://a"));
        assert_eq!(jobs[0].run_name.as_deref(), Some("intro"));
        assert_eq!(jobs[0].voice.as_deref(), Some("abby"));
        assert_eq!(jobs[1].source_url, None);
        assert_eq!(jobs[1].run_name, None);
        assert_eq!(jobs[1].voice.as_deref(), Some("alba"));
    }

    #[test]
    fn tsv_short_line_reports_location() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("jobs.tsv");
        std::fs::write(&path, "https://a\tok\nhttps://b\n").unwrap();

        let err = load_jobs_tsv(&path).unwrap_err();
        assert!(err.to_string().contains("jobs.tsv:2:"), "{err}");
    }

    #[test]
    fn tsv_without_jobs_is_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("jobs.tsv");
        std::fs::write(&path, "# nothing here\n").unwrap();
        assert!(matches!(
            load_jobs_tsv(&path),
            Err(PipelineError::Validation(_))
        ));
        assert!(matches!(
            load_jobs_tsv(&tmp.path().join("missing.tsv")),
            Err(PipelineError::NotFound(_))
        ));
    }
}
