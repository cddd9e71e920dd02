//! `voicebank-migrate`: move a store from the legacy `runs/` layout into
//! `voices/` and `media/downloads/`, rewriting manifests to match.
//!
//! Assumes exclusive access to the store while it runs.

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

use voicebank_cli::config::{load_config, resolve_config_path};
use voicebank_cli::init_tracing;
use voicebank_migrate::{migrate, MigrateError};

/// Migrate legacy runs/ outputs into voices/ and media/downloads/
#[derive(Parser, Debug)]
#[command(name = "voicebank-migrate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root of the store (the directory containing runs/)
    #[arg(long, default_value = ".")]
    repo_root: PathBuf,

    /// Show what would change without moving or rewriting anything
    #[arg(long)]
    dry_run: bool,

    /// Config file used for logging settings
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let (config_path, _) = resolve_config_path(cli.config.as_deref());
    let config = match load_config(Some(&config_path)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ERROR: {e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(&config.logging);

    let root = cli.repo_root.canonicalize().unwrap_or(cli.repo_root);
    tracing::info!(path = %root.display(), "repo root");
    tracing::info!(dry_run = cli.dry_run, "dry run");

    match migrate(&root, cli.dry_run) {
        Ok(report) => {
            tracing::info!(
                moved = report.moves(),
                kept = report.kept(),
                manifests_rewritten = report.rewritten_manifests(),
                manifests_skipped = report.skipped_manifests(),
                "Migration completed."
            );
            ExitCode::SUCCESS
        }
        Err(MigrateError::RootMissing(path)) => {
            tracing::error!(path = %path.display(), "repo root does not exist");
            ExitCode::from(2)
        }
        Err(e) => {
            tracing::error!(error = %e, "migration failed");
            ExitCode::FAILURE
        }
    }
}
