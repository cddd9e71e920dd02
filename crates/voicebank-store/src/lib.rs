//! On-disk store for cloned voice profiles, their runs, and the shared
//! download cache.
//!
//! The store has no index and no lock file: the directory tree *is* the
//! state. Everything in this crate is therefore a pure function of its
//! inputs plus whatever the filesystem says at the moment of the call.
//!
//! # Design decisions
//!
//! - **Versions are derived from directory names**: a profile's version set
//!   is whatever numeric subdirectories exist under its base. New versions
//!   are always `max + 1`, so gaps left by manual deletion are never reused.
//! - **Exclusive creation is the only concurrency guard**: [`create_exclusive`]
//!   fails with [`StoreError::Collision`] rather than reusing a directory.
//! - **The download cache is keyed by fingerprint**, not by the source
//!   string, and reads every historical key scheme before reporting a miss.

mod cache;
mod discover;
mod error;
mod fs;
mod layout;
mod timespec;
mod versions;
mod window;

pub use cache::{source_fingerprint, DownloadCache, CACHE_KEY_SCHEMES};
pub use discover::{list_profiles, list_runs, ProfileEntry};
pub use error::StoreError;
pub use fs::create_exclusive;
pub use layout::{
    manifest_path, output_wav_path, run_id, sanitize_slug, StoreLayout, RUN_TIMESTAMP_FORMAT,
};
pub use timespec::parse_timespec;
pub use versions::{list_versions, next_version};
pub use window::{
    ClipWindow, ClipWindowOptions, DEFAULT_AUTO_TRUNCATE_SECONDS, START_ONLY_DEFAULT_WINDOW_SECONDS,
};
