//! Migration from the legacy `runs/` layout to `voices/` + `media/downloads/`.
//!
//! ```text
//! runs/voice-clones/<base>/<version>/...      -> voices/<base>/<version>/...
//! runs/voices/<base>/<version>/<run>/...      -> voices/<base>/<version>/runs/<run>/...
//! runs/downloads/<entry>                      -> media/downloads/<entry>
//! ```
//!
//! Every move is a merge: files already at the destination win and the
//! source copy is left behind. Manifests under `voices/` are then rewritten
//! with [`voicebank_manifest::LEGACY_LAYOUT_RULES`]. Both steps are safe to
//! repeat, so an interrupted migration is finished by running it again.
//!
//! The migrator assumes exclusive access to the store for its duration.

mod error;
mod merge;
mod migrate;
mod report;

pub use error::MigrateError;
pub use merge::merge_move;
pub use migrate::{migrate, LegacyLayout};
pub use report::{MigrationAction, MigrationReport};
