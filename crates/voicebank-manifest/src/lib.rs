//! Run manifests: the provenance record written next to every run.
//!
//! A manifest is a JSON object written once by the job that owns the run.
//! Afterwards only the layout migrator touches it, and only to relocate
//! path strings. To keep that rewrite honest the tree is held as a closed
//! [`ManifestValue`] union with an explicit recursive visitor, and path
//! relocation is an ordered list of literal [`RewriteRule`]s.

mod error;
mod record;
mod rewrite;
mod value;

pub use error::ManifestError;
pub use record::{
    build_manifest, read_manifest, write_manifest, Artifacts, RunRecord, CREATED_AT_FORMAT,
};
pub use rewrite::{
    rewrite_manifest_file, rewrite_path_string, rewrite_paths, RewriteRule, LEGACY_LAYOUT_RULES,
};
pub use value::ManifestValue;
