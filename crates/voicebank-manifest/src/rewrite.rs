//! Ordered literal rewrite rules for relocating recorded paths.
//!
//! Rules are plain substring relocations, not regular expressions. Each rule
//! touches only the first occurrence of its segment, and the rules run in a
//! fixed order. A rewritten string no longer contains the segment that
//! triggered the rule, so running the rules a second time changes nothing.

use std::path::Path;

use crate::error::ManifestError;
use crate::record::{read_manifest, write_manifest_file};
use crate::value::ManifestValue;

/// One path relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteRule {
    /// Replace the first occurrence of `from` with `to`.
    Relocate {
        from: &'static str,
        to: &'static str,
    },
    /// Replace the first occurrence of `from` with `to`, then insert
    /// `insert/` after the next `depth` path segments.
    ///
    /// The string is left alone unless at least `depth` complete segments
    /// follow `from`.
    Nest {
        from: &'static str,
        to: &'static str,
        depth: usize,
        insert: &'static str,
    },
}

/// Rules mapping the legacy `runs/` layout onto `voices/` + `media/downloads/`.
///
/// Download paths are relocated first and independently. Clone profiles are
/// relocated before generation runs, whose paths nest under the profile.
pub const LEGACY_LAYOUT_RULES: &[RewriteRule] = &[
    RewriteRule::Relocate {
        from: "runs/downloads/",
        to: "media/downloads/",
    },
    RewriteRule::Relocate {
        from: "runs/voice-clones/",
        to: "voices/",
    },
    RewriteRule::Nest {
        from: "runs/voices/",
        to: "voices/",
        depth: 2,
        insert: "runs",
    },
];

impl RewriteRule {
    /// Applies this rule to `value`, returning `None` if it does not match.
    pub fn apply(&self, value: &str) -> Option<String> {
        match *self {
            Self::Relocate { from, to } => {
                let idx = value.find(from)?;
                let rest = &value[idx + from.len()..];
                Some(format!("{}{to}{rest}", &value[..idx]))
            }
            Self::Nest {
                from,
                to,
                depth,
                insert,
            } => {
                let idx = value.find(from)?;
                let rest = &value[idx + from.len()..];
                let parts: Vec<&str> = rest.splitn(depth + 1, '/').collect();
                if parts.len() <= depth {
                    return None;
                }
                let (kept, tail) = parts.split_at(depth);
                Some(format!(
                    "{}{to}{}/{insert}/{}",
                    &value[..idx],
                    kept.join("/"),
                    tail[0]
                ))
            }
        }
    }
}

/// Applies `rules` in order to a single string.
pub fn rewrite_path_string(value: &str, rules: &[RewriteRule]) -> String {
    rules.iter().fold(value.to_string(), |current, rule| {
        rule.apply(&current).unwrap_or(current)
    })
}

/// Applies `rules` to every string value in `tree`.
///
/// Returns the rewritten tree and whether anything changed. Mapping keys
/// are never rewritten.
pub fn rewrite_paths(tree: &ManifestValue, rules: &[RewriteRule]) -> (ManifestValue, bool) {
    tree.map_strings(&mut |value| rewrite_path_string(value, rules))
}

/// Rewrites the manifest at `path` in place.
///
/// Returns `true` if the manifest needed changes. With `dry_run` the file is
/// read and evaluated but never written.
///
/// # Errors
///
/// Returns [`ManifestError::Parse`] or [`ManifestError::Io`] if the file cannot
/// be read, and [`ManifestError::Io`] if it cannot be written back.
pub fn rewrite_manifest_file(
    path: &Path,
    rules: &[RewriteRule],
    dry_run: bool,
) -> Result<bool, ManifestError> {
    let manifest = read_manifest(path)?;
    let (rewritten, changed) = rewrite_paths(&manifest, rules);
    if changed && !dry_run {
        write_manifest_file(path, &rewritten)?;
    }
    Ok(changed)
}
