//! Voice profile names and selectors.
//!
//! A profile is addressed by a *base* name plus a positive *version*. The
//! two are joined with `-` into a selector string (`goofy-2`), which is why
//! a base name may never contain `-` itself.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Separator between base name and version in a selector string.
pub const SELECTOR_SEPARATOR: char = '-';

/// Errors produced while validating voice names and selectors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceNameError {
    /// A clone name contained the selector separator.
    #[error(
        "clone voice names cannot contain '-': use a base name like `goofy` when creating a \
         clone, and `goofy-1`, `goofy-2` to select a version at generation time (got {0:?})"
    )]
    ContainsSeparator(String),

    /// A clone name contained characters outside `[A-Za-z0-9_]`, or was empty.
    #[error("clone voice names must match [A-Za-z0-9_]+ (got {0:?})")]
    InvalidBase(String),

    /// A selector did not match `base` or `base-N`.
    #[error(
        "invalid voice selector {0:?}: use `goofy` (defaults to version 1) or `goofy-2`; \
         base names may only contain letters, numbers, and underscores"
    )]
    InvalidSelector(String),
}

/// A validated, lower-cased voice base name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceBase(String);

impl VoiceBase {
    /// Validates a clone name and returns its lower-cased form.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceNameError::ContainsSeparator`] if the trimmed name
    /// contains `-`, or [`VoiceNameError::InvalidBase`] if it is empty or has
    /// characters outside `[A-Za-z0-9_]`.
    pub fn parse(raw: &str) -> Result<Self, VoiceNameError> {
        let trimmed = raw.trim();
        if trimmed.contains(SELECTOR_SEPARATOR) {
            return Err(VoiceNameError::ContainsSeparator(trimmed.to_string()));
        }
        if !is_base_name(trimmed) {
            return Err(VoiceNameError::InvalidBase(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceBase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VoiceBase {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A `(base, version)` pair identifying one saved voice profile.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VoiceSelector {
    pub base: VoiceBase,
    pub version: u32,
}

impl VoiceSelector {
    pub fn new(base: VoiceBase, version: u32) -> Self {
        Self { base, version }
    }

    /// Parses `base` or `base-N`.
    ///
    /// A bare base selects version 1. The version must be a positive integer
    /// without leading zeros.
    ///
    /// # Errors
    ///
    /// Returns [`VoiceNameError::InvalidSelector`] for anything else.
    pub fn parse(raw: &str) -> Result<Self, VoiceNameError> {
        let trimmed = raw.trim();
        let invalid = || VoiceNameError::InvalidSelector(trimmed.to_string());

        let (base, version) = match trimmed.split_once(SELECTOR_SEPARATOR) {
            Some((base, version)) => (base, parse_version(version).ok_or_else(invalid)?),
            None => (trimmed, 1),
        };
        if !is_base_name(base) {
            return Err(invalid());
        }

        Ok(Self {
            base: VoiceBase(base.to_ascii_lowercase()),
            version,
        })
    }
}

impl fmt::Display for VoiceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.base, SELECTOR_SEPARATOR, self.version)
    }
}

fn is_base_name(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_version(value: &str) -> Option<u32> {
    if value.is_empty() || value.starts_with('0') || !value.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}
