//! Clip window resolution for voice prompts.
//!
//! Two option families describe which part of the source audio becomes the
//! voice prompt: a time window (`start`/`end` strings) and the older trim
//! options (numeric offset plus optional duration). [`ClipWindowOptions::resolve`]
//! is the only place precedence is decided; the trim command and the run
//! manifest both call it on the same options so they always agree.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::timespec::parse_timespec;

/// Window length assumed when only `start` is given.
pub const START_ONLY_DEFAULT_WINDOW_SECONDS: f64 = 30.0;

/// Default cap on prompt length when no trim duration is given.
pub const DEFAULT_AUTO_TRUNCATE_SECONDS: f64 = 30.0;

/// Clip window options as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClipWindowOptions {
    /// Clip start time, e.g. `21:34`.
    pub start: Option<String>,
    /// Clip end time, e.g. `23:01`.
    pub end: Option<String>,
    /// Trim offset in seconds.
    pub trim_start_seconds: f64,
    /// Trim duration in seconds.
    pub trim_duration_seconds: Option<f64>,
    /// Prompt length used when `trim_duration_seconds` is unset. `0` disables it.
    pub auto_truncate_seconds: f64,
}

impl Default for ClipWindowOptions {
    fn default() -> Self {
        Self {
            start: None,
            end: None,
            trim_start_seconds: 0.0,
            trim_duration_seconds: None,
            auto_truncate_seconds: DEFAULT_AUTO_TRUNCATE_SECONDS,
        }
    }
}

/// A resolved clip window: offset plus optional length, both in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClipWindow {
    pub start_seconds: f64,
    /// `None` means "to the end of the source".
    pub duration_seconds: Option<f64>,
}

impl ClipWindowOptions {
    /// The clip start, with a blank string counting as unset.
    pub fn start(&self) -> Option<&str> {
        non_blank(self.start.as_deref())
    }

    /// The clip end, with a blank string counting as unset.
    pub fn end(&self) -> Option<&str> {
        non_blank(self.end.as_deref())
    }

    /// Returns `true` if a non-blank `start` or `end` is set.
    pub fn uses_time_window(&self) -> bool {
        self.start().is_some() || self.end().is_some()
    }

    /// Returns `true` if a trim offset or duration is set.
    pub fn uses_trim_window(&self) -> bool {
        self.trim_start_seconds > 0.0 || self.trim_duration_seconds.is_some()
    }

    /// Resolves the options into a canonical window.
    ///
    /// # Errors
    ///
    /// - [`StoreError::ConflictingWindowSpec`] if both families are used.
    /// - [`StoreError::InvalidTimeSpec`] if `start` or `end` does not parse.
    /// - [`StoreError::InvalidWindow`] if `end` is not after `start`.
    pub fn resolve(&self) -> Result<ClipWindow, StoreError> {
        if self.uses_time_window() && self.uses_trim_window() {
            return Err(StoreError::ConflictingWindowSpec);
        }

        if self.uses_time_window() {
            let start_seconds = match self.start() {
                Some(start) => parse_timespec(start)?,
                None => 0.0,
            };
            let duration_seconds = match self.end() {
                Some(end) => {
                    let end_seconds = parse_timespec(end)?;
                    if end_seconds <= start_seconds {
                        return Err(StoreError::InvalidWindow {
                            start: self.start().unwrap_or("0").to_string(),
                            end: end.to_string(),
                        });
                    }
                    end_seconds - start_seconds
                }
                None => START_ONLY_DEFAULT_WINDOW_SECONDS,
            };
            return Ok(ClipWindow {
                start_seconds,
                duration_seconds: Some(duration_seconds),
            });
        }

        let duration_seconds = self.trim_duration_seconds.or(
            (self.auto_truncate_seconds > 0.0).then_some(self.auto_truncate_seconds),
        );
        Ok(ClipWindow {
            start_seconds: self.trim_start_seconds,
            duration_seconds,
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
