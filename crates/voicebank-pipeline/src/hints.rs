//! Advisory hints for well-known tool failures.
//!
//! Hints never change control flow; they are printed after the error.

use crate::error::ToolFailure;

const DOWNLOAD_HINT: &str = "yt-dlp failures are often fixed by updating yt-dlp and/or \
    providing cookies. If using uv, run `uv lock --upgrade-package yt-dlp && uv sync`, \
    then retry with --cookies-from-browser or --cookies-file.";

const GATED_WEIGHTS_HINT: &str = "voice cloning requires gated model access. Accept the terms \
    at https://huggingface.co/kyutai/pocket-tts, then run `uvx hf auth login`.";

const PROMPT_TOO_LONG_HINT: &str = "the voice prompt is too long for the model context. Use a \
    shorter reference (for example 30s), or pass --trim-duration-seconds 30 / \
    --auto-truncate-seconds 30.";

/// Returns the hints that apply to `failure`, in a fixed order.
pub fn failure_hints(failure: &ToolFailure) -> Vec<&'static str> {
    let output = format!("{}\n{}", failure.stderr, failure.stdout);
    let mut hints = Vec::new();
    if failure.command.contains("yt-dlp") {
        hints.push(DOWNLOAD_HINT);
    }
    if output.contains("We could not download the weights for the model with voice cloning") {
        hints.push(GATED_WEIGHTS_HINT);
    }
    if output.contains("The expanded size of the tensor (1000)") {
        hints.push(PROMPT_TOO_LONG_HINT);
    }
    hints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(command: &str, stderr: &str) -> ToolFailure {
        ToolFailure {
            command: command.to_string(),
            status: Some(1),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn download_failures_suggest_cookies() {
        let hints = failure_hints(&failure("uv run yt-dlp --no-playlist x", "HTTP 403"));
        assert_eq!(hints, [DOWNLOAD_HINT]);
    }

    #[test]
    fn synthesis_failures_are_matched_on_output() {
        let hints = failure_hints(&failure(
            "pocket-tts generate",
            "RuntimeError: The expanded size of the tensor (1000) must match",
        ));
        assert_eq!(hints, [PROMPT_TOO_LONG_HINT]);
        assert!(failure_hints(&failure("ffmpeg -y", "Invalid data")).is_empty());
    }
}
