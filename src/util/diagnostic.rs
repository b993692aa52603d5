//! User-friendly diagnostic messages.
//!
//! Every error shown to the user carries the root cause, the relevant
//! context (requested version, supported versions, conflicting options)
//! and, where one exists, a suggested fix.

use std::fmt::{self, Write as _};
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no platform could be detected.
    pub const NO_PLATFORM: &str =
        "Pass `--platform <name>` together with `--platform-version <version>`";

    /// Suggestion when an unknown platform name was given.
    pub const LIST_PLATFORMS: &str = "Run `rigging platforms` to see the supported platforms";

    /// Suggestion when the generated script failed.
    pub const SCRIPT_FAILED: &str = "Re-run with `--verbose` or inspect the script with `rigging script`";

    /// Suggestion when the generated script timed out.
    pub const SCRIPT_TIMEOUT: &str = "Increase the limit with `--timeout <seconds>`";
}

/// A message for the user: what went wrong, what it concerned, and what
/// to try next.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub message: String,
    /// Lines shown under the message, e.g. the supported versions.
    pub context: Vec<String>,
    /// Numbered fixes.
    pub suggestions: Vec<String>,
    /// File the message is about.
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Render for a terminal, with ANSI colors when `color` is set.
    pub fn format(&self, color: bool) -> String {
        let paint = |code: &str, text: &str| {
            if color {
                format!("{}{}\x1b[0m", code, text)
            } else {
                text.to_string()
            }
        };

        let mut out = String::new();
        let _ = writeln!(out, "{}: {}", paint("\x1b[1;31m", "error"), self.message);
        if let Some(path) = &self.location {
            let _ = writeln!(out, "  --> {}", path.display());
        }
        for line in &self.context {
            let _ = writeln!(out, "  = {}", line);
        }
        if !self.suggestions.is_empty() {
            let _ = writeln!(out, "\n{}: consider:", paint("\x1b[1;32m", "help"));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                let _ = writeln!(out, "  {}. {}", i + 1, suggestion);
            }
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("version `9.9` is not supported for platform `python`")
            .with_context("supported versions: 3.6.1, 3.7.2")
            .with_suggestion("Use one of the supported versions");

        let output = diag.format(false);
        assert!(output.contains("error: version `9.9`"));
        assert!(output.contains("supported versions: 3.6.1, 3.7.2"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Use one of the supported versions"));
    }

    #[test]
    fn test_diagnostic_location() {
        let diag = Diagnostic::error("failed to write build manifest").with_location("out/rigging-manifest.toml");
        let output = diag.format(false);
        assert!(output.starts_with("error: "));
        assert!(output.contains("--> out/rigging-manifest.toml"));
    }
}
