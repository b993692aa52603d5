//! Error taxonomy for detection, resolution, assembly and execution.

use std::path::PathBuf;
use std::time::Duration;

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Process exit codes used by the CLI.
pub mod exit_codes {
    /// Everything succeeded.
    pub const SUCCESS: i32 = 0;
    /// Usage, resolution, assembly or I/O failure inside rigging itself.
    pub const FAILURE: i32 = 1;
    /// The source tree matched no platform.
    pub const NO_PLATFORM_DETECTED: i32 = 3;
    /// The generated script exceeded its time limit.
    pub const TIMEOUT: i32 = 124;
}

/// Errors raised by the rigging pipeline.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum RiggingError {
    /// An explicitly requested platform is not registered.
    #[error("platform `{name}` is not supported")]
    #[diagnostic(code(rigging::usage::unsupported_platform))]
    UnsupportedPlatform { name: String, available: Vec<String> },

    /// User misconfiguration, e.g. mutually exclusive options.
    #[error("{message}")]
    #[diagnostic(code(rigging::usage::invalid))]
    InvalidUsage { message: String },

    /// No catalog entry satisfies the requested version.
    #[error("version `{requested}` is not supported for platform `{platform}`")]
    #[diagnostic(
        code(rigging::version::unsupported),
        help("pick one of the supported versions")
    )]
    UnsupportedVersion {
        platform: String,
        requested: String,
        supported: Vec<String>,
    },

    /// A platform plugin failed while inspecting the repository.
    #[error("platform `{platform}` failed during detection")]
    #[diagnostic(code(rigging::detect::failed))]
    DetectionFailed {
        platform: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Two platforms emitted the same manifest key.
    #[error("manifest key `{key}` emitted by both `{first}` and `{second}`")]
    #[diagnostic(code(rigging::assemble::key_collision))]
    ManifestKeyCollision {
        key: String,
        first: String,
        second: String,
    },

    /// The build manifest could not be persisted.
    #[error("failed to write build manifest to {}", path.display())]
    #[diagnostic(code(rigging::manifest::write))]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generated script exited unsuccessfully.
    #[error("generated script exited with code {code}")]
    #[diagnostic(code(rigging::exec::failed))]
    ScriptFailed { code: i32 },

    /// The generated script was killed by a signal.
    #[error("generated script was terminated by a signal")]
    #[diagnostic(code(rigging::exec::terminated))]
    ScriptTerminated,

    /// The generated script exceeded its time limit and was killed.
    #[error("generated script did not finish within {}s", timeout.as_secs())]
    #[diagnostic(code(rigging::exec::timeout))]
    ScriptTimeout { timeout: Duration },
}

impl RiggingError {
    /// Shorthand for an [`RiggingError::InvalidUsage`] error.
    pub fn usage(message: impl Into<String>) -> Self {
        RiggingError::InvalidUsage {
            message: message.into(),
        }
    }

    /// Exit code the CLI reports for this error.
    ///
    /// A failed script's own code is passed through, except the codes rigging
    /// reserves for "no platform detected" and timeouts, which become 1.
    pub fn exit_code(&self) -> i32 {
        match self {
            RiggingError::ScriptFailed { code } => match *code {
                exit_codes::NO_PLATFORM_DETECTED | exit_codes::TIMEOUT => exit_codes::FAILURE,
                code => code,
            },
            RiggingError::ScriptTimeout { .. } => exit_codes::TIMEOUT,
            _ => exit_codes::FAILURE,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            RiggingError::UnsupportedPlatform { name, available } => {
                let mut diag = Diagnostic::error(format!("platform `{}` is not supported", name));
                if !available.is_empty() {
                    diag = diag.with_context(format!("available platforms: {}", available.join(", ")));
                }
                diag.with_suggestion(suggestions::LIST_PLATFORMS)
            }

            RiggingError::InvalidUsage { message } => Diagnostic::error(message.clone()),

            RiggingError::UnsupportedVersion {
                platform,
                requested,
                supported,
            } => {
                let mut diag = Diagnostic::error(format!(
                    "version `{}` is not supported for platform `{}`",
                    requested, platform
                ));
                if supported.is_empty() {
                    diag = diag.with_context("no versions are available for this platform");
                } else {
                    diag = diag.with_context(format!("supported versions: {}", supported.join(", ")));
                }
                diag.with_suggestion(format!(
                    "Request one of the supported versions with `--platform {} --platform-version <version>`",
                    platform
                ))
            }

            RiggingError::DetectionFailed { platform, source } => {
                Diagnostic::error(format!("platform `{}` failed during detection", platform))
                    .with_context(source.to_string())
            }

            RiggingError::ManifestKeyCollision { key, first, second } => Diagnostic::error(format!(
                "manifest key `{}` was emitted by more than one platform",
                key
            ))
            .with_context(format!("first emitted by `{}`, again by `{}`", first, second)),

            RiggingError::ManifestWrite { path, source } => {
                Diagnostic::error("failed to write build manifest")
                    .with_location(path.clone())
                    .with_context(source.to_string())
            }

            RiggingError::ScriptFailed { code } => {
                Diagnostic::error(format!("generated script exited with code {}", code))
                    .with_suggestion(suggestions::SCRIPT_FAILED)
            }

            RiggingError::ScriptTerminated => Diagnostic::error("generated script was terminated by a signal")
                .with_suggestion(suggestions::SCRIPT_FAILED),

            RiggingError::ScriptTimeout { timeout } => Diagnostic::error(format!(
                "generated script did not finish within {}s and was killed",
                timeout.as_secs()
            ))
            .with_suggestion(suggestions::SCRIPT_TIMEOUT),
        }
    }
}
