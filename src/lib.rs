//! Rigging - detects the runtime platforms of a source tree and generates
//! the shell script that installs and builds them.
//!
//! The pipeline runs in four steps:
//!
//! 1. every registered [`Platform`] inspects the repository
//!    ([`ops::detect_platforms`]);
//! 2. each detected version is resolved against the platform's catalog
//!    ([`resolver::resolve_platform_version`]);
//! 3. the selected platforms' snippets are assembled into one fail-fast
//!    script ([`ops::generate_build_script`]);
//! 4. after a successful run the merged [`BuildManifest`] is persisted for
//!    the run-time stage.

pub mod core;
pub mod ops;
pub mod platforms;
pub mod resolver;
pub mod util;

/// Test utilities for rigging unit tests.
///
/// This module is only available when compiling with `--cfg test`. It
/// provides a scriptable platform and in-memory repositories.
#[cfg(test)]
pub mod test_support;

pub use core::{
    BuildManifest, DetectionResult, GeneratorOptions, LocalSourceRepo, Platform, RepositoryContext, RiggingError,
    SourceRepo,
};
pub use platforms::PlatformRegistry;
