//! High-level operations.
//!
//! This module contains the detection pipeline, script assembly and the
//! implementation of rigging commands.

pub mod build_script;
pub mod detect;
pub mod exclusions;
pub mod install_script;
pub mod rigging_build;
pub mod rigging_setup;
pub mod run_script;

pub use build_script::{generate_build_script, BuildScript, InstallMode};
pub use detect::{detect_and_resolve, detect_platforms, resolve_versions, DetectedPlatform, DetectionReport};
pub use exclusions::{collect_exclusions, Exclusions};
pub use install_script::{generate_installation_script, get_installation_script_snippet, required_tools};
pub use rigging_build::{build, plan_build, BuildOutcome, BuildPlan};
pub use rigging_setup::{setup, SetupOptions, SetupOutcome};
pub use run_script::{resolve_shell, run_script};
