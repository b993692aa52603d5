//! Command implementations

pub mod build;
pub mod completions;
pub mod detect;
pub mod platforms;
pub mod script;
pub mod setup;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::cli::GeneratorArgs;
use rigging::core::error::exit_codes;
use rigging::core::options::GeneratorOptions;
use rigging::ops::DetectedPlatform;
use rigging::platforms::BUILTIN_PLATFORMS;
use rigging::util::config::{build_options, global_config_path, CliOverrides, EnvSource};
use rigging::util::diagnostic::{emit, suggestions, Diagnostic};
use rigging::util::shell::{Shell, Status};

/// Layer config files, environment and flags into generator options.
pub fn generator_options(args: &GeneratorArgs) -> Result<GeneratorOptions> {
    let source_dir = args
        .source_dir
        .canonicalize()
        .with_context(|| format!("source directory not found: {}", args.source_dir.display()))?;

    let cli = CliOverrides {
        platform_name: args.platform.clone(),
        platform_version: args.platform_version.clone(),
        output_dir: args.output.clone(),
        intermediate_dir: args.intermediate.clone(),
        enable_dynamic_install: args.dynamic_install,
        enable_multi_platform_build: args.multi_platform,
        shell: args.shell.clone(),
        timeout: args.timeout.map(Duration::from_secs),
        properties: args.properties.clone(),
    };

    let global = global_config_path();
    let options = build_options(
        &source_dir,
        global.as_deref(),
        &EnvSource::from_process(),
        &cli,
        BUILTIN_PLATFORMS,
    )?;
    Ok(options)
}

/// Report that nothing was detected and return the matching exit code.
pub fn no_platform_detected(source_dir: &Path, shell: &Shell) -> i32 {
    let diag = Diagnostic::error(format!("could not detect any platform in {}", source_dir.display()))
        .with_suggestion(suggestions::NO_PLATFORM)
        .with_suggestion(suggestions::LIST_PLATFORMS);
    emit(&diag, shell.use_color());
    exit_codes::NO_PLATFORM_DETECTED
}

pub fn report_detected(platforms: &[DetectedPlatform], shell: &Shell) {
    for p in platforms {
        shell.status(Status::Detected, format!("{} {}", p.name(), p.version()));
    }
}
