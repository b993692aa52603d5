//! Implementation of `rigging setup`.

use anyhow::Result;

use crate::core::options::GeneratorOptions;
use crate::core::repository::{RepositoryContext, SourceRepo};
use crate::ops::detect::{detect_and_resolve, DetectedPlatform};
use crate::ops::install_script::generate_installation_script;
use crate::ops::run_script::run_script;
use crate::platforms::PlatformRegistry;
use crate::util::process::OutputLine;

/// Options for the setup command.
#[derive(Debug, Clone, Default)]
pub struct SetupOptions {
    /// Return the install script instead of running it.
    pub print_only: bool,
}

/// What `setup` did.
#[derive(Debug)]
pub enum SetupOutcome {
    /// The source tree matched no platform.
    NoPlatformDetected,
    /// Every detected platform version is already installed.
    UpToDate { platforms: Vec<DetectedPlatform> },
    /// The install script, not run.
    Printed {
        platforms: Vec<DetectedPlatform>,
        script: String,
    },
    /// The install script ran successfully.
    Installed { platforms: Vec<DetectedPlatform> },
}

/// Detect the platforms of `repo` and install whatever versions are
/// missing.
///
/// Dynamic install is always on for setup, whatever `options` says.
pub fn setup<F>(
    repo: &dyn SourceRepo,
    options: &GeneratorOptions,
    registry: &PlatformRegistry,
    opts: &SetupOptions,
    on_line: F,
) -> Result<SetupOutcome>
where
    F: FnMut(OutputLine),
{
    let mut options = options.clone();
    options.enable_dynamic_install = true;
    // Installs don't touch the source, so there is nothing to copy
    options.intermediate_dir = None;
    let ctx = RepositoryContext::new(repo, &options);

    let platforms = detect_and_resolve(registry, &ctx)?;
    if platforms.is_empty() {
        return Ok(SetupOutcome::NoPlatformDetected);
    }

    let Some(script) = generate_installation_script(&ctx, &platforms)? else {
        return Ok(SetupOutcome::UpToDate { platforms });
    };

    if opts.print_only {
        return Ok(SetupOutcome::Printed { platforms, script });
    }

    run_script(&script, &options, on_line)?;
    Ok(SetupOutcome::Installed { platforms })
}
