//! `rigging setup` command

use std::time::Instant;

use anyhow::Result;

use super::{generator_options, no_platform_detected, report_detected};
use crate::cli::SetupArgs;
use rigging::core::error::exit_codes;
use rigging::core::repository::LocalSourceRepo;
use rigging::ops::{setup, SetupOptions, SetupOutcome};
use rigging::platforms::PlatformRegistry;
use rigging::util::shell::{Shell, Status};

pub fn execute(args: SetupArgs, shell: &Shell) -> Result<i32> {
    let options = generator_options(&args.generator)?;
    let registry = PlatformRegistry::with_defaults(&options);
    let repo = LocalSourceRepo::new(&options.source_dir);
    let opts = SetupOptions { print_only: args.print };

    shell.status(Status::Detecting, options.source_dir.display());
    let start = Instant::now();
    let outcome = setup(&repo, &options, &registry, &opts, |line| shell.script_output(&line))?;

    match outcome {
        SetupOutcome::NoPlatformDetected => Ok(no_platform_detected(&options.source_dir, shell)),
        SetupOutcome::UpToDate { platforms } => {
            report_detected(&platforms, shell);
            shell.status(Status::Skipped, "all platform versions are already installed");
            Ok(exit_codes::SUCCESS)
        }
        SetupOutcome::Printed { script, .. } => {
            print!("{}", script);
            Ok(exit_codes::SUCCESS)
        }
        SetupOutcome::Installed { platforms } => {
            report_detected(&platforms, shell);
            shell.finished("setup", start.elapsed());
            Ok(exit_codes::SUCCESS)
        }
    }
}
