//! `rigging build` command

use std::time::Instant;

use anyhow::Result;

use super::{generator_options, no_platform_detected, report_detected};
use crate::cli::BuildArgs;
use rigging::core::error::exit_codes;
use rigging::core::repository::LocalSourceRepo;
use rigging::ops::{build, BuildOutcome};
use rigging::platforms::PlatformRegistry;
use rigging::util::shell::{Shell, Status};

pub fn execute(args: BuildArgs, shell: &Shell) -> Result<i32> {
    let options = generator_options(&args.generator)?;
    let registry = PlatformRegistry::with_defaults(&options);
    let repo = LocalSourceRepo::new(&options.source_dir);

    shell.status(Status::Building, options.source_dir.display());
    let start = Instant::now();

    match build(&repo, &options, &registry, |line| shell.script_output(&line))? {
        BuildOutcome::NoPlatformDetected => Ok(no_platform_detected(&options.source_dir, shell)),
        BuildOutcome::Built {
            platforms,
            manifest_path,
        } => {
            report_detected(&platforms, shell);
            shell.status(Status::Wrote, manifest_path.display());
            shell.finished("build", start.elapsed());
            Ok(exit_codes::SUCCESS)
        }
    }
}
