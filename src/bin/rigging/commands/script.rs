//! `rigging script` command

use anyhow::Result;

use super::{generator_options, no_platform_detected};
use crate::cli::ScriptArgs;
use rigging::core::error::exit_codes;
use rigging::core::repository::LocalSourceRepo;
use rigging::ops::plan_build;
use rigging::platforms::PlatformRegistry;
use rigging::util::shell::Shell;

pub fn execute(args: ScriptArgs, shell: &Shell) -> Result<i32> {
    let options = generator_options(&args.generator)?;
    let registry = PlatformRegistry::with_defaults(&options);
    let repo = LocalSourceRepo::new(&options.source_dir);

    let Some(plan) = plan_build(&repo, &options, &registry)? else {
        return Ok(no_platform_detected(&options.source_dir, shell));
    };

    print!("{}", plan.script.script);
    Ok(exit_codes::SUCCESS)
}
