//! `rigging platforms` command

use anyhow::Result;

use rigging::core::error::exit_codes;
use rigging::platforms::{PlatformRegistry, BUILTIN_PLATFORMS};
use rigging::util::config::{build_options, global_config_path, CliOverrides, EnvSource};
use rigging::util::shell::Shell;

pub fn execute(shell: &Shell) -> Result<i32> {
    let cwd = std::env::current_dir()?;
    let global = global_config_path();
    // Install roots from config and environment add installed versions
    let options = build_options(
        &cwd,
        global.as_deref(),
        &EnvSource::from_process(),
        &CliOverrides::default(),
        BUILTIN_PLATFORMS,
    )?;
    let registry = PlatformRegistry::with_defaults(&options);

    for platform in registry.iter() {
        println!("{} (default {})", platform.name(), platform.default_version());
        if shell.is_quiet() {
            continue;
        }
        let versions = platform.supported_versions();
        if versions.is_empty() {
            println!("    versions: (none)");
        } else {
            println!("    versions: {}", versions.join(", "));
        }
    }

    Ok(exit_codes::SUCCESS)
}
