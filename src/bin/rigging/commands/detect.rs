//! `rigging detect` command

use anyhow::Result;
use serde::Serialize;

use super::{generator_options, no_platform_detected};
use crate::cli::DetectArgs;
use rigging::core::error::exit_codes;
use rigging::core::repository::{LocalSourceRepo, RepositoryContext};
use rigging::ops::{collect_exclusions, detect_and_resolve, DetectionReport, Exclusions};
use rigging::platforms::PlatformRegistry;
use rigging::util::shell::Shell;

#[derive(Serialize)]
struct DetectOutput<'a> {
    platforms: Vec<DetectionReport<'a>>,
    exclusions: Exclusions,
}

pub fn execute(args: DetectArgs, shell: &Shell) -> Result<i32> {
    let options = generator_options(&args.generator)?;
    let registry = PlatformRegistry::with_defaults(&options);
    let repo = LocalSourceRepo::new(&options.source_dir);
    let ctx = RepositoryContext::new(&repo, &options);

    let platforms = detect_and_resolve(&registry, &ctx)?;
    if platforms.is_empty() {
        return Ok(no_platform_detected(&options.source_dir, shell));
    }
    let exclusions = collect_exclusions(&ctx, &platforms);

    if args.json {
        let output = DetectOutput {
            platforms: platforms.iter().map(DetectionReport::from).collect(),
            exclusions,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(exit_codes::SUCCESS);
    }

    for p in &platforms {
        println!("{} {}", p.name(), p.version());
        if shell.is_verbose() {
            for (key, value) in &p.result.properties {
                println!("    {} = {}", key, value);
            }
        }
    }
    if shell.is_verbose() && !exclusions.is_empty() {
        println!();
        if !exclusions.build_output.is_empty() {
            println!("excluded from build output: {}", exclusions.build_output.join(", "));
        }
        if !exclusions.intermediate.is_empty() {
            println!("excluded from intermediate: {}", exclusions.intermediate.join(", "));
        }
    }

    Ok(exit_codes::SUCCESS)
}
