//! Implementation of `rigging build` and `rigging script`.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::options::GeneratorOptions;
use crate::core::repository::{RepositoryContext, SourceRepo};
use crate::ops::build_script::{generate_build_script, BuildScript, InstallMode};
use crate::ops::detect::{detect_and_resolve, DetectedPlatform};
use crate::ops::exclusions::{collect_exclusions, Exclusions};
use crate::ops::run_script::run_script;
use crate::platforms::PlatformRegistry;
use crate::util::fs::copy_source_tree;
use crate::util::process::OutputLine;

/// Detected platforms and the full script that builds them.
#[derive(Debug)]
pub struct BuildPlan {
    pub platforms: Vec<DetectedPlatform>,
    pub script: BuildScript,
    pub exclusions: Exclusions,
}

/// What `build` did.
#[derive(Debug)]
pub enum BuildOutcome {
    /// The source tree matched no platform.
    NoPlatformDetected,
    /// The script ran and the manifest was written.
    Built {
        platforms: Vec<DetectedPlatform>,
        manifest_path: PathBuf,
    },
}

/// Detect, resolve and assemble the full build script, install snippets
/// included. `None` when nothing was detected.
pub fn plan_build(
    repo: &dyn SourceRepo,
    options: &GeneratorOptions,
    registry: &PlatformRegistry,
) -> Result<Option<BuildPlan>> {
    let ctx = RepositoryContext::new(repo, options);

    let platforms = detect_and_resolve(registry, &ctx)?;
    if platforms.is_empty() {
        return Ok(None);
    }

    let script = generate_build_script(&ctx, &platforms, InstallMode::Include)?;
    let exclusions = collect_exclusions(&ctx, &platforms);
    Ok(Some(BuildPlan {
        platforms,
        script,
        exclusions,
    }))
}

/// Build the source tree and record the manifest.
///
/// With an intermediate directory configured, the source is first copied
/// there, minus the platforms' intermediate exclusions, and built in place.
/// The manifest is only written once the script has exited successfully.
pub fn build<F>(
    repo: &dyn SourceRepo,
    options: &GeneratorOptions,
    registry: &PlatformRegistry,
    on_line: F,
) -> Result<BuildOutcome>
where
    F: FnMut(OutputLine),
{
    let Some(plan) = plan_build(repo, options, registry)? else {
        return Ok(BuildOutcome::NoPlatformDetected);
    };

    if let Some(dir) = &options.intermediate_dir {
        let copied = copy_source_tree(repo.root(), dir, &plan.exclusions.intermediate)?;
        tracing::info!("copied {} files to {}", copied, dir.display());
    }

    run_script(&plan.script.script, options, on_line)?;

    let manifest_path = plan.script.manifest.write(options.manifest_dir())?;

    Ok(BuildOutcome::Built {
        platforms: plan.platforms,
        manifest_path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::RiggingError;
    use crate::core::manifest::{BuildManifest, MANIFEST_FILE_NAME};
    use crate::core::repository::LocalSourceRepo;
    use crate::test_support::{registry_of, TestPlatform};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn options_for(dir: &TempDir) -> GeneratorOptions {
        let mut options = GeneratorOptions::new(dir.path());
        options.shell_path = Some(PathBuf::from("sh"));
        options
    }

    #[test]
    fn test_plan_nothing_detected() {
        let tmp = TempDir::new().unwrap();
        let repo = LocalSourceRepo::new(tmp.path());
        let registry = registry_of(vec![Arc::new(TestPlatform::new("a").not_detecting())]);
        assert!(plan_build(&repo, &options_for(&tmp), &registry).unwrap().is_none());
    }

    #[test]
    fn test_build_writes_manifest_after_success() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let repo = LocalSourceRepo::new(src.path());
        let mut options = options_for(&src);
        options.output_dir = Some(out.path().join("nested"));

        let registry = registry_of(vec![Arc::new(
            TestPlatform::new("a")
                .with_build_script("echo built > build.log")
                .with_manifest_property("a_mode", "fast"),
        )]);

        let outcome = build(&repo, &options, &registry, |_| {}).unwrap();
        let manifest_path = match outcome {
            BuildOutcome::Built { manifest_path, .. } => manifest_path,
            other => panic!("unexpected outcome: {:?}", other),
        };

        assert_eq!(manifest_path, out.path().join("nested").join(MANIFEST_FILE_NAME));
        assert!(src.path().join("build.log").exists());

        let manifest = BuildManifest::load(&manifest_path).unwrap();
        assert_eq!(manifest.get("a_mode"), Some("fast"));
        assert_eq!(manifest.get("a_version"), Some("1.0.0"));
        assert_eq!(manifest.get("platforms"), Some("a"));
    }

    #[test]
    fn test_build_in_intermediate_copy() {
        let src = TempDir::new().unwrap();
        std::fs::write(src.path().join("input.txt"), "hello").unwrap();
        std::fs::create_dir_all(src.path().join("a_cache")).unwrap();
        std::fs::write(src.path().join("a_cache").join("stale"), "").unwrap();
        let work = TempDir::new().unwrap();
        let intermediate = work.path().join("copy");

        let repo = LocalSourceRepo::new(src.path());
        let mut options = options_for(&src);
        options.intermediate_dir = Some(intermediate.clone());

        let registry = registry_of(vec![Arc::new(TestPlatform::new("a").with_build_script("cat input.txt > built.txt"))]);

        build(&repo, &options, &registry, |_| {}).unwrap();

        assert_eq!(std::fs::read_to_string(intermediate.join("built.txt")).unwrap(), "hello");
        assert!(!intermediate.join("a_cache").exists());
        assert!(!src.path().join("built.txt").exists());
        assert!(src.path().join(MANIFEST_FILE_NAME).exists());
    }

    #[test]
    fn test_failed_build_writes_no_manifest() {
        let tmp = TempDir::new().unwrap();
        let repo = LocalSourceRepo::new(tmp.path());
        let registry = registry_of(vec![Arc::new(TestPlatform::new("a").with_build_script("exit 3"))]);

        let err = build(&repo, &options_for(&tmp), &registry, |_| {}).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RiggingError>(),
            Some(RiggingError::ScriptFailed { code: 3 })
        ));
        assert!(!tmp.path().join(MANIFEST_FILE_NAME).exists());
    }
}
