//! Installation snippets for platform versions missing from the host.

use std::collections::{BTreeMap, HashSet};

use anyhow::{Context, Result};

use crate::core::repository::RepositoryContext;
use crate::ops::detect::DetectedPlatform;
use crate::util::script::{ScriptBuilder, DEFAULT_SHELL};

/// Banner printed before installing.
pub const SETUP_START_BANNER: &str = "Setting up environment...";
/// Banner printed after installing.
pub const SETUP_DONE_BANNER: &str = "Done setting up environment.";

/// Concatenated install snippets for every detected platform whose version
/// is not installed yet.
///
/// `None` when dynamic install is disabled or nothing needs installing.
/// Each `(platform, version)` pair contributes at most one snippet.
pub fn get_installation_script_snippet(
    ctx: &RepositoryContext<'_>,
    detected: &[DetectedPlatform],
) -> Result<Option<String>> {
    if !ctx.options.enable_dynamic_install {
        tracing::debug!("dynamic install not enabled");
        return Ok(None);
    }

    let mut seen: HashSet<(String, String)> = HashSet::new();
    let mut snippet = String::new();

    for d in detected {
        let name = d.name();
        let version = d.version();

        if d.platform.is_version_already_installed(version) {
            tracing::debug!("{} version {} is already installed, skipping", name, version);
            continue;
        }
        if !seen.insert((name.to_string(), version.to_string())) {
            continue;
        }

        tracing::debug!("{} version {} is not installed, generating install snippet", name, version);
        let Some(install) = d
            .platform
            .generate_installer_snippet(ctx, &d.result)
            .with_context(|| format!("failed to generate install snippet for {} {}", name, version))?
        else {
            continue;
        };

        snippet.push_str(&format!("# rigging:install {} {}\n", name, version));
        snippet.push_str(install.trim_end_matches('\n'));
        snippet.push('\n');
    }

    if snippet.is_empty() {
        Ok(None)
    } else {
        Ok(Some(snippet))
    }
}

/// A standalone install script wrapping the install snippets, with
/// setup banners. `None` when nothing needs installing.
pub fn generate_installation_script(
    ctx: &RepositoryContext<'_>,
    detected: &[DetectedPlatform],
) -> Result<Option<String>> {
    let Some(snippet) = get_installation_script_snippet(ctx, detected)? else {
        return Ok(None);
    };

    let shell = shell_line(ctx);
    let mut script = ScriptBuilder::new(&shell);
    script
        .echo(SETUP_START_BANNER)
        .blank()
        .snippet(&snippet)
        .blank()
        .echo(SETUP_DONE_BANNER);
    Ok(Some(script.build()))
}

/// Tool name to version for every detected platform.
pub fn required_tools(detected: &[DetectedPlatform]) -> BTreeMap<String, String> {
    let mut tools = BTreeMap::new();
    for d in detected {
        d.platform.set_required_tools(&d.result, &mut tools);
    }
    tools
}

/// Interpreter for the shebang line.
pub(crate) fn shell_line(ctx: &RepositoryContext<'_>) -> String {
    ctx.options
        .shell_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::detect::detect_and_resolve;
    use crate::test_support::{registry_of, repo_with, test_options, tools, TestPlatform};
    use std::sync::Arc;

    #[test]
    fn test_disabled_dynamic_install() {
        let repo = repo_with(&[]);
        let opts = test_options();
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![Arc::new(TestPlatform::new("a"))]);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();
        assert_eq!(get_installation_script_snippet(&ctx, &detected).unwrap(), None);
    }

    #[test]
    fn test_installed_platform_is_skipped() {
        let repo = repo_with(&[]);
        let mut opts = test_options();
        opts.enable_dynamic_install = true;
        opts.enable_multi_platform_build = true;
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![
            Arc::new(
                TestPlatform::new("a")
                    .installed("1.0.0")
                    .with_build_script("build-a")
                    .with_install_script("install-a"),
            ),
            Arc::new(
                TestPlatform::new("b")
                    .with_build_script("build-b")
                    .with_install_script("install-b"),
            ),
        ]);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();

        let snippet = get_installation_script_snippet(&ctx, &detected).unwrap().unwrap();
        assert!(snippet.contains("install-b"));
        assert!(!snippet.contains("build-b"));
        assert!(!snippet.contains("install-a"));
        assert!(!snippet.contains("build-a"));
    }

    #[test]
    fn test_each_missing_platform_installed_once() {
        let repo = repo_with(&[]);
        let mut opts = test_options();
        opts.enable_dynamic_install = true;
        opts.enable_multi_platform_build = true;
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![
            Arc::new(TestPlatform::new("a").with_build_script("build-a").with_install_script("install-a")),
            Arc::new(TestPlatform::new("b").with_build_script("build-b").with_install_script("install-b")),
        ]);
        let mut detected = detect_and_resolve(&registry, &ctx).unwrap();
        // Same platform and version twice still installs once.
        detected.push(detected[0].clone());

        let snippet = get_installation_script_snippet(&ctx, &detected).unwrap().unwrap();
        assert_eq!(snippet.matches("install-a").count(), 1);
        assert_eq!(snippet.matches("install-b").count(), 1);
        assert!(!snippet.contains("build-a"));
        assert!(!snippet.contains("build-b"));
        assert!(snippet.contains("# rigging:install a 1.0.0\n"));
    }

    #[test]
    fn test_all_installed_yields_none() {
        let repo = repo_with(&[]);
        let mut opts = test_options();
        opts.enable_dynamic_install = true;
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![Arc::new(TestPlatform::new("a").installed("1.0.0"))]);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();
        assert_eq!(generate_installation_script(&ctx, &detected).unwrap(), None);
    }

    #[test]
    fn test_standalone_script_banners() {
        let repo = repo_with(&[]);
        let mut opts = test_options();
        opts.enable_dynamic_install = true;
        opts.shell_path = Some("/usr/local/bin/bash".into());
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![Arc::new(TestPlatform::new("a").with_install_script("install-a"))]);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();
        let script = generate_installation_script(&ctx, &detected).unwrap().unwrap();

        assert!(script.starts_with("#!/usr/local/bin/bash\nset -e\n"));
        let start = script.find(SETUP_START_BANNER).unwrap();
        let body = script.find("install-a").unwrap();
        let done = script.find(SETUP_DONE_BANNER).unwrap();
        assert!(start < body && body < done);
    }

    #[test]
    fn test_required_tools() {
        let repo = repo_with(&[]);
        let mut opts = test_options();
        opts.enable_multi_platform_build = true;
        let ctx = RepositoryContext::new(&repo, &opts);

        let registry = registry_of(vec![
            Arc::new(TestPlatform::new("a").detecting_version("2").with_versions("1", &["1.0.0", "2.1.0"])),
            Arc::new(TestPlatform::new("b")),
        ]);
        let detected = detect_and_resolve(&registry, &ctx).unwrap();
        assert_eq!(required_tools(&detected), tools(&[("a", "2.1.0"), ("b", "1.0.0")]));
    }
}
