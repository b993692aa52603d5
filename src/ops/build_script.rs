//! Build script assembly.
//!
//! Every selected platform contributes one snippet; the snippets are
//! concatenated in detection order under a banner per platform and wrapped
//! in a fail-fast script. The manifest properties of all snippets are
//! merged alongside.

use anyhow::Result;

use crate::core::manifest::{keys, BuildManifest, PIPELINE_OWNER};
use crate::core::repository::RepositoryContext;
use crate::ops::detect::DetectedPlatform;
use crate::ops::install_script::{get_installation_script_snippet, required_tools, shell_line};
use crate::util::script::{quote, ScriptBuilder};

/// A generated build script and the manifest that goes with it.
#[derive(Debug, Clone)]
pub struct BuildScript {
    pub script: String,
    pub manifest: BuildManifest,
}

/// Whether install snippets are folded into the build script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallMode {
    /// Build steps only.
    Skip,
    /// Prepend install snippets for missing platform versions.
    Include,
}

/// Assemble the build script for resolved platforms.
///
/// Fails without producing any script when a platform rejects its
/// configuration or two platforms emit the same manifest key.
pub fn generate_build_script(
    ctx: &RepositoryContext<'_>,
    detected: &[DetectedPlatform],
    install: InstallMode,
) -> Result<BuildScript> {
    let mut manifest = BuildManifest::new();
    let mut sections = Vec::with_capacity(detected.len());

    for d in detected {
        tracing::debug!("generating build snippet for {} {}", d.name(), d.version());
        let snippet = d.platform.generate_build_script_snippet(ctx, &d.result)?;
        manifest.merge(d.name(), &snippet.manifest_properties)?;
        sections.push((d.name(), d.version(), snippet.script));
    }

    // Pipeline keys
    let platforms: Vec<&str> = detected.iter().map(|d| d.name()).collect();
    manifest.insert(PIPELINE_OWNER, keys::PLATFORMS, platforms.join(","))?;

    let tools = required_tools(detected);
    if !tools.is_empty() {
        let pairs: Vec<String> = tools.iter().map(|(tool, version)| format!("{}={}", tool, version)).collect();
        manifest.insert(PIPELINE_OWNER, keys::REQUIRED_TOOLS, pairs.join(","))?;
    }
    manifest.insert(PIPELINE_OWNER, keys::RIGGING_VERSION, env!("CARGO_PKG_VERSION"))?;

    let install_snippet = match install {
        InstallMode::Include => get_installation_script_snippet(ctx, detected)?,
        InstallMode::Skip => None,
    };

    let build_root = ctx.options.intermediate_dir.as_deref().unwrap_or(ctx.repo.root());
    let shell = shell_line(ctx);
    let mut script = ScriptBuilder::new(&shell);
    script
        .line(format!("SOURCE_DIR={}", quote(&build_root.display().to_string())))
        .line("cd \"$SOURCE_DIR\"")
        .blank();

    if let Some(install_snippet) = install_snippet {
        script.banner("install").snippet(&install_snippet).blank();
    }

    for (name, version, body) in &sections {
        script
            .banner(name)
            .echo(&format!("Building {} {}...", name, version))
            .snippet(body)
            .blank();
    }
    script.echo("Done.");

    Ok(BuildScript {
        script: script.build(),
        manifest,
    })
}
