//! Node.js platform.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::options::GeneratorOptions;
use crate::core::platform::{BuildScriptSnippet, DetectionResult, ManifestProperties, Platform};
use crate::core::repository::RepositoryContext;
use crate::platforms::catalog::VersionCatalog;
use crate::platforms::{explicit_detection, installer};

pub const NAME: &str = "node";
pub const DEFAULT_VERSION: &str = "12.16.1";

const DOWNLOADABLE_VERSIONS: &[&str] = &["10.23.0", "12.16.1", "12.19.0", "14.15.1"];

const PACKAGE_JSON: &str = "package.json";
const YARN_LOCK: &str = "yarn.lock";
const MARKER_FILES: &[&str] = &[PACKAGE_JSON, "server.js", "app.js"];

/// Detection properties.
pub mod properties {
    /// `npm` or `yarn`.
    pub const PACKAGE_MANAGER: &str = "package_manager";
    /// Present when `package.json` declares a `build` script.
    pub const BUILD_SCRIPT: &str = "build_script";
}

/// Manifest keys written by this platform.
pub mod manifest_keys {
    pub const NODE_VERSION: &str = "node_version";
    pub const PACKAGE_MANAGER: &str = "node_package_manager";
}

/// The parts of `package.json` detection cares about.
#[derive(Debug, Default, Deserialize)]
struct PackageJson {
    #[serde(default)]
    engines: Option<Engines>,
    #[serde(default)]
    scripts: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct Engines {
    #[serde(default)]
    node: Option<String>,
}

/// The Node.js platform.
#[derive(Debug)]
pub struct NodePlatform {
    install_root: PathBuf,
    catalog: VersionCatalog,
}

impl NodePlatform {
    pub fn new(options: &GeneratorOptions) -> Self {
        let install_root = options.platform_install_dir(NAME);
        NodePlatform {
            catalog: VersionCatalog::with_install_dir(&install_root, DOWNLOADABLE_VERSIONS),
            install_root,
        }
    }
}

impl Platform for NodePlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn default_version(&self) -> &str {
        DEFAULT_VERSION
    }

    fn supported_versions(&self) -> &[String] {
        self.catalog.versions()
    }

    fn detect(&self, ctx: &RepositoryContext<'_>) -> Result<Option<DetectionResult>> {
        let repo = ctx.repo;
        let explicit = explicit_detection(ctx, NAME);
        if explicit.is_none() && !MARKER_FILES.iter().any(|f| repo.file_exists(f)) {
            tracing::debug!("no node files found");
            return Ok(None);
        }

        let package = if repo.file_exists(PACKAGE_JSON) {
            let content = repo.read_to_string(PACKAGE_JSON)?;
            serde_json::from_str::<PackageJson>(&content)
                .with_context(|| format!("failed to parse {}", PACKAGE_JSON))?
        } else {
            PackageJson::default()
        };

        let manager = if repo.file_exists(YARN_LOCK) { "yarn" } else { "npm" };
        let mut result = match explicit {
            Some(result) => result,
            None => {
                let version = package
                    .engines
                    .and_then(|e| e.node)
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty());
                DetectionResult::new(NAME).with_optional_version(version)
            }
        };
        result = result.with_property(properties::PACKAGE_MANAGER, manager);
        if package.scripts.contains_key("build") {
            result = result.with_property(properties::BUILD_SCRIPT, "build");
        }
        Ok(Some(result))
    }

    fn generate_build_script_snippet(
        &self,
        _ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<BuildScriptSnippet> {
        let manager = result
            .properties
            .get(properties::PACKAGE_MANAGER)
            .map(String::as_str)
            .unwrap_or("npm");
        let install = match manager {
            "yarn" => "yarn install --prefer-offline",
            _ => "npm install",
        };

        let mut script = String::new();
        let _ = writeln!(script, "echo \"Node version: $(node --version)\"");
        let _ = writeln!(script, "echo \"Running '{}'...\"", install);
        let _ = writeln!(script, "{}", install);
        if let Some(build) = result.properties.get(properties::BUILD_SCRIPT) {
            let _ = writeln!(script, "echo \"Running '{} run {}'...\"", manager, build);
            let _ = writeln!(script, "{} run {}", manager, build);
        }

        let mut manifest = ManifestProperties::new();
        manifest.insert(manifest_keys::NODE_VERSION.to_string(), result.version().to_string());
        manifest.insert(manifest_keys::PACKAGE_MANAGER.to_string(), manager.to_string());

        Ok(BuildScriptSnippet {
            script,
            manifest_properties: manifest,
        })
    }

    fn generate_installer_snippet(
        &self,
        ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<Option<String>> {
        installer::sdk_install_snippet(ctx.options, NAME, result.version()).map(Some)
    }

    fn is_version_already_installed(&self, version: &str) -> bool {
        installer::is_installed(&self.install_root, version)
    }

    fn directories_to_exclude_from_intermediate(&self, _ctx: &RepositoryContext<'_>) -> Vec<String> {
        vec!["node_modules".to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::MemorySourceRepo;

    fn detect(repo: &MemorySourceRepo) -> Result<Option<DetectionResult>> {
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(repo, &opts);
        NodePlatform::new(&opts).detect(&ctx)
    }

    #[test]
    fn test_engines_node_constraint() {
        let repo = MemorySourceRepo::new().with_file(
            "package.json",
            r#"{"name": "app", "engines": {"node": ">=12 <14"}, "scripts": {"build": "tsc"}}"#,
        );

        let result = detect(&repo).unwrap().unwrap();
        assert_eq!(result.version(), ">=12 <14");
        assert_eq!(result.properties.get("package_manager").map(String::as_str), Some("npm"));
        assert_eq!(result.properties.get("build_script").map(String::as_str), Some("build"));
    }

    #[test]
    fn test_server_js_without_package_json() {
        let repo = MemorySourceRepo::new().with_file("server.js", "require('http')");
        let result = detect(&repo).unwrap().unwrap();
        assert_eq!(result.platform_version, None);
    }

    #[test]
    fn test_not_detected() {
        let repo = MemorySourceRepo::new().with_file("main.py", "");
        assert!(detect(&repo).unwrap().is_none());
    }

    #[test]
    fn test_malformed_package_json_is_an_error() {
        let repo = MemorySourceRepo::new().with_file("package.json", "{ not json");
        let err = detect(&repo).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse package.json"));
    }

    #[test]
    fn test_yarn_snippet() {
        let repo = MemorySourceRepo::new()
            .with_file("package.json", r#"{"scripts": {"build": "webpack"}}"#)
            .with_file("yarn.lock", "");
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);
        let node = NodePlatform::new(&opts);

        let result = node.detect(&ctx).unwrap().unwrap().with_version("12.19.0");
        let snippet = node.generate_build_script_snippet(&ctx, &result).unwrap();

        assert!(snippet.script.contains("yarn install --prefer-offline\n"));
        assert!(snippet.script.contains("yarn run build\n"));
        assert_eq!(snippet.manifest_properties.get("node_version").map(String::as_str), Some("12.19.0"));
        assert_eq!(
            snippet.manifest_properties.get("node_package_manager").map(String::as_str),
            Some("yarn")
        );
    }
}
