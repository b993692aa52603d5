//! PHP platform.

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

pub const NAME: &str = "php";
pub const DEFAULT_VERSION: &str = "7.3";

const DOWNLOADABLE_VERSIONS: &[&str] = &["7.2.34", "7.3.25", "7.4.13"];

const COMPOSER_JSON: &str = "composer.json";

/// Manifest keys written by this platform.
pub mod manifest_keys {
    pub const PHP_VERSION: &str = "php_version";
}

#[derive(Debug, Default, Deserialize)]
struct ComposerJson {
    #[serde(default)]
    require: BTreeMap<String, serde_json::Value>,
}

/// The PHP platform.
///
/// PHP images serve the app with their own web server, so PHP is never
/// combined with other platforms.
#[derive(Debug)]
pub struct PhpPlatform {
    install_root: PathBuf,
    catalog: VersionCatalog,
}

impl PhpPlatform {
    pub fn new(options: &GeneratorOptions) -> Self {
        let install_root = options.platform_install_dir(NAME);
        PhpPlatform {
            catalog: VersionCatalog::with_install_dir(&install_root, DOWNLOADABLE_VERSIONS),
            install_root,
        }
    }
}

impl Platform for PhpPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn default_version(&self) -> &str {
        DEFAULT_VERSION
    }

    fn supported_versions(&self) -> &[String] {
        self.catalog.versions()
    }

    fn is_enabled_for_multi_platform_build(&self, _ctx: &RepositoryContext<'_>) -> bool {
        false
    }

    fn detect(&self, ctx: &RepositoryContext<'_>) -> Result<Option<DetectionResult>> {
        if let Some(result) = explicit_detection(ctx, NAME) {
            return Ok(Some(result));
        }

        let repo = ctx.repo;
        if repo.file_exists(COMPOSER_JSON) {
            let content = repo.read_to_string(COMPOSER_JSON)?;
            let composer: ComposerJson =
                serde_json::from_str(&content).with_context(|| format!("failed to parse {}", COMPOSER_JSON))?;
            let version = composer
                .require
                .get("php")
                .and_then(|v| v.as_str())
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty());
            return Ok(Some(DetectionResult::new(NAME).with_optional_version(version)));
        }

        if repo.has_files_with_extension("", "php") {
            return Ok(Some(DetectionResult::new(NAME)));
        }

        tracing::debug!("no php files found");
        Ok(None)
    }

    fn generate_build_script_snippet(
        &self,
        ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<BuildScriptSnippet> {
        let mut script = String::new();
        let _ = writeln!(script, "echo \"PHP executable: $(command -v php)\"");
        if ctx.repo.file_exists(COMPOSER_JSON) {
            let _ = writeln!(script, "echo \"Running 'composer install'...\"");
            let _ = writeln!(script, "composer install --ignore-platform-reqs --no-interaction");
        } else {
            let _ = writeln!(script, "echo \"No composer.json found, skipping dependency install\"");
        }

        let mut manifest = ManifestProperties::new();
        manifest.insert(manifest_keys::PHP_VERSION.to_string(), result.version().to_string());

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
        vec!["vendor".to_string()]
    }
}
