//! Hugo static site generator.
//!
//! Hugo is a single binary downloaded from the upstream GitHub releases
//! rather than from SDK storage.

use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;

use crate::core::options::GeneratorOptions;
use crate::core::platform::{BuildScriptSnippet, DetectionResult, ManifestProperties, Platform};
use crate::core::repository::{RepositoryContext, SourceRepo};
use crate::platforms::catalog::VersionCatalog;
use crate::platforms::explicit_detection;
use crate::platforms::installer::{self, InstallSpec};

pub const NAME: &str = "hugo";
pub const DEFAULT_VERSION: &str = "0.71.0";

const INSTALLATION_URL_FORMAT: &str = "https://github.com/gohugoio/hugo/releases/download/v#VERSION#/#TAR_FILE#";
const TAR_FILE_NAME_FORMAT: &str = "hugo_extended_#VERSION#_Linux-64bit.tar.gz";

const CONFIG_EXTENSIONS: &[&str] = &["toml", "yaml", "yml", "json"];
const CONFIG_DIR: &str = "config";

/// A `baseURL` key in TOML, YAML or JSON, any case.
static BASE_URL_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?im)(?:^|[{,])\s*"?baseurl"?\s*[:=]"#).expect("valid baseURL pattern"));

/// Manifest keys written by this platform.
pub mod manifest_keys {
    pub const HUGO_VERSION: &str = "hugo_version";
}

/// Release download URL for `version`.
pub fn download_url(version: &str) -> String {
    let tar_file = TAR_FILE_NAME_FORMAT.replace("#VERSION#", version);
    INSTALLATION_URL_FORMAT
        .replace("#VERSION#", version)
        .replace("#TAR_FILE#", &tar_file)
}

/// The Hugo platform.
#[derive(Debug)]
pub struct HugoPlatform {
    install_root: PathBuf,
    catalog: VersionCatalog,
}

impl HugoPlatform {
    pub fn new(options: &GeneratorOptions) -> Self {
        HugoPlatform {
            install_root: options.platform_install_dir(NAME),
            catalog: VersionCatalog::fixed(&[DEFAULT_VERSION]),
        }
    }

    /// Config file candidates, root first, then the `config/` directory layouts.
    fn config_candidates(repo: &dyn SourceRepo) -> Vec<String> {
        let mut candidates: Vec<String> = CONFIG_EXTENSIONS.iter().map(|ext| format!("config.{}", ext)).collect();
        if repo.dir_exists(CONFIG_DIR) {
            for sub in ["_default", ""] {
                for ext in CONFIG_EXTENSIONS {
                    let path = if sub.is_empty() {
                        format!("{}/config.{}", CONFIG_DIR, ext)
                    } else {
                        format!("{}/{}/config.{}", CONFIG_DIR, sub, ext)
                    };
                    candidates.push(path);
                }
            }
        }
        candidates
    }

    /// Whether any Hugo config file declares a `baseURL`.
    fn is_hugo_site(repo: &dyn SourceRepo) -> Result<bool> {
        for candidate in Self::config_candidates(repo) {
            if !repo.file_exists(&candidate) {
                continue;
            }
            let content = repo.read_to_string(&candidate)?;
            if BASE_URL_KEY.is_match(&content) {
                tracing::debug!("hugo config found at {}", candidate);
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl Platform for HugoPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn default_version(&self) -> &str {
        DEFAULT_VERSION
    }

    fn supported_versions(&self) -> &[String] {
        self.catalog.versions()
    }

    fn accepts_unlisted_versions(&self) -> bool {
        true
    }

    fn detect(&self, ctx: &RepositoryContext<'_>) -> Result<Option<DetectionResult>> {
        if let Some(result) = explicit_detection(ctx, NAME) {
            return Ok(Some(result));
        }

        if Self::is_hugo_site(ctx.repo)? {
            Ok(Some(DetectionResult::new(NAME)))
        } else {
            Ok(None)
        }
    }

    fn generate_build_script_snippet(
        &self,
        _ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<BuildScriptSnippet> {
        let mut script = String::new();
        let _ = writeln!(script, "echo \"Hugo version: $(hugo version)\"");
        let _ = writeln!(script, "echo \"Running 'hugo'...\"");
        let _ = writeln!(script, "hugo");

        let mut manifest = ManifestProperties::new();
        manifest.insert(manifest_keys::HUGO_VERSION.to_string(), result.version().to_string());

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
        let version = result.version();
        let url = download_url(version);
        let dir = ctx.options.platform_install_dir(NAME).join(version);
        Ok(Some(installer::render_install_snippet(&InstallSpec {
            platform: NAME,
            version,
            install_dir: &dir,
            download_url: &url,
            bin_subdir: None,
        })))
    }

    fn is_version_already_installed(&self, version: &str) -> bool {
        installer::is_installed(&self.install_root, version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::MemorySourceRepo;

    fn detect(repo: &MemorySourceRepo) -> Option<DetectionResult> {
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(repo, &opts);
        HugoPlatform::new(&opts).detect(&ctx).unwrap()
    }

    #[test]
    fn test_root_config_with_base_url() {
        let repo = MemorySourceRepo::new().with_file("config.toml", "baseURL = \"https://example.org/\"\ntitle = \"Blog\"\n");
        assert!(detect(&repo).is_some());
    }

    #[test]
    fn test_config_directory() {
        let repo = MemorySourceRepo::new().with_file("config/_default/config.yaml", "baseurl: https://example.org/\n");
        assert!(detect(&repo).is_some());
    }

    #[test]
    fn test_single_line_json_config() {
        let repo = MemorySourceRepo::new().with_file("config.json", r#"{"title": "Blog", "baseURL": "https://example.org/"}"#);
        assert!(detect(&repo).is_some());
    }

    #[test]
    fn test_base_url_in_comment_ignored() {
        let repo = MemorySourceRepo::new().with_file("config.toml", "# set the baseurl later\ntitle = \"Blog\"\n");
        assert!(detect(&repo).is_none());
    }

    #[test]
    fn test_unrelated_config_json_ignored() {
        let repo = MemorySourceRepo::new().with_file("config.json", r#"{"port": 8080}"#);
        assert!(detect(&repo).is_none());
    }

    #[test]
    fn test_download_url() {
        assert_eq!(
            download_url("0.71.0"),
            "https://github.com/gohugoio/hugo/releases/download/v0.71.0/hugo_extended_0.71.0_Linux-64bit.tar.gz"
        );
    }

    #[test]
    fn test_installer_puts_install_dir_on_path() {
        let repo = MemorySourceRepo::new();
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let result = DetectionResult::new(NAME).with_version("0.80.0");
        let snippet = HugoPlatform::new(&opts)
            .generate_installer_snippet(&ctx, &result)
            .unwrap()
            .unwrap();
        assert!(snippet.contains("hugo_install_dir=/opt/hugo/0.80.0"));
        assert!(snippet.contains("v0.80.0/hugo_extended_0.80.0_Linux-64bit.tar.gz"));
        assert!(snippet.contains("export PATH=\"$hugo_install_dir:$PATH\""));
    }
}
