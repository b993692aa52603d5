//! Options consumed by the detection and generation pipeline.
//!
//! The options are built once per invocation by layering defaults, config
//! files, environment variables and CLI flags (see [`crate::util::config`]).
//! Nothing in the core reads the process environment itself.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default root under which dynamically installed platforms live.
pub const DEFAULT_DYNAMIC_INSTALL_ROOT_DIR: &str = "/opt";

/// Default base URL for platform SDK archives.
pub const DEFAULT_SDK_STORAGE_BASE_URL: &str = "https://sdks.rigging.dev";

/// Options for one detection/generation run.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Root of the source tree.
    pub source_dir: PathBuf,

    /// Directory the source is copied to before building, if any.
    pub intermediate_dir: Option<PathBuf>,

    /// Directory the build output (and the manifest) lands in.
    pub output_dir: Option<PathBuf>,

    /// Restrict detection to this platform (case-insensitive).
    pub platform_name: Option<String>,

    /// Explicit version for `platform_name`.
    pub platform_version: Option<String>,

    /// Explicit versions keyed by lowercase platform name.
    pub platform_versions: BTreeMap<String, String>,

    /// Platforms switched off by configuration, lowercase.
    pub disabled_platforms: BTreeSet<String>,

    /// Allow emitting install snippets for missing platform versions.
    pub enable_dynamic_install: bool,

    /// Allow more than one platform to be selected.
    pub enable_multi_platform_build: bool,

    /// Install root used for dynamic installs, e.g. `/opt`.
    pub dynamic_install_root_dir: PathBuf,

    /// Base URL platform archives are downloaded from.
    pub sdk_storage_base_url: String,

    /// Free-form per-platform build properties.
    pub properties: BTreeMap<String, String>,

    /// Shell used to run generated scripts.
    pub shell_path: Option<PathBuf>,

    /// Time limit for running a generated script.
    pub timeout: Option<Duration>,
}

impl GeneratorOptions {
    /// Options for a source tree with everything else defaulted.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        GeneratorOptions {
            source_dir: source_dir.into(),
            ..Default::default()
        }
    }

    /// The explicit version configured for `platform`, if any.
    ///
    /// `--platform X --platform-version V` wins over a per-platform version
    /// from config or environment.
    pub fn explicit_version_for(&self, platform: &str) -> Option<&str> {
        let scoped = self
            .platform_name
            .as_deref()
            .filter(|name| name.eq_ignore_ascii_case(platform))
            .and(self.platform_version.as_deref());

        scoped
            .or_else(|| {
                self.platform_versions
                    .get(&platform.to_ascii_lowercase())
                    .map(|v| v.as_str())
            })
            .map(str::trim)
            .filter(|v| !v.is_empty())
    }

    /// Whether configuration leaves `platform` switched on.
    pub fn is_platform_enabled(&self, platform: &str) -> bool {
        !self.disabled_platforms.contains(&platform.to_ascii_lowercase())
    }

    /// Directory the build script runs in: the intermediate copy when one
    /// is configured, else the source tree itself.
    pub fn build_dir(&self) -> &Path {
        self.intermediate_dir.as_deref().unwrap_or(&self.source_dir)
    }

    /// Directory the build manifest is written to.
    pub fn manifest_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or(&self.source_dir)
    }

    /// Install root for one platform, e.g. `/opt/python`.
    pub fn platform_install_dir(&self, platform: &str) -> PathBuf {
        self.dynamic_install_root_dir.join(platform)
    }
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        GeneratorOptions {
            source_dir: PathBuf::from("."),
            intermediate_dir: None,
            output_dir: None,
            platform_name: None,
            platform_version: None,
            platform_versions: BTreeMap::new(),
            disabled_platforms: BTreeSet::new(),
            enable_dynamic_install: false,
            enable_multi_platform_build: false,
            dynamic_install_root_dir: PathBuf::from(DEFAULT_DYNAMIC_INSTALL_ROOT_DIR),
            sdk_storage_base_url: DEFAULT_SDK_STORAGE_BASE_URL.to_string(),
            properties: BTreeMap::new(),
            shell_path: None,
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_version_scoped_to_platform_name() {
        let mut opts = GeneratorOptions::new("/src");
        opts.platform_name = Some("Python".to_string());
        opts.platform_version = Some("3.9".to_string());
        opts.platform_versions.insert("python".to_string(), "3.7".to_string());
        opts.platform_versions.insert("node".to_string(), "12".to_string());

        assert_eq!(opts.explicit_version_for("python"), Some("3.9"));
        assert_eq!(opts.explicit_version_for("node"), Some("12"));
        assert_eq!(opts.explicit_version_for("php"), None);
    }

    #[test]
    fn test_blank_explicit_version_is_ignored() {
        let mut opts = GeneratorOptions::new("/src");
        opts.platform_versions.insert("python".to_string(), "  ".to_string());
        assert_eq!(opts.explicit_version_for("python"), None);
    }

    #[test]
    fn test_manifest_dir_defaults_to_source() {
        let mut opts = GeneratorOptions::new("/src");
        assert_eq!(opts.manifest_dir(), Path::new("/src"));
        opts.output_dir = Some(PathBuf::from("/out"));
        assert_eq!(opts.manifest_dir(), Path::new("/out"));
    }

    #[test]
    fn test_disabled_platforms_case_insensitive() {
        let mut opts = GeneratorOptions::new("/src");
        opts.disabled_platforms.insert("php".to_string());
        assert!(!opts.is_platform_enabled("PHP"));
        assert!(opts.is_platform_enabled("python"));
    }
}
