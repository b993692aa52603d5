//! Configuration layering for rigging.
//!
//! Options for a run are assembled from, lowest precedence first:
//! 1. Built-in defaults
//! 2. Global config: `~/.rigging/config.toml`
//! 3. Project config: `<source>/rigging.toml`
//! 4. Environment variables (`RIGGING_*`, `<PLATFORM>_VERSION`)
//! 5. Command-line flags
//!
//! The environment is read through an [`EnvSource`] so the layering can be
//! exercised without touching the process environment.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::error::RiggingError;
use crate::core::options::GeneratorOptions;

/// File name of the project config inside the source directory.
pub const PROJECT_CONFIG_FILE: &str = "rigging.toml";

/// Environment variable names.
pub mod env_vars {
    pub const SHELL: &str = "RIGGING_SHELL";
    /// Fallback for [`SHELL`].
    pub const BASH: &str = "BASH";
    pub const PLATFORM_NAME: &str = "RIGGING_PLATFORM_NAME";
    pub const PLATFORM_VERSION: &str = "RIGGING_PLATFORM_VERSION";
    pub const ENABLE_DYNAMIC_INSTALL: &str = "RIGGING_ENABLE_DYNAMIC_INSTALL";
    pub const ENABLE_MULTIPLATFORM_BUILD: &str = "RIGGING_ENABLE_MULTIPLATFORM_BUILD";
    pub const DYNAMIC_INSTALL_ROOT_DIR: &str = "RIGGING_DYNAMIC_INSTALL_ROOT_DIR";
    pub const SDK_STORAGE_BASE_URL: &str = "RIGGING_SDK_STORAGE_BASE_URL";

    /// `PYTHON_VERSION` for `python`.
    pub fn platform_version(platform: &str) -> String {
        format!("{}_VERSION", platform.to_ascii_uppercase())
    }

    /// `RIGGING_DISABLE_PYTHON_BUILD` for `python`.
    pub fn disable_platform(platform: &str) -> String {
        format!("RIGGING_DISABLE_{}_BUILD", platform.to_ascii_uppercase())
    }
}

/// Rigging configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Per-platform settings keyed by platform name
    pub platforms: BTreeMap<String, PlatformConfig>,

    /// Free-form build properties passed to platforms
    pub properties: BTreeMap<String, String>,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Shell used to run generated scripts
    pub shell: Option<PathBuf>,

    /// Install missing platform versions while building
    pub dynamic_install: Option<bool>,

    /// Allow several platforms in one build
    pub multi_platform: Option<bool>,

    /// Root directory for dynamically installed platforms
    pub install_root: Option<PathBuf>,

    /// Base URL of the platform SDK storage
    pub sdk_storage_base_url: Option<String>,

    /// Time limit for build scripts, in seconds
    pub timeout_secs: Option<u64>,
}

/// Settings for a single platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Version or constraint to use instead of the detected one
    pub version: Option<String>,

    /// Set to `false` to skip the platform during detection
    pub enabled: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents).with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration, or the defaults when the file doesn't exist.
    ///
    /// A file that exists but can't be read or parsed is a usage error.
    pub fn load_or_default(path: &Path) -> Result<Self, RiggingError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(path).map_err(|e| RiggingError::usage(format!("{:#}", e)))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.shell.is_some() {
            self.build.shell = other.build.shell;
        }
        if other.build.dynamic_install.is_some() {
            self.build.dynamic_install = other.build.dynamic_install;
        }
        if other.build.multi_platform.is_some() {
            self.build.multi_platform = other.build.multi_platform;
        }
        if other.build.install_root.is_some() {
            self.build.install_root = other.build.install_root;
        }
        if other.build.sdk_storage_base_url.is_some() {
            self.build.sdk_storage_base_url = other.build.sdk_storage_base_url;
        }
        if other.build.timeout_secs.is_some() {
            self.build.timeout_secs = other.build.timeout_secs;
        }

        for (name, platform) in other.platforms {
            let entry = self.platforms.entry(name.to_ascii_lowercase()).or_default();
            if platform.version.is_some() {
                entry.version = platform.version;
            }
            if platform.enabled.is_some() {
                entry.enabled = platform.enabled;
            }
        }

        self.properties.extend(other.properties);
    }

    /// Apply this config on top of `options`.
    pub fn apply(&self, options: &mut GeneratorOptions) {
        if let Some(shell) = &self.build.shell {
            options.shell_path = Some(shell.clone());
        }
        if let Some(enabled) = self.build.dynamic_install {
            options.enable_dynamic_install = enabled;
        }
        if let Some(enabled) = self.build.multi_platform {
            options.enable_multi_platform_build = enabled;
        }
        if let Some(root) = &self.build.install_root {
            options.dynamic_install_root_dir = root.clone();
        }
        if let Some(url) = &self.build.sdk_storage_base_url {
            options.sdk_storage_base_url = url.clone();
        }
        if let Some(secs) = self.build.timeout_secs {
            options.timeout = Some(Duration::from_secs(secs));
        }

        for (name, platform) in &self.platforms {
            let name = name.to_ascii_lowercase();
            if let Some(version) = &platform.version {
                options.platform_versions.insert(name.clone(), version.clone());
            }
            match platform.enabled {
                Some(false) => {
                    options.disabled_platforms.insert(name);
                }
                Some(true) => {
                    options.disabled_platforms.remove(&name);
                }
                None => {}
            }
        }

        options
            .properties
            .extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (`<source>/rigging.toml`)
/// 2. Global config (`~/.rigging/config.toml`)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Result<Config, RiggingError> {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path)?);
    }

    config.merge(Config::load_or_default(project_path)?);
    Ok(config)
}

/// Get the global rigging config directory (~/.rigging).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".rigging"))
}

/// Get the global config path (~/.rigging/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (`<source>/rigging.toml`).
pub fn project_config_path(source_dir: &Path) -> PathBuf {
    source_dir.join(PROJECT_CONFIG_FILE)
}

/// A snapshot of environment variables.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: BTreeMap<String, String>,
}

impl EnvSource {
    /// Snapshot the process environment.
    pub fn from_process() -> Self {
        EnvSource {
            vars: std::env::vars().collect(),
        }
    }

    /// Build from explicit pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        EnvSource {
            vars: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    /// A variable's value; blank values count as unset.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// A boolean variable (`true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`).
    pub fn flag(&self, key: &str) -> Result<Option<bool>, RiggingError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(Some(true)),
            "false" | "0" | "no" | "off" => Ok(Some(false)),
            _ => Err(RiggingError::usage(format!(
                "invalid value `{}` for {}; expected true or false",
                value, key
            ))),
        }
    }

    /// Apply the environment on top of `options`. `platforms` are the
    /// registered platform names, used to find per-platform variables.
    pub fn apply(&self, options: &mut GeneratorOptions, platforms: &[&str]) -> Result<(), RiggingError> {
        if let Some(shell) = self.get(env_vars::SHELL).or_else(|| self.get(env_vars::BASH)) {
            options.shell_path = Some(PathBuf::from(shell));
        }
        if let Some(name) = self.get(env_vars::PLATFORM_NAME) {
            options.platform_name = Some(name.to_string());
        }
        if let Some(version) = self.get(env_vars::PLATFORM_VERSION) {
            options.platform_version = Some(version.to_string());
        }
        if let Some(enabled) = self.flag(env_vars::ENABLE_DYNAMIC_INSTALL)? {
            options.enable_dynamic_install = enabled;
        }
        if let Some(enabled) = self.flag(env_vars::ENABLE_MULTIPLATFORM_BUILD)? {
            options.enable_multi_platform_build = enabled;
        }
        if let Some(root) = self.get(env_vars::DYNAMIC_INSTALL_ROOT_DIR) {
            options.dynamic_install_root_dir = PathBuf::from(root);
        }
        if let Some(url) = self.get(env_vars::SDK_STORAGE_BASE_URL) {
            options.sdk_storage_base_url = url.to_string();
        }

        for platform in platforms {
            let name = platform.to_ascii_lowercase();
            if let Some(version) = self.get(&env_vars::platform_version(platform)) {
                options.platform_versions.insert(name.clone(), version.to_string());
            }
            match self.flag(&env_vars::disable_platform(platform))? {
                Some(true) => {
                    options.disabled_platforms.insert(name);
                }
                Some(false) => {
                    options.disabled_platforms.remove(&name);
                }
                None => {}
            }
        }

        Ok(())
    }
}

/// Settings given on the command line; the highest-precedence layer.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub platform_name: Option<String>,
    pub platform_version: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub intermediate_dir: Option<PathBuf>,
    /// `true` forces dynamic install on; `false` leaves lower layers alone.
    pub enable_dynamic_install: bool,
    /// `true` forces multi-platform builds on; `false` leaves lower layers alone.
    pub enable_multi_platform_build: bool,
    pub shell: Option<PathBuf>,
    pub timeout: Option<Duration>,
    pub properties: Vec<(String, String)>,
}

impl CliOverrides {
    pub fn apply(&self, options: &mut GeneratorOptions) {
        if let Some(name) = &self.platform_name {
            options.platform_name = Some(name.clone());
        }
        if let Some(version) = &self.platform_version {
            options.platform_version = Some(version.clone());
        }
        if let Some(dir) = &self.output_dir {
            options.output_dir = Some(dir.clone());
        }
        if let Some(dir) = &self.intermediate_dir {
            options.intermediate_dir = Some(dir.clone());
        }
        if self.enable_dynamic_install {
            options.enable_dynamic_install = true;
        }
        if self.enable_multi_platform_build {
            options.enable_multi_platform_build = true;
        }
        if let Some(shell) = &self.shell {
            options.shell_path = Some(shell.clone());
        }
        if let Some(timeout) = self.timeout {
            options.timeout = Some(timeout);
        }
        options
            .properties
            .extend(self.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Build the options for one run by layering every source.
pub fn build_options(
    source_dir: &Path,
    global_config: Option<&Path>,
    env: &EnvSource,
    cli: &CliOverrides,
    platforms: &[&str],
) -> Result<GeneratorOptions, RiggingError> {
    let config = load_config(global_config, &project_config_path(source_dir))?;

    let mut options = GeneratorOptions::new(source_dir);
    config.apply(&mut options);
    env.apply(&mut options, platforms)?;
    cli.apply(&mut options);

    tracing::debug!(
        "options: platform={:?} dynamic_install={} multi_platform={}",
        options.platform_name,
        options.enable_dynamic_install,
        options.enable_multi_platform_build
    );
    Ok(options)
}
