//! Test utilities for rigging unit tests.
//!
//! [`TestPlatform`] is a configurable [`Platform`] whose detection,
//! snippets and install state are set up front, so the detection engine,
//! the assembler and the installation provider can be tested without any
//! real ecosystem files.
//!
//! # Example
//!
//! ```rust,ignore
//! use rigging::test_support::TestPlatform;
//!
//! let a = TestPlatform::new("a").detecting_version("1.0").installed("1.0.0");
//! let b = TestPlatform::new("b").not_detecting();
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};

use crate::core::error::RiggingError;
use crate::core::options::GeneratorOptions;
use crate::core::platform::{BuildScriptSnippet, DetectionResult, ManifestProperties, Platform};
use crate::core::repository::{MemorySourceRepo, RepositoryContext};
use crate::platforms::PlatformRegistry;

#[derive(Debug, Clone)]
enum Detection {
    Detects(Option<String>),
    Skips,
    Fails(String),
}

/// A platform with scripted behaviour.
#[derive(Debug)]
pub struct TestPlatform {
    name: String,
    default_version: String,
    versions: Vec<String>,
    detection: Detection,
    enabled: bool,
    multi_platform: bool,
    installed: Vec<String>,
    build_script: String,
    install_script: String,
    manifest: ManifestProperties,
    usage_error: Option<String>,
    detect_calls: AtomicUsize,
}

impl TestPlatform {
    /// A platform that detects without a version, catalog `1.0.0`.
    pub fn new(name: &str) -> Self {
        TestPlatform {
            name: name.to_string(),
            default_version: "1.0.0".to_string(),
            versions: vec!["1.0.0".to_string()],
            detection: Detection::Detects(None),
            enabled: true,
            multi_platform: true,
            installed: Vec::new(),
            build_script: format!("echo \"building {}\"", name),
            install_script: format!("echo \"installing {}\"", name),
            manifest: ManifestProperties::new(),
            usage_error: None,
            detect_calls: AtomicUsize::new(0),
        }
    }

    pub fn detecting_version(mut self, version: &str) -> Self {
        self.detection = Detection::Detects(Some(version.to_string()));
        self
    }

    pub fn not_detecting(mut self) -> Self {
        self.detection = Detection::Skips;
        self
    }

    pub fn failing_detection(mut self, message: &str) -> Self {
        self.detection = Detection::Fails(message.to_string());
        self
    }

    pub fn with_versions(mut self, default: &str, versions: &[&str]) -> Self {
        self.default_version = default.to_string();
        self.versions = versions.iter().map(|v| v.to_string()).collect();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn single_platform_only(mut self) -> Self {
        self.multi_platform = false;
        self
    }

    pub fn installed(mut self, version: &str) -> Self {
        self.installed.push(version.to_string());
        self
    }

    pub fn with_build_script(mut self, script: &str) -> Self {
        self.build_script = script.to_string();
        self
    }

    pub fn with_install_script(mut self, script: &str) -> Self {
        self.install_script = script.to_string();
        self
    }

    pub fn with_manifest_property(mut self, key: &str, value: &str) -> Self {
        self.manifest.insert(key.to_string(), value.to_string());
        self
    }

    /// Make snippet generation fail with a usage error.
    pub fn rejecting_build(mut self, message: &str) -> Self {
        self.usage_error = Some(message.to_string());
        self
    }

    /// How often `detect` ran.
    pub fn detect_calls(&self) -> usize {
        self.detect_calls.load(Ordering::SeqCst)
    }
}

impl Platform for TestPlatform {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_version(&self) -> &str {
        &self.default_version
    }

    fn supported_versions(&self) -> &[String] {
        &self.versions
    }

    fn is_enabled(&self, ctx: &RepositoryContext<'_>) -> bool {
        self.enabled && ctx.options.is_platform_enabled(&self.name)
    }

    fn is_enabled_for_multi_platform_build(&self, _ctx: &RepositoryContext<'_>) -> bool {
        self.multi_platform
    }

    fn detect(&self, _ctx: &RepositoryContext<'_>) -> Result<Option<DetectionResult>> {
        self.detect_calls.fetch_add(1, Ordering::SeqCst);
        match &self.detection {
            Detection::Detects(version) => Ok(Some(
                DetectionResult::new(self.name.clone()).with_optional_version(version.clone()),
            )),
            Detection::Skips => Ok(None),
            Detection::Fails(message) => bail!("{}", message),
        }
    }

    fn generate_build_script_snippet(
        &self,
        _ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<BuildScriptSnippet> {
        if let Some(message) = &self.usage_error {
            return Err(RiggingError::usage(message.clone()).into());
        }

        let mut manifest = self.manifest.clone();
        manifest.insert(format!("{}_version", self.name), result.version().to_string());
        Ok(BuildScriptSnippet {
            script: self.build_script.clone(),
            manifest_properties: manifest,
        })
    }

    fn generate_installer_snippet(
        &self,
        _ctx: &RepositoryContext<'_>,
        _result: &DetectionResult,
    ) -> Result<Option<String>> {
        Ok(Some(self.install_script.clone()))
    }

    fn is_version_already_installed(&self, version: &str) -> bool {
        self.installed.iter().any(|v| v == version)
    }

    fn directories_to_exclude_from_intermediate(&self, _ctx: &RepositoryContext<'_>) -> Vec<String> {
        vec![format!("{}_cache", self.name), "shared_cache".to_string()]
    }
}

/// A registry holding `platforms` in the given order.
pub fn registry_of(platforms: Vec<Arc<TestPlatform>>) -> PlatformRegistry {
    let mut registry = PlatformRegistry::new();
    for platform in platforms {
        registry.register(platform);
    }
    registry
}

/// Options rooted at the in-memory repository.
pub fn test_options() -> GeneratorOptions {
    GeneratorOptions::new("/memory")
}

/// An in-memory repository with the given files.
pub fn repo_with(files: &[(&str, &str)]) -> MemorySourceRepo {
    let mut repo = MemorySourceRepo::new();
    for (path, content) in files {
        repo.add_file(path, *content);
    }
    repo
}

/// Expected tool map for assertions.
pub fn tools(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}
