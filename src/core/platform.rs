//! The platform plugin interface.
//!
//! A platform represents one language/runtime ecosystem. It decides whether
//! it applies to a repository, which version it needs, and contributes the
//! shell snippets that install and build it.

use std::collections::BTreeMap;

use anyhow::Result;
use serde::Serialize;

use crate::core::repository::RepositoryContext;

/// Manifest key/value pairs emitted by a platform.
pub type ManifestProperties = BTreeMap<String, String>;

/// Outcome of a successful [`Platform::detect`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// Name of the platform that produced this result.
    pub platform: String,

    /// Detected version or constraint. Replaced by the concrete resolved
    /// version before any snippet is generated.
    pub platform_version: Option<String>,

    /// Platform-specific facts gathered during detection.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, String>,
}

impl DetectionResult {
    /// A result with no version information.
    pub fn new(platform: impl Into<String>) -> Self {
        DetectionResult {
            platform: platform.into(),
            platform_version: None,
            properties: BTreeMap::new(),
        }
    }

    /// Set the version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.platform_version = Some(version.into());
        self
    }

    /// Set an optional version.
    pub fn with_optional_version(mut self, version: Option<String>) -> Self {
        self.platform_version = version;
        self
    }

    /// Record a platform-specific property.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// The version, or an empty string when none is known yet.
    pub fn version(&self) -> &str {
        self.platform_version.as_deref().unwrap_or_default()
    }
}

/// Build snippet and the manifest properties that go with it.
#[derive(Debug, Clone, Default)]
pub struct BuildScriptSnippet {
    /// Shell text to run for this platform.
    pub script: String,

    /// Properties recorded in the build manifest.
    pub manifest_properties: ManifestProperties,
}

/// A pluggable language/runtime integration.
///
/// Implementations are registered in a [`crate::platforms::PlatformRegistry`];
/// registration order is detection precedence.
pub trait Platform: Send + Sync {
    /// Lowercase platform name, e.g. `python`.
    fn name(&self) -> &str;

    /// Version used when neither configuration nor the repository names one.
    fn default_version(&self) -> &str;

    /// Concrete versions this platform can provide, in ascending order.
    ///
    /// Computed on first access and cached for the lifetime of the instance.
    fn supported_versions(&self) -> &[String];

    /// Whether a concrete version missing from the catalog may still be used.
    fn accepts_unlisted_versions(&self) -> bool {
        false
    }

    /// Whether this platform takes part in detection at all.
    fn is_enabled(&self, ctx: &RepositoryContext<'_>) -> bool {
        ctx.options.is_platform_enabled(self.name())
    }

    /// Whether this platform may be selected next to other platforms.
    fn is_enabled_for_multi_platform_build(&self, _ctx: &RepositoryContext<'_>) -> bool {
        true
    }

    /// Inspect the repository. `Ok(None)` means the platform does not apply.
    fn detect(&self, ctx: &RepositoryContext<'_>) -> Result<Option<DetectionResult>>;

    /// Produce the build snippet for a resolved detection result.
    ///
    /// Platform business rules are validated here, before any text is
    /// produced.
    fn generate_build_script_snippet(
        &self,
        ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<BuildScriptSnippet>;

    /// Produce the snippet that installs `result`'s version.
    fn generate_installer_snippet(
        &self,
        ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<Option<String>>;

    /// Whether `version` is already present under the install root.
    fn is_version_already_installed(&self, version: &str) -> bool;

    /// Record the tools (and versions) this result needs.
    fn set_required_tools(&self, result: &DetectionResult, tools: &mut BTreeMap<String, String>) {
        if let Some(version) = result.platform_version.as_deref().filter(|v| !v.trim().is_empty()) {
            tools.insert(self.name().to_string(), version.to_string());
        }
    }

    /// Directories that must not be copied into the build output.
    fn directories_to_exclude_from_build_output(&self, _ctx: &RepositoryContext<'_>) -> Vec<String> {
        Vec::new()
    }

    /// Directories that must not be copied into the intermediate directory.
    fn directories_to_exclude_from_intermediate(&self, _ctx: &RepositoryContext<'_>) -> Vec<String> {
        Vec::new()
    }
}
