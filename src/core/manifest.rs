//! The build manifest: the record a later run-time stage reads to learn
//! which platforms, versions and settings a build chose.
//!
//! The manifest is a flat TOML file of `key = "value"` lines written to
//! `<output>/rigging-manifest.toml`. Keys are namespaced by the platform that
//! emits them; two platforms emitting the same key is an error.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::error::RiggingError;
use crate::core::platform::ManifestProperties;
use crate::util::fs::atomic_write;

/// File name of the manifest inside the output directory.
pub const MANIFEST_FILE_NAME: &str = "rigging-manifest.toml";

/// Owner recorded for keys written by the pipeline itself.
pub const PIPELINE_OWNER: &str = "rigging";

/// Keys the pipeline adds next to the platform keys.
pub mod keys {
    /// Comma-separated names of the selected platforms, in build order.
    pub const PLATFORMS: &str = "platforms";
    /// Comma-separated `tool=version` pairs required at run time.
    pub const REQUIRED_TOOLS: &str = "required_tools";
    /// Version of rigging that produced the manifest.
    pub const RIGGING_VERSION: &str = "rigging_version";
}

/// Merged manifest properties of every selected platform.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildManifest {
    properties: ManifestProperties,
    owners: BTreeMap<String, String>,
}

impl BuildManifest {
    /// An empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one platform's properties, rejecting keys another owner already set.
    ///
    /// On error nothing from `properties` is merged.
    pub fn merge(&mut self, owner: &str, properties: &ManifestProperties) -> Result<(), RiggingError> {
        for key in properties.keys() {
            if let Some(first) = self.owners.get(key) {
                return Err(RiggingError::ManifestKeyCollision {
                    key: key.clone(),
                    first: first.clone(),
                    second: owner.to_string(),
                });
            }
        }

        for (key, value) in properties {
            self.owners.insert(key.clone(), owner.to_string());
            self.properties.insert(key.clone(), value.clone());
        }
        Ok(())
    }

    /// Set a single property on behalf of `owner`.
    pub fn insert(&mut self, owner: &str, key: &str, value: impl Into<String>) -> Result<(), RiggingError> {
        let mut single = ManifestProperties::new();
        single.insert(key.to_string(), value.into());
        self.merge(owner, &single)
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(|v| v.as_str())
    }

    /// All properties, ordered by key.
    pub fn properties(&self) -> &ManifestProperties {
        &self.properties
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Whether the manifest has no properties.
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Render the manifest file content.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(&self.properties).context("failed to serialize build manifest")
    }

    /// Persist the manifest to `<dir>/rigging-manifest.toml`.
    ///
    /// The file is replaced atomically; a reader never sees a partial manifest.
    pub fn write(&self, dir: &Path) -> Result<PathBuf, RiggingError> {
        let path = dir.join(MANIFEST_FILE_NAME);
        let content = self.to_toml_string().map_err(|e| RiggingError::ManifestWrite {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()),
        })?;

        atomic_write(&path, |w| w.write_all(content.as_bytes())).map_err(|source| {
            RiggingError::ManifestWrite {
                path: path.clone(),
                source,
            }
        })?;

        tracing::debug!("wrote build manifest to {}", path.display());
        Ok(path)
    }

    /// Read a manifest written by [`BuildManifest::write`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read build manifest: {}", path.display()))?;
        let properties: ManifestProperties = toml::from_str(&content)
            .with_context(|| format!("failed to parse build manifest: {}", path.display()))?;

        let owners = properties
            .keys()
            .map(|k| (k.clone(), PIPELINE_OWNER.to_string()))
            .collect();
        Ok(BuildManifest { properties, owners })
    }
}
