//! Platform detection and version resolution.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::core::error::RiggingError;
use crate::core::options::GeneratorOptions;
use crate::core::platform::{DetectionResult, Platform};
use crate::core::repository::RepositoryContext;
use crate::platforms::PlatformRegistry;
use crate::resolver::resolve_platform_version;

/// A platform selected for the build together with its detection result.
#[derive(Clone)]
pub struct DetectedPlatform {
    pub platform: Arc<dyn Platform>,
    pub result: DetectionResult,
}

impl DetectedPlatform {
    pub fn name(&self) -> &str {
        self.platform.name()
    }

    /// The resolved version, or an empty string before resolution.
    pub fn version(&self) -> &str {
        self.result.version()
    }
}

impl std::fmt::Debug for DetectedPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectedPlatform")
            .field("platform", &self.platform.name())
            .field("result", &self.result)
            .finish()
    }
}

/// JSON shape of one detected platform.
#[derive(Debug, Serialize)]
pub struct DetectionReport<'a> {
    pub platform: &'a str,
    pub version: &'a str,
    #[serde(skip_serializing_if = "no_properties")]
    pub properties: &'a BTreeMap<String, String>,
}

fn no_properties(properties: &&BTreeMap<String, String>) -> bool {
    properties.is_empty()
}

impl<'a> From<&'a DetectedPlatform> for DetectionReport<'a> {
    fn from(detected: &'a DetectedPlatform) -> Self {
        DetectionReport {
            platform: detected.name(),
            version: detected.version(),
            properties: &detected.result.properties,
        }
    }
}

/// Run detection over `registry` in order.
///
/// Returns the selected platforms, earliest registered first. An empty
/// vector means nothing was detected. Errors from a platform's `detect`
/// abort the run as [`RiggingError::DetectionFailed`].
pub fn detect_platforms(
    registry: &PlatformRegistry,
    ctx: &RepositoryContext<'_>,
) -> Result<Vec<DetectedPlatform>, RiggingError> {
    // Restrict to the explicitly requested platform, if any
    let requested = ctx
        .options
        .platform_name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());

    let candidates: Vec<&Arc<dyn Platform>> = match requested {
        Some(name) => {
            let platform = registry.get(name).ok_or_else(|| RiggingError::UnsupportedPlatform {
                name: name.to_string(),
                available: registry.names(),
            })?;
            vec![platform]
        }
        None => registry.iter().collect(),
    };

    let mut detected = Vec::new();
    for platform in candidates {
        let name = platform.name();
        if !platform.is_enabled(ctx) {
            tracing::debug!("platform {} is disabled, skipping detection", name);
            continue;
        }

        tracing::debug!("detecting {}", name);
        match platform.detect(ctx) {
            Ok(Some(result)) => {
                tracing::debug!("detected {} (version {:?})", name, result.platform_version);
                detected.push(DetectedPlatform {
                    platform: Arc::clone(platform),
                    result,
                });
            }
            Ok(None) => tracing::debug!("{} not detected", name),
            Err(e) => {
                return Err(RiggingError::DetectionFailed {
                    platform: name.to_string(),
                    source: e.into(),
                })
            }
        }
    }

    if detected.len() <= 1 {
        return Ok(detected);
    }

    if !ctx.options.enable_multi_platform_build {
        detected.truncate(1);
        tracing::debug!(
            "multi-platform build disabled, using {}",
            detected[0].name()
        );
        return Ok(detected);
    }

    let (multi, single): (Vec<_>, Vec<_>) = detected
        .into_iter()
        .partition(|d| d.platform.is_enabled_for_multi_platform_build(ctx));

    if multi.is_empty() {
        // Nothing may be combined; fall back to the primary platform alone.
        return Ok(single.into_iter().take(1).collect());
    }
    for skipped in &single {
        tracing::debug!("{} does not support multi-platform builds, dropping it", skipped.name());
    }
    Ok(multi)
}

/// Replace each detected version with the concrete version to build with.
pub fn resolve_versions(detected: &mut [DetectedPlatform], options: &GeneratorOptions) -> Result<(), RiggingError> {
    for d in detected.iter_mut() {
        let version = resolve_platform_version(d.platform.as_ref(), d.result.platform_version.as_deref(), options)?;
        tracing::info!("{} version {}", d.platform.name(), version);
        d.result.platform_version = Some(version);
    }
    Ok(())
}

/// [`detect_platforms`] followed by [`resolve_versions`].
pub fn detect_and_resolve(
    registry: &PlatformRegistry,
    ctx: &RepositoryContext<'_>,
) -> Result<Vec<DetectedPlatform>, RiggingError> {
    let mut detected = detect_platforms(registry, ctx)?;
    resolve_versions(&mut detected, ctx.options)?;
    Ok(detected)
}
