//! Platform version resolution.
//!
//! Resolution happens in two pure steps:
//!
//! 1. [`choose_version`] picks the candidate by precedence: an explicit
//!    version from the options, then the version detected in the
//!    repository, then the platform default.
//! 2. [`resolve_version`] maps the candidate, which may be a partial
//!    version or a range, onto the highest satisfying entry of the
//!    platform's supported-version catalog.

pub mod version;

use crate::core::error::RiggingError;
use crate::core::options::GeneratorOptions;
use crate::core::platform::Platform;

pub use version::{compare_versions, max_satisfying_version, sort_versions, DottedVersion, VersionConstraint};

/// Pick the version to resolve: explicit, then detected, then default.
///
/// Blank strings count as absent.
pub fn choose_version<'a>(explicit: Option<&'a str>, detected: Option<&'a str>, default: &'a str) -> &'a str {
    let present = |v: Option<&'a str>| v.map(str::trim).filter(|v| !v.is_empty());
    present(explicit)
        .or_else(|| present(detected))
        .unwrap_or(default)
}

/// Resolve the concrete version for `platform`.
///
/// Fails with [`RiggingError::UnsupportedVersion`] when no catalog entry
/// satisfies the chosen candidate; the error lists the whole catalog.
pub fn resolve_version(
    platform: &str,
    explicit: Option<&str>,
    detected: Option<&str>,
    default: &str,
    catalog: &[String],
) -> Result<String, RiggingError> {
    let candidate = choose_version(explicit, detected, default);

    max_satisfying_version(candidate, catalog).ok_or_else(|| RiggingError::UnsupportedVersion {
        platform: platform.to_string(),
        requested: candidate.to_string(),
        supported: catalog.to_vec(),
    })
}

/// Resolve `detected` for a registered platform using its catalog, its
/// default and the explicit version configured for it.
pub fn resolve_platform_version(
    platform: &dyn Platform,
    detected: Option<&str>,
    options: &GeneratorOptions,
) -> Result<String, RiggingError> {
    let explicit = options.explicit_version_for(platform.name());
    let catalog = platform.supported_versions();

    match resolve_version(platform.name(), explicit, detected, platform.default_version(), catalog) {
        Ok(version) => Ok(version),
        Err(err) if platform.accepts_unlisted_versions() => {
            let candidate = choose_version(explicit, detected, platform.default_version());
            if candidate.parse::<DottedVersion>().is_ok() {
                tracing::debug!(
                    "{} version {} is not in the catalog, using it as requested",
                    platform.name(),
                    candidate
                );
                Ok(candidate.to_string())
            } else {
                Err(err)
            }
        }
        Err(err) => Err(err),
    }
}
