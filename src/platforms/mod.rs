//! Built-in platforms and the registry that orders them.

pub mod catalog;
pub mod hugo;
pub mod installer;
pub mod node;
pub mod php;
pub mod python;
pub mod registry;

pub use catalog::VersionCatalog;
pub use hugo::HugoPlatform;
pub use node::NodePlatform;
pub use php::PhpPlatform;
pub use python::PythonPlatform;
pub use registry::PlatformRegistry;

use crate::core::platform::DetectionResult;
use crate::core::repository::RepositoryContext;

/// Names of the built-in platforms, in registration order.
pub const BUILTIN_PLATFORMS: &[&str] = &[node::NAME, python::NAME, php::NAME, hugo::NAME];

/// A detection result built from `--platform <name> --platform-version <v>`
/// alone, skipping the platform's file heuristics.
///
/// Only applies when the invocation names `platform` explicitly and carries
/// a version for it.
pub(crate) fn explicit_detection(ctx: &RepositoryContext<'_>, platform: &str) -> Option<DetectionResult> {
    let requested = ctx.options.platform_name.as_deref()?;
    if !requested.eq_ignore_ascii_case(platform) {
        return None;
    }

    let version = ctx.options.explicit_version_for(platform)?;
    tracing::debug!("using explicit {} version {}", platform, version);
    Some(DetectionResult::new(platform).with_version(version))
}
