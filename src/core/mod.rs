//! Core data model: platforms, detection results, options, the repository
//! accessor and the build manifest.

pub mod error;
pub mod manifest;
pub mod options;
pub mod platform;
pub mod repository;

pub use error::RiggingError;
pub use manifest::BuildManifest;
pub use options::GeneratorOptions;
pub use platform::{BuildScriptSnippet, DetectionResult, ManifestProperties, Platform};
pub use repository::{LocalSourceRepo, MemorySourceRepo, RepositoryContext, SourceRepo};
