//! Supported-version catalogs.

use std::path::PathBuf;
use std::sync::OnceLock;

use crate::resolver::{sort_versions, DottedVersion};
use crate::util::fs::subdirectory_names;

/// The versions a platform can provide: the versions already installed
/// under its install directory plus the versions it knows how to download.
///
/// Loaded on first access and cached for the lifetime of the catalog.
#[derive(Debug)]
pub struct VersionCatalog {
    install_dir: Option<PathBuf>,
    downloadable: Vec<String>,
    cache: OnceLock<Vec<String>>,
}

impl VersionCatalog {
    /// A catalog of fixed versions only.
    pub fn fixed(versions: &[&str]) -> Self {
        VersionCatalog {
            install_dir: None,
            downloadable: versions.iter().map(|v| v.to_string()).collect(),
            cache: OnceLock::new(),
        }
    }

    /// A catalog that also lists the versions installed under `install_dir`.
    pub fn with_install_dir(install_dir: impl Into<PathBuf>, downloadable: &[&str]) -> Self {
        VersionCatalog {
            install_dir: Some(install_dir.into()),
            ..Self::fixed(downloadable)
        }
    }

    /// Supported versions, ascending.
    pub fn versions(&self) -> &[String] {
        self.cache.get_or_init(|| {
            let mut versions = self.downloadable.clone();
            if let Some(dir) = &self.install_dir {
                let installed: Vec<String> = subdirectory_names(dir)
                    .into_iter()
                    .filter(|name| name.parse::<DottedVersion>().is_ok())
                    .collect();
                tracing::debug!("found {} installed versions in {}", installed.len(), dir.display());
                versions.extend(installed);
            }
            sort_versions(&mut versions);
            versions
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_fixed_catalog_sorted() {
        let catalog = VersionCatalog::fixed(&["7.4.13", "7.2.34", "7.3.25"]);
        assert_eq!(catalog.versions(), ["7.2.34", "7.3.25", "7.4.13"]);
    }

    #[test]
    fn test_install_dir_versions_merged_and_cached() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("7.3.99")).unwrap();
        std::fs::create_dir_all(tmp.path().join("lts")).unwrap();

        let catalog = VersionCatalog::with_install_dir(tmp.path(), &["7.3.25"]);
        assert_eq!(catalog.versions(), ["7.3.25", "7.3.99"]);

        // Cached: later installs are not picked up by this instance.
        std::fs::create_dir_all(tmp.path().join("8.0.0")).unwrap();
        assert_eq!(catalog.versions(), ["7.3.25", "7.3.99"]);
    }
}
