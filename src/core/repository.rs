//! Read-only access to the source tree being inspected.
//!
//! Platforms never touch the filesystem directly; they go through a
//! [`SourceRepo`] so detection stays side-effect free and can be exercised
//! against an in-memory tree.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::core::options::GeneratorOptions;

/// Read-only view of a source tree. Paths are relative to the source root.
pub trait SourceRepo: Send + Sync {
    /// Root of the source tree, for display and for running scripts in.
    fn root(&self) -> &Path;

    /// Check whether a file exists.
    fn file_exists(&self, path: &str) -> bool;

    /// Check whether a directory exists.
    fn dir_exists(&self, path: &str) -> bool;

    /// Read a file as a string.
    fn read_to_string(&self, path: &str) -> Result<String>;

    /// Read a file as lines.
    fn read_all_lines(&self, path: &str) -> Result<Vec<String>> {
        Ok(self
            .read_to_string(path)?
            .lines()
            .map(|l| l.to_string())
            .collect())
    }

    /// Whether any file directly under `dir` has the given extension.
    fn has_files_with_extension(&self, dir: &str, extension: &str) -> bool;
}

/// A [`SourceRepo`] backed by a directory on disk.
#[derive(Debug, Clone)]
pub struct LocalSourceRepo {
    root: PathBuf,
}

impl LocalSourceRepo {
    /// Create a repository rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalSourceRepo { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }
}

impl SourceRepo for LocalSourceRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn file_exists(&self, path: &str) -> bool {
        self.resolve(path).is_file()
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.resolve(path).is_dir()
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        let full = self.resolve(path);
        fs::read_to_string(&full).with_context(|| format!("failed to read file: {}", full.display()))
    }

    fn has_files_with_extension(&self, dir: &str, extension: &str) -> bool {
        WalkDir::new(self.resolve(dir))
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .any(|e| e.path().extension().is_some_and(|ext| ext == extension))
    }
}

/// An in-memory [`SourceRepo`], used by tests and by callers that
/// synthesize a tree.
#[derive(Debug, Clone, Default)]
pub struct MemorySourceRepo {
    root: PathBuf,
    files: BTreeMap<String, String>,
    dirs: BTreeSet<String>,
}

impl MemorySourceRepo {
    /// Create an empty repository.
    pub fn new() -> Self {
        MemorySourceRepo {
            root: PathBuf::from("/memory"),
            files: BTreeMap::new(),
            dirs: BTreeSet::new(),
        }
    }

    /// Add a file, registering its parent directories.
    pub fn add_file(&mut self, path: &str, content: impl Into<String>) {
        let mut current = Path::new(path).parent();
        while let Some(parent) = current {
            if parent.as_os_str().is_empty() {
                break;
            }
            self.dirs.insert(parent.to_string_lossy().into_owned());
            current = parent.parent();
        }
        self.files.insert(path.to_string(), content.into());
    }

    /// Builder-style [`MemorySourceRepo::add_file`].
    pub fn with_file(mut self, path: &str, content: impl Into<String>) -> Self {
        self.add_file(path, content);
        self
    }
}

impl SourceRepo for MemorySourceRepo {
    fn root(&self) -> &Path {
        &self.root
    }

    fn file_exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn dir_exists(&self, path: &str) -> bool {
        self.dirs.contains(path.trim_end_matches('/'))
    }

    fn read_to_string(&self, path: &str) -> Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("file not found: {}", path))
    }

    fn has_files_with_extension(&self, dir: &str, extension: &str) -> bool {
        let dir = dir.trim_end_matches('/');
        self.files.keys().any(|f| {
            let path = Path::new(f);
            let parent = path.parent().map(|p| p.to_string_lossy().into_owned()).unwrap_or_default();
            let in_dir = if dir.is_empty() || dir == "." {
                parent.is_empty()
            } else {
                parent == dir
            };
            in_dir && path.extension().is_some_and(|ext| ext == extension)
        })
    }
}

/// Everything a platform sees while detecting and generating snippets.
pub struct RepositoryContext<'a> {
    /// The source tree.
    pub repo: &'a dyn SourceRepo,
    /// Resolved options for this invocation.
    pub options: &'a GeneratorOptions,
}

impl<'a> RepositoryContext<'a> {
    /// Create a context.
    pub fn new(repo: &'a dyn SourceRepo, options: &'a GeneratorOptions) -> Self {
        RepositoryContext { repo, options }
    }

    /// Look up a free-form build property, treating whitespace-only values as unset.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.options
            .properties
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    /// Whether a build property key is present at all, even with an empty value.
    pub fn has_property(&self, key: &str) -> bool {
        self.options.properties.contains_key(key)
    }
}
