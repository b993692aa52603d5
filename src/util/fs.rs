//! Filesystem utilities.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use walkdir::WalkDir;

/// Write a file so readers only ever see the old or the complete new content.
///
/// The content is written to a temporary file in the same directory, synced
/// and renamed over `path`. If `write` fails, the temporary file is removed
/// and `path` is left untouched.
pub fn atomic_write<F>(path: &Path, write: F) -> io::Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    write(tmp.as_file_mut())?;
    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Copy the tree under `src` into `dst`, returning the number of files
/// copied.
///
/// Entries whose path relative to `src` is listed in `excluded` are skipped
/// with everything below them, as is `dst` when it lies inside `src`.
/// Symlinks are not followed or copied.
pub fn copy_source_tree(src: &Path, dst: &Path, excluded: &[String]) -> Result<usize> {
    fs::create_dir_all(dst).with_context(|| format!("failed to create directory: {}", dst.display()))?;
    let dst_real = dst.canonicalize().ok();

    let skip = |entry: &walkdir::DirEntry| {
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        if excluded.iter().any(|x| rel == Path::new(x)) {
            return true;
        }
        entry.file_type().is_dir() && dst_real.is_some() && entry.path().canonicalize().ok() == dst_real
    };

    let mut copied = 0;
    for entry in WalkDir::new(src).min_depth(1).into_iter().filter_entry(|e| !skip(e)) {
        let entry = entry.with_context(|| format!("failed to read directory: {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("failed to create directory: {}", target.display()))?;
        } else if entry.file_type().is_file() {
            fs::copy(entry.path(), &target).with_context(|| {
                format!("failed to copy {} to {}", entry.path().display(), target.display())
            })?;
            copied += 1;
        }
    }
    Ok(copied)
}

/// Names of the immediate subdirectories of `path`, sorted.
///
/// A missing directory yields an empty list.
pub fn subdirectory_names(path: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(path)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join("file.txt");

        atomic_write(&path, |w| w.write_all(b"first")).unwrap();
        atomic_write(&path, |w| w.write_all(b"second")).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_atomic_write_failure_keeps_previous_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("file.txt");
        atomic_write(&path, |w| w.write_all(b"complete")).unwrap();

        let result = atomic_write(&path, |w| {
            w.write_all(b"half-writ")?;
            Err(io::Error::new(io::ErrorKind::Interrupted, "interrupted"))
        });

        assert!(result.is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "complete");
        let leftovers: Vec<_> = fs::read_dir(tmp.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_copy_source_tree_skips_exclusions() {
        let src = TempDir::new().unwrap();
        fs::create_dir_all(src.path().join("app/static")).unwrap();
        fs::create_dir_all(src.path().join("node_modules/left-pad")).unwrap();
        fs::write(src.path().join("app/static/site.css"), "body {}").unwrap();
        fs::write(src.path().join("node_modules/left-pad/index.js"), "").unwrap();
        fs::write(src.path().join("package.json"), "{}").unwrap();

        let dst = TempDir::new().unwrap();
        let copied = copy_source_tree(src.path(), dst.path(), &["node_modules".to_string()]).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(fs::read_to_string(dst.path().join("app/static/site.css")).unwrap(), "body {}");
        assert!(dst.path().join("package.json").is_file());
        assert!(!dst.path().join("node_modules").exists());
    }

    #[test]
    fn test_copy_source_tree_into_itself() {
        let src = TempDir::new().unwrap();
        fs::write(src.path().join("index.php"), "<?php").unwrap();
        let dst = src.path().join("work");

        assert_eq!(copy_source_tree(src.path(), &dst, &[]).unwrap(), 1);
        assert!(dst.join("index.php").is_file());
        assert!(!dst.join("work").exists());
    }

    #[test]
    fn test_subdirectory_names() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("3.8.1")).unwrap();
        fs::create_dir_all(tmp.path().join("3.7.2")).unwrap();
        fs::write(tmp.path().join("README"), "not a version").unwrap();

        assert_eq!(subdirectory_names(tmp.path()), vec!["3.7.2", "3.8.1"]);
        assert!(subdirectory_names(&tmp.path().join("missing")).is_empty());
    }
}
