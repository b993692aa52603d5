//! Python platform.
//!
//! Packages are installed either into a virtual environment (the default,
//! named `pythonenv<major.minor>`) or into a plain target directory when the
//! `packagedir` property is set. The virtual environment can optionally be
//! packed into a single archive for the run-time image.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::Result;

use crate::core::error::RiggingError;
use crate::core::options::GeneratorOptions;
use crate::core::platform::{BuildScriptSnippet, DetectionResult, ManifestProperties, Platform};
use crate::core::repository::{RepositoryContext, SourceRepo};
use crate::platforms::catalog::VersionCatalog;
use crate::platforms::{explicit_detection, installer};
use crate::resolver::DottedVersion;
use crate::util::script::quote;

pub const NAME: &str = "python";
pub const DEFAULT_VERSION: &str = "3.8";

const DOWNLOADABLE_VERSIONS: &[&str] = &["2.7.18", "3.6.12", "3.7.9", "3.8.6", "3.9.0"];

/// Build property naming the virtual environment.
pub const VIRTUALENV_NAME_PROPERTY: &str = "virtualenv_name";
/// Build property redirecting packages into a directory instead of a virtual environment.
pub const PACKAGE_DIR_PROPERTY: &str = "packagedir";
/// Build property asking for the virtual environment to be packed (`tar-gz` or `zip`).
pub const COMPRESS_VIRTUALENV_PROPERTY: &str = "compress_virtualenv";
/// Build property that skips Django's `collectstatic`.
pub const DISABLE_COLLECTSTATIC_PROPERTY: &str = "disable_collectstatic";

/// Directory used by `packagedir` builds when left in the source tree.
pub const DEFAULT_TARGET_PACKAGE_DIR: &str = "__rigging_packages__";

const REQUIREMENTS_FILE: &str = "requirements.txt";
const RUNTIME_FILE: &str = "runtime.txt";
const PYTHON_VERSION_FILE: &str = ".python-version";
const MARKER_FILES: &[&str] = &[REQUIREMENTS_FILE, "setup.py", "pyproject.toml", RUNTIME_FILE];

/// Manifest keys written by this platform.
pub mod manifest_keys {
    pub const PYTHON_VERSION: &str = "python_version";
    pub const VIRTUALENV_NAME: &str = "python_virtualenv_name";
    pub const PACKAGE_DIR: &str = "python_packagedir";
    pub const COMPRESSED_VIRTUALENV_FILE: &str = "python_compressed_virtualenv_file";
}

/// How a virtual environment is packed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Compression {
    TarGz,
    Zip,
}

impl Compression {
    fn file_name(self, venv: &str) -> String {
        match self {
            Compression::TarGz => format!("{}.tar.gz", venv),
            Compression::Zip => format!("{}.zip", venv),
        }
    }

    fn command(self, venv: &str) -> String {
        let archive = quote(&format!("../{}", self.file_name(venv)));
        match self {
            Compression::TarGz => format!("(cd {} && tar -zcf {} .)", quote(venv), archive),
            Compression::Zip => format!("(cd {} && zip -y -q -r {} .)", quote(venv), archive),
        }
    }
}

/// The Python platform.
#[derive(Debug)]
pub struct PythonPlatform {
    install_root: PathBuf,
    catalog: VersionCatalog,
}

impl PythonPlatform {
    pub fn new(options: &GeneratorOptions) -> Self {
        let install_root = options.platform_install_dir(NAME);
        PythonPlatform {
            catalog: VersionCatalog::with_install_dir(&install_root, DOWNLOADABLE_VERSIONS),
            install_root,
        }
    }

    /// The `packagedir` value, if set.
    fn package_dir<'a>(ctx: &'a RepositoryContext<'_>) -> Option<&'a str> {
        ctx.property(PACKAGE_DIR_PROPERTY)
    }

    /// The configured virtual environment name, if set.
    fn virtualenv_name<'a>(ctx: &'a RepositoryContext<'_>) -> Option<&'a str> {
        ctx.property(VIRTUALENV_NAME_PROPERTY)
    }

    /// The requested compression. A present but empty property means `tar-gz`.
    fn compression(ctx: &RepositoryContext<'_>) -> Result<Option<Compression>, RiggingError> {
        let Some(value) = ctx.options.properties.get(COMPRESS_VIRTUALENV_PROPERTY) else {
            return Ok(None);
        };

        match value.trim().to_ascii_lowercase().as_str() {
            "" | "tar-gz" => Ok(Some(Compression::TarGz)),
            "zip" => Ok(Some(Compression::Zip)),
            other => Err(RiggingError::usage(format!(
                "unknown value `{}` for `{}`; expected `tar-gz` or `zip`",
                other, COMPRESS_VIRTUALENV_PROPERTY
            ))),
        }
    }

    /// The `venv` module and its extra arguments for a Python version.
    fn virtualenv_module(&self, version: &str) -> Result<(&'static str, &'static str), RiggingError> {
        let parsed: DottedVersion = version
            .parse()
            .map_err(|e| RiggingError::usage(format!("invalid python version `{}`: {}", version, e)))?;

        match parsed.major() {
            2 => Ok(("virtualenv", "")),
            3 => Ok(("venv", "--copies")),
            _ => Err(RiggingError::UnsupportedVersion {
                platform: NAME.to_string(),
                requested: version.to_string(),
                supported: self.catalog.versions().to_vec(),
            }),
        }
    }

    fn detect_version(repo: &dyn SourceRepo) -> Result<Option<String>> {
        if repo.file_exists(RUNTIME_FILE) {
            let content = repo.read_to_string(RUNTIME_FILE)?;
            let version = content
                .lines()
                .map(str::trim)
                .find(|l| !l.is_empty())
                .and_then(|l| l.strip_prefix("python-"))
                .filter(|v| v.parse::<DottedVersion>().is_ok());
            if let Some(version) = version {
                tracing::debug!("python version {} from {}", version, RUNTIME_FILE);
                return Ok(Some(version.to_string()));
            }
        }

        if repo.file_exists(PYTHON_VERSION_FILE) {
            let lines = repo.read_all_lines(PYTHON_VERSION_FILE)?;
            let version = lines
                .iter()
                .map(|l| l.trim())
                .find(|l| !l.is_empty() && !l.starts_with('#'))
                .filter(|v| v.parse::<DottedVersion>().is_ok());
            if let Some(version) = version {
                tracing::debug!("python version {} from {}", version, PYTHON_VERSION_FILE);
                return Ok(Some(version.to_string()));
            }
        }

        Ok(None)
    }

    /// Log the declared dependencies. Failures are reported, never raised.
    fn log_dependencies(repo: &dyn SourceRepo, version: &str) {
        if !repo.file_exists(REQUIREMENTS_FILE) {
            return;
        }

        match repo.read_all_lines(REQUIREMENTS_FILE) {
            Ok(lines) => {
                let deps: Vec<&str> = lines
                    .iter()
                    .map(|l| l.trim())
                    .filter(|l| !l.is_empty() && !l.starts_with('#'))
                    .collect();
                tracing::info!(
                    "python {} dependencies ({}): {}",
                    version,
                    deps.len(),
                    deps.join(", ")
                );
            }
            Err(e) => tracing::warn!("could not read {} to log dependencies: {:#}", REQUIREMENTS_FILE, e),
        }
    }
}

/// `pythonenv<major.minor>`, or `pythonenv` when the version is unknown.
fn default_virtualenv_name(version: &str) -> String {
    match version.parse::<DottedVersion>() {
        Ok(v) => format!("pythonenv{}", v.major_minor()),
        Err(_) => format!("pythonenv{}", version.trim()),
    }
}

impl Platform for PythonPlatform {
    fn name(&self) -> &str {
        NAME
    }

    fn default_version(&self) -> &str {
        DEFAULT_VERSION
    }

    fn supported_versions(&self) -> &[String] {
        self.catalog.versions()
    }

    fn detect(&self, ctx: &RepositoryContext<'_>) -> Result<Option<DetectionResult>> {
        if let Some(result) = explicit_detection(ctx, NAME) {
            return Ok(Some(result));
        }

        let repo = ctx.repo;
        let found = MARKER_FILES.iter().any(|f| repo.file_exists(f)) || repo.has_files_with_extension("", "py");
        if !found {
            tracing::debug!("no python files found");
            return Ok(None);
        }

        let version = Self::detect_version(repo)?;
        Ok(Some(DetectionResult::new(NAME).with_optional_version(version)))
    }

    fn generate_build_script_snippet(
        &self,
        ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<BuildScriptSnippet> {
        let package_dir = Self::package_dir(ctx);
        let configured_venv = Self::virtualenv_name(ctx);
        if package_dir.is_some() && configured_venv.is_some() {
            return Err(RiggingError::usage(format!(
                "options `{}` and `{}` are mutually exclusive; set only the target package directory or the virtual environment name",
                PACKAGE_DIR_PROPERTY, VIRTUALENV_NAME_PROPERTY
            ))
            .into());
        }

        let version = result.version();
        let compression = Self::compression(ctx)?;

        let mut manifest = ManifestProperties::new();
        manifest.insert(manifest_keys::PYTHON_VERSION.to_string(), version.to_string());

        let mut script = String::new();
        let _ = writeln!(script, "echo \"Python version: $(python --version 2>&1)\"");

        match package_dir {
            Some(dir) => {
                manifest.insert(manifest_keys::PACKAGE_DIR.to_string(), dir.to_string());
                let _ = writeln!(script, "if [ -f {} ]; then", REQUIREMENTS_FILE);
                let _ = writeln!(script, "    echo {}", quote(&format!("Installing packages into {}...", dir)));
                let _ = writeln!(
                    script,
                    "    python -m pip install -r {} --target={} --upgrade",
                    REQUIREMENTS_FILE,
                    quote(dir)
                );
                let _ = writeln!(script, "fi");
            }
            None => {
                let venv = configured_venv
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| default_virtualenv_name(version));
                let (module, args) = self.virtualenv_module(version)?;
                tracing::debug!("using virtual environment {} (module {})", venv, module);

                manifest.insert(manifest_keys::VIRTUALENV_NAME.to_string(), venv.clone());

                let create = if args.is_empty() {
                    format!("python -m {} {}", module, quote(&venv))
                } else {
                    format!("python -m {} {} {}", module, args, quote(&venv))
                };
                let _ = writeln!(
                    script,
                    "echo {}",
                    quote(&format!("Creating virtual environment {} using {}...", venv, module))
                );
                let _ = writeln!(script, "{}", create);
                let _ = writeln!(script, ". {}/bin/activate", quote(&venv));
                let _ = writeln!(script, "if [ -f {} ]; then", REQUIREMENTS_FILE);
                let _ = writeln!(script, "    python -m pip install --prefer-binary -r {}", REQUIREMENTS_FILE);
                let _ = writeln!(script, "elif [ -f setup.py ]; then");
                let _ = writeln!(script, "    python -m pip install .");
                let _ = writeln!(script, "fi");

                if ctx.repo.file_exists("manage.py") && !ctx.has_property(DISABLE_COLLECTSTATIC_PROPERTY) {
                    let _ = writeln!(script, "echo \"Running collectstatic...\"");
                    let _ = writeln!(
                        script,
                        "python manage.py collectstatic --noinput || echo \"collectstatic failed, continuing\""
                    );
                }

                if let Some(compression) = compression {
                    let file = compression.file_name(&venv);
                    let _ = writeln!(script, "echo {}", quote(&format!("Compressing virtual environment into {}...", file)));
                    let _ = writeln!(script, "{}", compression.command(&venv));
                    manifest.insert(manifest_keys::COMPRESSED_VIRTUALENV_FILE.to_string(), file);
                }
            }
        }

        Self::log_dependencies(ctx.repo, version);

        Ok(BuildScriptSnippet {
            script,
            manifest_properties: manifest,
        })
    }

    fn generate_installer_snippet(
        &self,
        ctx: &RepositoryContext<'_>,
        result: &DetectionResult,
    ) -> Result<Option<String>> {
        installer::sdk_install_snippet(ctx.options, NAME, result.version()).map(Some)
    }

    fn is_version_already_installed(&self, version: &str) -> bool {
        installer::is_installed(&self.install_root, version)
    }

    fn directories_to_exclude_from_build_output(&self, ctx: &RepositoryContext<'_>) -> Vec<String> {
        match (Self::virtualenv_name(ctx), Self::compression(ctx)) {
            (Some(venv), Ok(Some(_))) => vec![venv.to_string()],
            _ => Vec::new(),
        }
    }

    fn directories_to_exclude_from_intermediate(&self, ctx: &RepositoryContext<'_>) -> Vec<String> {
        let mut dirs = vec![DEFAULT_TARGET_PACKAGE_DIR.to_string()];
        if let Some(venv) = Self::virtualenv_name(ctx) {
            dirs.push(venv.to_string());
            dirs.push(Compression::Zip.file_name(venv));
            dirs.push(Compression::TarGz.file_name(venv));
        }
        dirs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::repository::MemorySourceRepo;

    fn platform() -> PythonPlatform {
        PythonPlatform::new(&GeneratorOptions::new("/memory"))
    }

    fn resolved(version: &str) -> DetectionResult {
        DetectionResult::new(NAME).with_version(version)
    }

    #[test]
    fn test_detects_requirements_and_runtime_version() {
        let repo = MemorySourceRepo::new()
            .with_file("requirements.txt", "flask\n")
            .with_file("runtime.txt", "python-3.7.9\n");
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let result = platform().detect(&ctx).unwrap().unwrap();
        assert_eq!(result.platform, "python");
        assert_eq!(result.platform_version.as_deref(), Some("3.7.9"));
    }

    #[test]
    fn test_detects_loose_py_files_without_version() {
        let repo = MemorySourceRepo::new().with_file("app.py", "print('hi')");
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let result = platform().detect(&ctx).unwrap().unwrap();
        assert_eq!(result.platform_version, None);
    }

    #[test]
    fn test_python_version_file() {
        let repo = MemorySourceRepo::new()
            .with_file("setup.py", "")
            .with_file(".python-version", "\n3.9.0\n");
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let result = platform().detect(&ctx).unwrap().unwrap();
        assert_eq!(result.version(), "3.9.0");
    }

    #[test]
    fn test_no_python_files() {
        let repo = MemorySourceRepo::new().with_file("index.php", "<?php");
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);
        assert!(platform().detect(&ctx).unwrap().is_none());
    }

    #[test]
    fn test_explicit_version_skips_heuristics() {
        let repo = MemorySourceRepo::new();
        let mut opts = GeneratorOptions::new("/memory");
        opts.platform_name = Some("python".to_string());
        opts.platform_version = Some("3.6".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);

        let result = platform().detect(&ctx).unwrap().unwrap();
        assert_eq!(result.version(), "3.6");
    }

    #[test]
    fn test_packagedir_and_virtualenv_are_mutually_exclusive() {
        let repo = MemorySourceRepo::new().with_file("requirements.txt", "flask");
        let mut opts = GeneratorOptions::new("/memory");
        opts.properties.insert(PACKAGE_DIR_PROPERTY.to_string(), "pkgs".to_string());
        opts.properties.insert(VIRTUALENV_NAME_PROPERTY.to_string(), "venv".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);

        let err = platform()
            .generate_build_script_snippet(&ctx, &resolved("3.8.6"))
            .unwrap_err();
        match err.downcast_ref::<RiggingError>() {
            Some(RiggingError::InvalidUsage { message }) => {
                assert!(message.contains("mutually exclusive"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_default_virtualenv_snippet() {
        let repo = MemorySourceRepo::new().with_file("requirements.txt", "flask\n# pinned\n");
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let snippet = platform()
            .generate_build_script_snippet(&ctx, &resolved("3.8.6"))
            .unwrap();
        assert!(snippet.script.contains("python -m venv --copies pythonenv3.8"));
        assert!(snippet.script.contains(". pythonenv3.8/bin/activate"));
        assert_eq!(snippet.manifest_properties.get("python_version").map(String::as_str), Some("3.8.6"));
        assert_eq!(
            snippet.manifest_properties.get(manifest_keys::VIRTUALENV_NAME).map(String::as_str),
            Some("pythonenv3.8")
        );
        assert!(!snippet.manifest_properties.contains_key(manifest_keys::COMPRESSED_VIRTUALENV_FILE));
    }

    #[test]
    fn test_python2_uses_virtualenv() {
        let repo = MemorySourceRepo::new();
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let snippet = platform()
            .generate_build_script_snippet(&ctx, &resolved("2.7.18"))
            .unwrap();
        assert!(snippet.script.contains("python -m virtualenv pythonenv2.7\n"));
    }

    #[test]
    fn test_unknown_major_rejected() {
        let repo = MemorySourceRepo::new();
        let opts = GeneratorOptions::new("/memory");
        let ctx = RepositoryContext::new(&repo, &opts);

        let err = platform()
            .generate_build_script_snippet(&ctx, &resolved("4.0.0"))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RiggingError>(),
            Some(RiggingError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn test_compression_defaults_to_tar_gz() {
        let repo = MemorySourceRepo::new();
        let mut opts = GeneratorOptions::new("/memory");
        opts.properties.insert(COMPRESS_VIRTUALENV_PROPERTY.to_string(), String::new());
        opts.properties.insert(VIRTUALENV_NAME_PROPERTY.to_string(), "venv".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);

        let python = platform();
        let snippet = python.generate_build_script_snippet(&ctx, &resolved("3.8.6")).unwrap();
        assert!(snippet.script.contains("(cd venv && tar -zcf ../venv.tar.gz .)"));
        assert_eq!(
            snippet.manifest_properties.get(manifest_keys::COMPRESSED_VIRTUALENV_FILE).map(String::as_str),
            Some("venv.tar.gz")
        );
        assert!(snippet.manifest_properties.keys().all(|k| k.starts_with("python_")));
        assert_eq!(python.directories_to_exclude_from_build_output(&ctx), vec!["venv"]);
    }

    #[test]
    fn test_zip_compression_and_bad_value() {
        let repo = MemorySourceRepo::new();
        let mut opts = GeneratorOptions::new("/memory");
        opts.properties.insert(COMPRESS_VIRTUALENV_PROPERTY.to_string(), "ZIP".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);

        let snippet = platform().generate_build_script_snippet(&ctx, &resolved("3.8.6")).unwrap();
        assert!(snippet.script.contains("zip -y -q -r ../pythonenv3.8.zip ."));

        opts.properties.insert(COMPRESS_VIRTUALENV_PROPERTY.to_string(), "rar".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);
        assert!(platform().generate_build_script_snippet(&ctx, &resolved("3.8.6")).is_err());
    }

    #[test]
    fn test_packagedir_snippet() {
        let repo = MemorySourceRepo::new().with_file("requirements.txt", "flask");
        let mut opts = GeneratorOptions::new("/memory");
        opts.properties.insert(PACKAGE_DIR_PROPERTY.to_string(), "pkgs".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);

        let snippet = platform().generate_build_script_snippet(&ctx, &resolved("3.8.6")).unwrap();
        assert!(snippet.script.contains("--target=pkgs --upgrade"));
        assert_eq!(snippet.manifest_properties.get(manifest_keys::PACKAGE_DIR).map(String::as_str), Some("pkgs"));
        assert!(!snippet.manifest_properties.contains_key(manifest_keys::VIRTUALENV_NAME));
    }

    #[test]
    fn test_intermediate_exclusions() {
        let repo = MemorySourceRepo::new();
        let mut opts = GeneratorOptions::new("/memory");
        opts.properties.insert(VIRTUALENV_NAME_PROPERTY.to_string(), "env".to_string());
        let ctx = RepositoryContext::new(&repo, &opts);

        assert_eq!(
            platform().directories_to_exclude_from_intermediate(&ctx),
            vec![DEFAULT_TARGET_PACKAGE_DIR, "env", "env.zip", "env.tar.gz"]
        );
    }
}
