//! Shared installer snippet for dynamically installed platforms.
//!
//! Every platform installs into `<root>/<platform>/<version>` and marks a
//! completed install with a sentinel file, so the snippet can be run any
//! number of times and only downloads once.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use url::Url;

use crate::core::options::GeneratorOptions;
use crate::util::script::quote;

/// Sentinel written into an install directory once extraction finished.
pub const INSTALLED_SENTINEL: &str = ".rigging-installed";

/// What to install and where.
#[derive(Debug, Clone)]
pub struct InstallSpec<'a> {
    pub platform: &'a str,
    pub version: &'a str,
    /// `<root>/<platform>/<version>`.
    pub install_dir: &'a Path,
    pub download_url: &'a str,
    /// Directory (relative to `install_dir`) added to `PATH`; `None` adds
    /// the install directory itself.
    pub bin_subdir: Option<&'a str>,
}

/// URL of the SDK archive for `platform` at `version` under `base_url`.
///
/// `https://sdks.example/` + `python` + `3.8.1` gives
/// `https://sdks.example/python/python-3.8.1.tar.gz`.
pub fn sdk_download_url(base_url: &str, platform: &str, version: &str) -> Result<String> {
    let mut base = Url::parse(base_url).with_context(|| format!("invalid SDK storage base URL: {}", base_url))?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    let url = base
        .join(&format!("{}/{}-{}.tar.gz", platform, platform, version))
        .with_context(|| format!("failed to build download URL for {} {}", platform, version))?;
    Ok(url.to_string())
}

/// Install snippet for a platform whose archives live in SDK storage and
/// ship their executables under `bin/`.
pub fn sdk_install_snippet(options: &GeneratorOptions, platform: &str, version: &str) -> Result<String> {
    let url = sdk_download_url(&options.sdk_storage_base_url, platform, version)?;
    let dir = options.platform_install_dir(platform).join(version);
    Ok(render_install_snippet(&InstallSpec {
        platform,
        version,
        install_dir: &dir,
        download_url: &url,
        bin_subdir: Some("bin"),
    }))
}

/// Whether `version` has a completed install under `platform_root`.
pub fn is_installed(platform_root: &Path, version: &str) -> bool {
    if version.trim().is_empty() {
        return false;
    }
    let dir = platform_root.join(version);
    dir.join(INSTALLED_SENTINEL).is_file() || dir.join("bin").is_dir()
}

/// Render the idempotent install snippet.
pub fn render_install_snippet(install: &InstallSpec<'_>) -> String {
    let dir = install.install_dir.display().to_string();
    let archive = format!("/tmp/{}-{}.tar.gz", install.platform, install.version);
    let var = format!("{}_install_dir", install.platform.replace('-', "_"));
    let bin = match install.bin_subdir {
        Some(sub) => format!("${}/{}", var, sub),
        None => format!("${}", var),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{}={}", var, quote(&dir));
    let _ = writeln!(out, "if [ ! -f \"${}/{}\" ]; then", var, INSTALLED_SENTINEL);
    let _ = writeln!(
        out,
        "    echo {}",
        quote(&format!("Downloading and installing {} version {}...", install.platform, install.version))
    );
    let _ = writeln!(out, "    rm -rf \"${}\"", var);
    let _ = writeln!(out, "    mkdir -p \"${}\"", var);
    let _ = writeln!(out, "    curl -fsSL {} -o {}", quote(install.download_url), quote(&archive));
    let _ = writeln!(out, "    tar -xzf {} -C \"${}\"", quote(&archive), var);
    let _ = writeln!(out, "    rm -f {}", quote(&archive));
    let _ = writeln!(out, "    touch \"${}/{}\"", var, INSTALLED_SENTINEL);
    let _ = writeln!(
        out,
        "    echo \"Installed {} version {} to ${}\"",
        install.platform, install.version, var
    );
    let _ = writeln!(out, "fi");
    let _ = writeln!(out, "export PATH=\"{}:$PATH\"", bin);
    out
}
