//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rigging::util::shell::ColorChoice;

/// Rigging - detect the platforms of a source tree and build it
#[derive(Parser)]
#[command(name = "rigging")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    pub color: ColorChoice,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Install the platform versions a source tree needs
    Setup(SetupArgs),

    /// Install, build and record the build manifest
    Build(BuildArgs),

    /// Print the generated build script without running it
    Script(ScriptArgs),

    /// Show detected platforms and resolved versions
    Detect(DetectArgs),

    /// List supported platforms and versions
    Platforms,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Options shared by every command that inspects a source tree.
#[derive(Args, Debug, Clone)]
pub struct GeneratorArgs {
    /// Source directory
    #[arg(default_value = ".")]
    pub source_dir: PathBuf,

    /// Only consider this platform
    #[arg(long)]
    pub platform: Option<String>,

    /// Version to use for `--platform`
    #[arg(long, value_name = "VERSION")]
    pub platform_version: Option<String>,

    /// Directory the build manifest is written to
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Intermediate directory the source is copied to
    #[arg(long, value_name = "DIR")]
    pub intermediate: Option<PathBuf>,

    /// Build property, e.g. `-p virtualenv_name=pythonenv`
    #[arg(short = 'p', long = "property", value_name = "KEY=VALUE", value_parser = parse_property)]
    pub properties: Vec<(String, String)>,

    /// Install missing platform versions before building
    #[arg(long)]
    pub dynamic_install: bool,

    /// Build every detected platform instead of only the first
    #[arg(long)]
    pub multi_platform: bool,

    /// Shell used to run generated scripts
    #[arg(long, value_name = "PATH")]
    pub shell: Option<PathBuf>,

    /// Kill the generated script after this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct SetupArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// Print the install script instead of running it
    #[arg(long)]
    pub print: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,
}

#[derive(Args)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,
}

#[derive(Args)]
pub struct DetectArgs {
    #[command(flatten)]
    pub generator: GeneratorArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: clap_complete::Shell,
}

fn parse_property(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid property `{}`; expected KEY=VALUE", s))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid property `{}`; key is empty", s));
    }
    Ok((key.to_string(), value.to_string()))
}
