//! Rigging CLI - detect, install and build the platforms of a source tree

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use rigging::core::error::{exit_codes, RiggingError};
use rigging::util::diagnostic::emit;
use rigging::util::shell::Shell;

fn main() {
    let cli = Cli::parse();

    // Set up logging; RUST_LOG overrides the flags
    let default_filter = if cli.verbose {
        "rigging=debug"
    } else if cli.quiet {
        "rigging=error"
    } else {
        "rigging=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Shell::from_flags(cli.quiet, cli.verbose, cli.color);
    let code = match run(cli, &shell) {
        Ok(code) => code,
        Err(e) => report(&e, &shell),
    };
    std::process::exit(code);
}

fn run(cli: Cli, shell: &Shell) -> Result<i32> {
    match cli.command {
        Commands::Setup(args) => commands::setup::execute(args, shell),
        Commands::Build(args) => commands::build::execute(args, shell),
        Commands::Script(args) => commands::script::execute(args, shell),
        Commands::Detect(args) => commands::detect::execute(args, shell),
        Commands::Platforms => commands::platforms::execute(shell),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}

/// Print `e` and pick the exit code for it.
fn report(e: &anyhow::Error, shell: &Shell) -> i32 {
    match e.downcast_ref::<RiggingError>() {
        Some(err) => {
            emit(&err.to_diagnostic(), shell.use_color());
            err.exit_code()
        }
        None => {
            shell.error(format!("{:#}", e));
            exit_codes::FAILURE
        }
    }
}
