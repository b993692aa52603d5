//! Running a generated script as a child process.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::error::RiggingError;
use crate::core::options::GeneratorOptions;
use crate::util::process::{find_executable, OutputLine, ProcessBuilder, ProcessOutcome};
use crate::util::script::DEFAULT_SHELL;

/// Interpreter used to run generated scripts: the configured shell, else
/// `bash` from `PATH`, else `/bin/bash`.
pub fn resolve_shell(options: &GeneratorOptions) -> PathBuf {
    if let Some(shell) = &options.shell_path {
        return shell.clone();
    }
    find_executable("bash").unwrap_or_else(|| PathBuf::from(DEFAULT_SHELL))
}

/// Write `script` to a temporary file and run it in the build directory.
///
/// Output is handed to `on_line` as it is produced. A nonzero exit, a
/// signal or an expired timeout is returned as the matching
/// [`RiggingError`].
pub fn run_script<F>(script: &str, options: &GeneratorOptions, on_line: F) -> Result<()>
where
    F: FnMut(OutputLine),
{
    let mut file = tempfile::Builder::new()
        .prefix("rigging-")
        .suffix(".sh")
        .tempfile()
        .context("failed to create temporary script file")?;
    file.write_all(script.as_bytes())
        .and_then(|_| file.flush())
        .with_context(|| format!("failed to write script to {}", file.path().display()))?;

    let shell = resolve_shell(options);
    let process = ProcessBuilder::new(&shell)
        .arg(file.path())
        .cwd(options.build_dir());

    tracing::debug!("running `{}`", process.display_command());
    let outcome = process.exec_streaming(options.timeout, on_line)?;
    tracing::debug!("script finished: {:?}", outcome);

    match outcome {
        ProcessOutcome::Exited(0) => Ok(()),
        ProcessOutcome::Exited(code) => Err(RiggingError::ScriptFailed { code }.into()),
        ProcessOutcome::Signaled => Err(RiggingError::ScriptTerminated.into()),
        ProcessOutcome::TimedOut => Err(RiggingError::ScriptTimeout {
            // exec_streaming only times out when a limit was set
            timeout: options.timeout.unwrap_or_default(),
        }
        .into()),
    }
}
