//! Subprocess execution utilities.

use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

/// How often a streaming run checks for exit and timeout while idle.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// How long buffered output is still collected after the child exits.
/// Descendants that outlive the child can hold its pipes open indefinitely.
const EXIT_DRAIN_GRACE: Duration = Duration::from_millis(500);

/// Which stream a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of child output, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
}

/// How a streamed process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The process exited with this code.
    Exited(i32),
    /// The process was killed by a signal it did not handle.
    Signaled,
    /// The time limit expired and the process was killed.
    TimedOut,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        matches!(self, ProcessOutcome::Exited(0))
    }

    fn from_status(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ProcessOutcome::Exited(code),
            None => ProcessOutcome::Signaled,
        }
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Run the process, handing each output line to `on_line` as soon as it
    /// is produced.
    ///
    /// With a `timeout`, the process is killed once the limit expires and
    /// [`ProcessOutcome::TimedOut`] is returned.
    pub fn exec_streaming<F>(&self, timeout: Option<Duration>, mut on_line: F) -> Result<ProcessOutcome>
    where
        F: FnMut(OutputLine),
    {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.display_command()))?;

        let (tx, rx) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_reader(stdout, OutputStream::Stdout, tx.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_reader(stderr, OutputStream::Stderr, tx.clone());
        }
        drop(tx);

        let deadline = timeout.map(|t| Instant::now() + t);
        let mut readers_done = false;

        loop {
            if readers_done {
                thread::sleep(POLL_INTERVAL);
            } else {
                match rx.recv_timeout(POLL_INTERVAL) {
                    Ok(line) => on_line(line),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => readers_done = true,
                }
            }

            let status = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.display_command()))?;
            if let Some(status) = status {
                let drain_until = match deadline {
                    Some(d) => d.min(Instant::now() + EXIT_DRAIN_GRACE),
                    None => Instant::now() + EXIT_DRAIN_GRACE,
                };
                drain_until_deadline(&rx, drain_until, &mut on_line);
                return Ok(ProcessOutcome::from_status(status));
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                tracing::debug!("killing `{}` after timeout", self.display_command());
                let _ = child.kill();
                let _ = child.wait();
                for line in rx.try_iter() {
                    on_line(line);
                }
                return Ok(ProcessOutcome::TimedOut);
            }
        }
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

/// Hand queued lines to `on_line` until the readers finish or `until` passes.
fn drain_until_deadline<F>(rx: &Receiver<OutputLine>, until: Instant, on_line: &mut F)
where
    F: FnMut(OutputLine),
{
    loop {
        let remaining = until.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(line) => on_line(line),
            Err(_) => return,
        }
    }
}

/// Forward `reader` line by line into `tx` until EOF.
fn spawn_reader<R>(reader: R, stream: OutputStream, tx: Sender<OutputLine>)
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.trim_end_matches(['\n', '\r']).to_string();
                    if tx.send(OutputLine { stream, line }).is_err() {
                        break;
                    }
                }
            }
        }
    });
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}
