//! Subprocess execution utilities.
//!
//! Every external tool (compiler wrapper, host compiler, size probe,
//! generator) is launched through [`ProcessBuilder`] with an explicit argument
//! list. No shell is involved, so paths with spaces or quotes need no escaping.

use std::ffi::OsStr;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Output, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use crate::error::ConfigureError;

/// How often a running child is polled while a timeout is armed.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Bound how long the child may run. `None` waits indefinitely.
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion.
    ///
    /// Stdout and stderr are captured. If a timeout is set and expires, the
    /// child is killed and [`ConfigureError::Timeout`] is returned.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        tracing::debug!("running `{}`", self.display_command());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let Some(timeout) = self.timeout else {
            return child
                .wait_with_output()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()));
        };

        // Drain both pipes while polling so a chatty child cannot block on a
        // full pipe buffer before the deadline. A background process that
        // inherited the pipes keeps them open past the child's exit, so the
        // drain is bounded by the same deadline.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let deadline = Instant::now() + timeout;
        let status = self.wait_until(&mut child, deadline)?;

        Ok(Output {
            status,
            stdout: self.collect(&stdout, deadline)?,
            stderr: self.collect(&stderr, deadline)?,
        })
    }

    fn wait_until(&self, child: &mut Child, deadline: Instant) -> Result<ExitStatus> {
        loop {
            if let Some(status) = child
                .try_wait()
                .with_context(|| format!("failed to wait for `{}`", self.program.display()))?
            {
                return Ok(status);
            }

            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Err(self.timed_out());
            }

            thread::sleep(POLL_INTERVAL);
        }
    }

    fn collect(&self, pipe: &Receiver<Vec<u8>>, deadline: Instant) -> Result<Vec<u8>> {
        match pipe.recv_timeout(deadline.saturating_duration_since(Instant::now())) {
            Ok(bytes) => Ok(bytes),
            Err(RecvTimeoutError::Timeout) => Err(self.timed_out()),
            Err(RecvTimeoutError::Disconnected) => Ok(Vec::new()),
        }
    }

    fn timed_out(&self) -> anyhow::Error {
        let seconds = self.timeout.map(|t| t.as_secs()).unwrap_or_default();
        tracing::debug!("`{}` timed out after {}s", self.display_command(), seconds);
        ConfigureError::Timeout {
            command: self.display_command(),
            seconds,
        }
        .into()
    }

    /// Execute and require success.
    ///
    /// A non-zero exit becomes [`ConfigureError::ProcessFailed`] carrying the
    /// child's exit status, so it can be propagated unchanged.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            return Err(ConfigureError::ProcessFailed {
                command: self.display_command(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(output)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<Vec<u8>> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(buf);
    });
    rx
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Resolve a program named on the command line or in config.
///
/// Names with a directory part are taken as paths and anchored to the current
/// directory; bare names are looked up on PATH, falling back to the bare name
/// so the spawn error names it.
pub fn resolve_program(name: &Path) -> PathBuf {
    if name.components().count() > 1 {
        return absolute_program(name);
    }
    name.to_str()
        .and_then(find_executable)
        .unwrap_or_else(|| name.to_path_buf())
}

/// Anchor a relative program path such as `./mpicc` to the current directory.
///
/// Children started with a different working directory would otherwise look
/// the program up relative to that directory. Bare names are left for PATH.
pub fn absolute_program(program: &Path) -> PathBuf {
    if program.is_absolute() || program.components().count() < 2 {
        return program.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(program))
        .unwrap_or_else(|_| program.to_path_buf())
}
