// src/system/executor.rs

//! Process launching with output streaming and cancellation.

use crate::{CancellationToken, models::HostKind};
use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command as StdCommand, ExitStatus, Stdio};
use std::sync::Mutex;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use thiserror::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(50);

// A freshly copied executable can still be open for writing in a forked sibling.
const SPAWN_BUSY_RETRIES: u32 = 5;
const ETXTBSY: i32 = 26;

/// Failures while starting or waiting for a process.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, #[source] io::Error),
    #[error("Lost track of command '{0}': {1}")]
    WaitFailed(String, #[source] io::Error),
    #[error("Command '{command}' exited with non-zero code {code}.")]
    NonZeroExitStatus { command: String, code: i32 },
    #[error("Command '{command}' produced output that was not valid UTF-8")]
    InvalidUtf8Output {
        command: String,
        #[source]
        source: std::string::FromUtf8Error,
    },
    #[error("Operation was cancelled by the user.")]
    Cancelled,
}

/// A fully assembled process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    /// Executable to start.
    pub program: PathBuf,
    /// Arguments, passed as-is.
    pub args: Vec<String>,
    /// Working directory of the child.
    pub cwd: PathBuf,
    /// The complete environment of the child. Nothing is inherited.
    pub env: HashMap<String, String>,
}

impl ProcessSpec {
    /// Program and arguments joined with spaces, for messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Starts processes on the host and keeps them interruptible.
#[derive(Debug, Clone)]
pub struct Launcher {
    host: HostKind,
    cancellation_token: CancellationToken,
}

impl Launcher {
    /// Launcher that treats processes as running on `host`.
    pub fn new(host: HostKind, cancellation_token: CancellationToken) -> Self {
        Self {
            host,
            cancellation_token,
        }
    }

    /// Launcher for the host this binary runs on.
    pub fn for_current_host(cancellation_token: CancellationToken) -> Self {
        Self::new(HostKind::current(), cancellation_token)
    }

    /// Host kind used for platform decisions.
    pub fn host(&self) -> HostKind {
        self.host
    }

    /// Whether the host is Unix-like.
    pub fn is_unix(&self) -> bool {
        self.host == HostKind::Unix
    }

    /// Token checked while waiting for a child.
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation_token.load(Ordering::SeqCst)
    }

    /// Runs a short command and captures its standard output.
    /// Stderr is discarded. Only checks for cancellation *before* starting.
    pub fn capture(&self, command: &[String]) -> Result<String, ExecutionError> {
        if self.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let (program, args) = command.split_first().ok_or(ExecutionError::EmptyCommand)?;
        let command_line = command.join(" ");

        let output = StdCommand::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

        if !output.status.success() {
            return Err(ExecutionError::NonZeroExitStatus {
                command: command_line,
                code: exit_code(output.status),
            });
        }

        String::from_utf8(output.stdout).map_err(|e| ExecutionError::InvalidUtf8Output {
            command: command_line,
            source: e,
        })
    }

    /// Spawns `spec`, streams its stdout and stderr into `sink` and blocks until it exits.
    ///
    /// Returns the exit code; a non-zero code is not an error at this level. If the
    /// cancellation token is set while waiting, the child is killed and
    /// [`ExecutionError::Cancelled`] is returned. On Unix the child leads its own process
    /// group, and cancelling kills the whole group so nothing it started keeps the output
    /// pipes open.
    pub fn launch(
        &self,
        spec: &ProcessSpec,
        sink: &mut (dyn Write + Send),
    ) -> Result<i32, ExecutionError> {
        if self.is_cancelled() {
            return Err(ExecutionError::Cancelled);
        }

        let command_line = spec.command_line();
        log::debug!("Launching: {}", command_line);

        let mut command = StdCommand::new(&spec.program);
        command
            .args(&spec.args)
            .current_dir(dunce::simplified(&spec.cwd))
            .env_clear()
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut child = spawn(&mut command)
            .map_err(|e| ExecutionError::CommandFailed(command_line.clone(), e))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();
        let sink = Mutex::new(sink);

        thread::scope(|scope| {
            let sink = &sink;
            if let Some(out) = stdout {
                scope.spawn(move || pump(out, sink));
            }
            if let Some(err) = stderr {
                scope.spawn(move || pump(err, sink));
            }
            self.wait_for_exit(&mut child, &command_line)
        })
    }

    // Non-blocking wait loop to allow for cancellation.
    fn wait_for_exit(&self, child: &mut Child, command_line: &str) -> Result<i32, ExecutionError> {
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(exit_code(status)),
                Ok(None) => {
                    if self.is_cancelled() {
                        log::debug!(
                            "Cancellation requested, killing child process (PID: {})...",
                            child.id()
                        );
                        if let Err(e) = kill_process_tree(child) {
                            log::warn!("Failed to kill child process {}: {}", child.id(), e);
                        }
                        child.wait().ok();
                        return Err(ExecutionError::Cancelled);
                    }
                    thread::sleep(POLL_INTERVAL);
                }
                Err(e) => return Err(ExecutionError::WaitFailed(command_line.to_string(), e)),
            }
        }
    }
}

fn spawn(command: &mut StdCommand) -> io::Result<Child> {
    let mut attempt = 0;
    loop {
        match command.spawn() {
            Err(e)
                if cfg!(unix)
                    && e.raw_os_error() == Some(ETXTBSY)
                    && attempt < SPAWN_BUSY_RETRIES =>
            {
                attempt += 1;
                log::debug!("Executable busy, retrying spawn (attempt {}).", attempt);
                thread::sleep(POLL_INTERVAL);
            }
            result => return result,
        }
    }
}

/// Kills the child's process group, falling back to the child alone.
#[cfg(unix)]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let pid = i32::try_from(child.id()).map_err(io::Error::other)?;
    match killpg(Pid::from_raw(pid), Signal::SIGKILL) {
        Ok(()) => Ok(()),
        Err(e) => {
            log::debug!("Failed to kill process group {}: {}", pid, e);
            child.kill()
        }
    }
}

#[cfg(not(unix))]
fn kill_process_tree(child: &mut Child) -> io::Result<()> {
    child.kill()
}

/// Copies everything `reader` produces into the shared sink until EOF.
fn pump<R: Read>(mut reader: R, sink: &Mutex<&mut (dyn Write + Send)>) {
    let mut buffer = [0u8; 8192];
    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => return,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                log::warn!("Failed to read process output: {}", e);
                return;
            }
        };
        let chunk = buffer.get(..read).unwrap_or_default();
        let written = match sink.lock() {
            Ok(mut guard) => guard.write_all(chunk).and_then(|_| guard.flush()),
            Err(_) => Err(io::Error::other("output sink lock poisoned")),
        };
        if let Err(e) = written {
            // Keep draining so the child never blocks on a full pipe.
            log::warn!("Failed to forward process output: {}", e);
        }
    }
}

/// Exit code of a finished process. Signals map to `128 + signal` on Unix.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}
