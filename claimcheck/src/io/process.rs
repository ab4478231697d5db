//! Bounded child-process execution shared by the git and test probes.

use std::io::{self, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};
use wait_timeout::ChildExt;

/// Why a probe command produced no usable output.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("executable `{program}` not found")]
    Missing { program: String },
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("`{program}` timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },
    #[error("`{program}` exited with code {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
    #[error("i/o error while running `{program}`: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

/// Captured child process output.
#[derive(Debug)]
pub struct CommandOutput {
    pub status: ExitStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub stdout_truncated: usize,
    pub stderr_truncated: usize,
}

impl CommandOutput {
    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    /// Treat a non-zero exit as [`ProbeError::Failed`].
    pub fn into_success(self, program: &str) -> Result<Self, ProbeError> {
        if self.status.success() {
            return Ok(self);
        }
        Err(ProbeError::Failed {
            program: program.to_string(),
            code: self.status.code(),
            stderr: self.stderr_lossy().trim().to_string(),
        })
    }
}

/// Run a command with a timeout and capture stdout/stderr without risking pipe deadlocks.
///
/// Output is read concurrently while the child runs. `output_limit_bytes` bounds the amount of
/// stdout/stderr stored in memory (bytes beyond this are discarded while still draining the pipe).
/// A child that outlives `timeout` is killed and reported as [`ProbeError::TimedOut`]; a non-zero
/// exit is returned as `Ok` for the caller to interpret.
#[instrument(skip_all, fields(program = %program_name(&cmd), timeout_secs = timeout.as_secs()))]
pub fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    output_limit_bytes: usize,
) -> Result<CommandOutput, ProbeError> {
    let program = program_name(&cmd);
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(err = %e, "executable not found");
            return Err(ProbeError::Missing { program });
        }
        Err(e) => {
            warn!(err = %e, "failed to spawn command");
            return Err(ProbeError::Spawn { program, source: e });
        }
    };

    let io_err = |source: io::Error| ProbeError::Io {
        program: program.clone(),
        source,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| io_err(io::Error::other("stdout was not piped")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| io_err(io::Error::other("stderr was not piped")))?;

    let stdout_handle = thread::spawn(move || read_stream_limited(stdout, output_limit_bytes));
    let stderr_handle = thread::spawn(move || read_stream_limited(stderr, output_limit_bytes));

    let status = match child.wait_timeout(timeout).map_err(io_err)? {
        Some(status) => status,
        None => {
            warn!(
                timeout_secs = timeout.as_secs(),
                "command timed out, killing"
            );
            child.kill().map_err(io_err)?;
            child.wait().map_err(io_err)?;
            // Partial output is discarded. The reader threads are detached rather than
            // joined: grandchildren may still hold the pipes open.
            drop(stdout_handle);
            drop(stderr_handle);
            return Err(ProbeError::TimedOut {
                program,
                secs: timeout.as_secs(),
            });
        }
    };

    let (stdout, stdout_truncated) = join_output(stdout_handle).map_err(io_err)?;
    let (stderr, stderr_truncated) = join_output(stderr_handle).map_err(io_err)?;

    if stdout_truncated > 0 || stderr_truncated > 0 {
        warn!(stdout_truncated, stderr_truncated, "output truncated");
    }

    debug!(exit_code = ?status.code(), "command finished");
    Ok(CommandOutput {
        status,
        stdout,
        stderr,
        stdout_truncated,
        stderr_truncated,
    })
}

fn program_name(cmd: &Command) -> String {
    cmd.get_program().to_string_lossy().into_owned()
}

type ReaderHandle = thread::JoinHandle<io::Result<(Vec<u8>, usize)>>;

fn join_output(handle: ReaderHandle) -> io::Result<(Vec<u8>, usize)> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(io::Error::other("output reader thread panicked")),
    }
}

fn read_stream_limited<R: Read>(mut reader: R, limit: usize) -> io::Result<(Vec<u8>, usize)> {
    let mut buf = Vec::new();
    let mut truncated = 0usize;
    let mut chunk = [0u8; 8192];

    loop {
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        let remaining = limit.saturating_sub(buf.len());
        if remaining > 0 {
            let keep = n.min(remaining);
            buf.extend_from_slice(&chunk[..keep]);
            truncated += n.saturating_sub(keep);
        } else {
            truncated += n;
        }
    }

    Ok((buf, truncated))
}
