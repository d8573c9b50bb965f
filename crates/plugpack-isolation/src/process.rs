//! Child process execution with line-by-line output draining.
//!
//! External tools (the container client, lock-file exporters) can produce a
//! lot of output. [`run_draining`] reads both pipes while the child runs and
//! forwards every line to `tracing` at debug level, so a full pipe buffer
//! never stalls the child.

use std::io::{self, BufRead, BufReader, Read};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;

use thiserror::Error;
use tracing::dispatcher::{self, Dispatch};
use tracing::{debug, warn};

/// Tracing target for child process output.
const PROCESS_TARGET: &str = "plugpack_isolation::process";

/// Exit status and captured output of a drained child process.
#[derive(Debug)]
pub struct DrainedOutput {
    /// Exit status reported by the child.
    pub status: ExitStatus,
    /// Captured stdout followed by captured stderr.
    pub output: Vec<u8>,
}

/// Failure to start or reap a child process.
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The child could not be spawned.
    #[error("failed to spawn process: {0}")]
    Spawn(#[source] io::Error),
    /// Waiting for the child to exit failed.
    #[error("failed to wait for process: {0}")]
    Wait(#[source] io::Error),
}

/// Spawns `command`, drains its piped output, and waits for it to exit.
///
/// Stdin is closed. Stderr is always piped. Stdout is piped unless the caller
/// already redirected it (for example into a file), in which case pass
/// `capture_stdout = false`.
///
/// # Errors
///
/// Returns [`ProcessError::Spawn`] if the child cannot be started and
/// [`ProcessError::Wait`] if its exit status cannot be collected.
pub fn run_draining(
    command: &mut Command,
    label: &str,
    capture_stdout: bool,
) -> Result<DrainedOutput, ProcessError> {
    command.stdin(Stdio::null()).stderr(Stdio::piped());
    if capture_stdout {
        command.stdout(Stdio::piped());
    }

    let mut child = command.spawn().map_err(ProcessError::Spawn)?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    // Scoped subscribers are thread-local; carry the caller's into the reader.
    let dispatch = dispatcher::get_default(Dispatch::clone);
    let (mut output, errors) = thread::scope(|scope| {
        let stderr_reader =
            scope.spawn(|| dispatcher::with_default(&dispatch, || drain_lines(label, stderr)));
        let captured = drain_lines(label, stdout);
        let errors = stderr_reader.join().unwrap_or_default();
        (captured, errors)
    });

    let status = child.wait().map_err(ProcessError::Wait)?;
    output.extend_from_slice(&errors);
    debug!(target: PROCESS_TARGET, source = label, ?status, "process exited");
    Ok(DrainedOutput { status, output })
}

/// Reads a pipe to exhaustion, logging each line as it arrives.
fn drain_lines(label: &str, pipe: Option<impl Read>) -> Vec<u8> {
    let Some(stream) = pipe else {
        return Vec::new();
    };

    let mut reader = BufReader::new(stream);
    let mut captured = Vec::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                debug!(
                    target: PROCESS_TARGET,
                    source = label,
                    "{}",
                    String::from_utf8_lossy(&line).trim_end()
                );
                captured.extend_from_slice(&line);
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, source = label, %error, "stopped reading process output");
                break;
            }
        }
    }
    captured
}
