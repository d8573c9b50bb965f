//! Domain errors raised while running isolated containers.

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors raised while preparing or running a container.
#[derive(Debug, Error)]
pub enum IsolationError {
    /// The container client could not be started.
    #[error("failed to start container client {program}: {source}")]
    SpawnFailed {
        /// Client executable that was invoked.
        program: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Waiting on the container client failed.
    #[error("failed while waiting for container {image}: {source}")]
    Wait {
        /// Image the container was started from.
        image: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The containerised script exited unsuccessfully.
    #[error("container {image} exited with status {}: {output}", display_status(.status))]
    ContainerFailed {
        /// Image the container was started from.
        image: String,
        /// Exit code, absent when the client was killed by a signal.
        status: Option<i32>,
        /// Captured stdout and stderr of the run.
        output: String,
    },

    /// The host directory cannot be expressed as a volume binding.
    #[error("cannot mount {path} into a container: {reason}")]
    InvalidMount {
        /// Host directory that was rejected.
        path: Utf8PathBuf,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// A value could not be quoted for the shell.
    #[error("value {value:?} cannot be quoted for a shell script")]
    Quote {
        /// The offending value.
        value: String,
    },
}

fn display_status(status: &Option<i32>) -> String {
    status.map_or_else(|| String::from("<signal>"), |code| code.to_string())
}
