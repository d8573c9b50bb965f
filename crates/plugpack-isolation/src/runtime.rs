//! Container runtimes that execute [`ContainerRun`] descriptions.

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info};

use crate::error::IsolationError;
use crate::process::{ProcessError, run_draining};
use crate::run::ContainerRun;

/// Tracing target for container operations.
const CONTAINER_TARGET: &str = "plugpack_isolation::runtime";

/// Default container client executable, resolved through `PATH`.
const DOCKER_PROGRAM: &str = "docker";

/// Captured output of a finished container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerOutput(Vec<u8>);

impl ContainerOutput {
    /// Wraps raw output bytes.
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw output bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the output decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// Trait abstracting container execution for testability.
///
/// The production implementation is [`DockerCli`]. Test code implements this
/// trait to record runs without starting containers.
pub trait ContainerRuntime {
    /// Runs the container to completion and returns its captured output.
    ///
    /// Implementations must block until the container has been removed.
    ///
    /// # Errors
    ///
    /// Returns an [`IsolationError`] if the run cannot be started or the
    /// script exits unsuccessfully.
    fn run(&self, run: &ContainerRun) -> Result<ContainerOutput, IsolationError>;
}

/// Runs containers through the `docker` command-line client.
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: PathBuf,
}

impl DockerCli {
    /// Uses the `docker` executable found on `PATH`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_program(DOCKER_PROGRAM)
    }

    /// Uses a specific client executable, for example `podman`.
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Returns the client executable.
    #[must_use]
    pub fn program(&self) -> &Path {
        &self.program
    }
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerRuntime for DockerCli {
    fn run(&self, run: &ContainerRun) -> Result<ContainerOutput, IsolationError> {
        let args = run.client_args()?;
        info!(
            target: CONTAINER_TARGET,
            image = run.image(),
            mount = %run.mount(),
            "starting container"
        );
        debug!(target: CONTAINER_TARGET, script = run.script(), "container script");

        let mut command = Command::new(&self.program);
        command.args(&args);
        let drained =
            run_draining(&mut command, run.image(), true).map_err(|error| match error {
                ProcessError::Spawn(source) => IsolationError::SpawnFailed {
                    program: self.program.clone(),
                    source,
                },
                ProcessError::Wait(source) => IsolationError::Wait {
                    image: run.image().to_owned(),
                    source,
                },
            })?;

        if !drained.status.success() {
            return Err(IsolationError::ContainerFailed {
                image: run.image().to_owned(),
                status: drained.status.code(),
                output: String::from_utf8_lossy(&drained.output).into_owned(),
            });
        }

        Ok(ContainerOutput::new(drained.output))
    }
}
