//! Export of a plugin's lock file into a flat `requirements.txt`.
//!
//! Dependency resolution belongs to the plugin's own tooling. The builder
//! only asks Poetry (or Pipenv as a fallback) to flatten the lock file it
//! finds in the build directory, then checks the result exists.

use std::fmt;
use std::fs::File;
use std::process::Command;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use plugpack_isolation::process::{ProcessError, run_draining};
use tracing::{error, info, warn};

use crate::error::BuildError;

/// Tracing target for requirements export.
const REQUIREMENTS_TARGET: &str = "plugpack_core::requirements";

/// Name of the flattened requirements file written into the build directory.
pub const REQUIREMENTS_FILE: &str = "requirements.txt";

const SUPPLY_CHAIN_WARNING: &str = "Plugin dependencies are not going to be verified. This can \
     allow supply-chain attacks to go unnoticed. A malicious actor could slip bad code into the \
     installation via one of the unverified dependencies.";

/// One invocation of an external export tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    program: String,
    args: Vec<String>,
    working_dir: Utf8PathBuf,
    stdout_path: Option<Utf8PathBuf>,
}

impl ToolCommand {
    /// Creates a command run from `working_dir`.
    #[must_use]
    pub fn new(program: impl Into<String>, working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            stdout_path: None,
        }
    }

    /// Appends arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Redirects the tool's standard output into `path`.
    #[must_use]
    pub fn stdout_to(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.stdout_path = Some(path.into());
        self
    }

    /// Executable name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    /// Directory the tool runs in.
    #[must_use]
    pub fn working_dir(&self) -> &Utf8Path {
        &self.working_dir
    }

    /// File receiving standard output, if redirected.
    #[must_use]
    pub fn stdout_path(&self) -> Option<&Utf8Path> {
        self.stdout_path.as_deref()
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit outcome of an external tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolExit {
    code: Option<i32>,
}

impl ToolExit {
    /// Outcome with the given exit code; `None` means killed by a signal.
    #[must_use]
    pub const fn from_code(code: Option<i32>) -> Self {
        Self { code }
    }

    /// Successful exit.
    #[must_use]
    pub const fn success() -> Self {
        Self { code: Some(0) }
    }

    /// Exit code, if the tool exited normally.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        self.code
    }

    /// Whether the tool exited with code zero.
    #[must_use]
    pub const fn is_success(self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Trait abstracting external tool execution for testability.
///
/// The production implementation is [`SystemToolRunner`].
pub trait ToolRunner {
    /// Runs the tool to completion.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the tool cannot be started or its exit
    /// status cannot be collected. A non-zero exit is reported through
    /// [`ToolExit`], not as an error.
    fn run(&self, command: &ToolCommand) -> Result<ToolExit, BuildError>;
}

/// Runs tools as host child processes, logging their output line by line.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemToolRunner;

impl ToolRunner for SystemToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolExit, BuildError> {
        let mut child = Command::new(command.program());
        child
            .args(command.arguments())
            .current_dir(command.working_dir());

        let capture_stdout = match command.stdout_path() {
            Some(path) => {
                let file = File::create(path).map_err(|source| {
                    BuildError::io(format!("failed to create {path}"), source)
                })?;
                child.stdout(file);
                false
            }
            None => true,
        };

        let drained =
            run_draining(&mut child, command.program(), capture_stdout).map_err(|failure| {
                match failure {
                    ProcessError::Spawn(source) => BuildError::CommandSpawn {
                        command: command.to_string(),
                        source: Arc::new(source),
                    },
                    ProcessError::Wait(source) => {
                        BuildError::io(format!("failed to wait for `{command}`"), source)
                    }
                }
            })?;
        Ok(ToolExit::from_code(drained.status.code()))
    }
}

/// Lock file formats the builder can export from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockFile {
    /// `poetry.lock`, exported with `poetry export`.
    Poetry,
    /// `Pipfile.lock`, exported with `pipenv requirements`.
    Pipenv,
}

impl LockFile {
    /// Lock file name inside the build directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Poetry => "poetry.lock",
            Self::Pipenv => "Pipfile.lock",
        }
    }

    /// Finds the lock file in `build_dir`, preferring Poetry.
    #[must_use]
    pub fn detect(build_dir: &Utf8Path) -> Option<Self> {
        [Self::Poetry, Self::Pipenv]
            .into_iter()
            .find(|lock| build_dir.join(lock.file_name()).is_file())
    }

    /// Command exporting this lock file into [`REQUIREMENTS_FILE`].
    #[must_use]
    pub fn export_command(self, build_dir: &Utf8Path, verify_hashes: bool) -> ToolCommand {
        match self {
            Self::Poetry => {
                let command = ToolCommand::new("poetry", build_dir).args([
                    "export",
                    "-f",
                    REQUIREMENTS_FILE,
                    "-o",
                    REQUIREMENTS_FILE,
                ]);
                if verify_hashes {
                    command
                } else {
                    command.args(["--without-hashes"])
                }
            }
            Self::Pipenv => {
                let command = ToolCommand::new("pipenv", build_dir)
                    .args(["requirements"])
                    .stdout_to(build_dir.join(REQUIREMENTS_FILE));
                if verify_hashes {
                    command.args(["--hash"])
                } else {
                    command
                }
            }
        }
    }
}

/// Exports the build directory's lock file into `requirements.txt`.
///
/// When `verify_hashes` is false the export omits integrity hashes and a
/// supply-chain warning is logged.
///
/// # Errors
///
/// Returns [`BuildError::FileNotFound`] when no lock file is present or the
/// tool reports success without writing `requirements.txt`, and
/// [`BuildError::CommandRun`] when the tool exits unsuccessfully.
pub fn materialize_requirements<R>(
    runner: &R,
    build_dir: &Utf8Path,
    verify_hashes: bool,
) -> Result<Utf8PathBuf, BuildError>
where
    R: ToolRunner + ?Sized,
{
    let Some(lock) = LockFile::detect(build_dir) else {
        let path = build_dir.join(LockFile::Poetry.file_name());
        error!(target: REQUIREMENTS_TARGET, path = %path, "no lock file found in build directory");
        return Err(BuildError::FileNotFound { path });
    };

    info!(target: REQUIREMENTS_TARGET, lock_file = lock.file_name(), "generating requirements file");
    if !verify_hashes {
        warn!(target: REQUIREMENTS_TARGET, "{SUPPLY_CHAIN_WARNING}");
    }

    let command = lock.export_command(build_dir, verify_hashes);
    let exit = runner.run(&command)?;
    if !exit.is_success() {
        error!(target: REQUIREMENTS_TARGET, command = %command, status = ?exit.code(), "requirements export failed");
        return Err(BuildError::CommandRun {
            command: command.to_string(),
            status: exit.code(),
        });
    }

    let requirements = build_dir.join(REQUIREMENTS_FILE);
    if !requirements.is_file() {
        error!(target: REQUIREMENTS_TARGET, path = %requirements, "export succeeded but wrote no requirements file");
        return Err(BuildError::FileNotFound { path: requirements });
    }
    info!(target: REQUIREMENTS_TARGET, path = %requirements, "requirements file generated");
    Ok(requirements)
}
