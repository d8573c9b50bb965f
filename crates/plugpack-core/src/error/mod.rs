//! Errors raised while building a plugin archive.
//!
//! Precondition failures, external tool failures and I/O failures are kept
//! as distinct variants so callers can tell "could not run" from "ran but
//! left the build incomplete". I/O errors are wrapped in `Arc` to keep the
//! enum small.

use std::io;
use std::sync::Arc;

use camino::Utf8PathBuf;
use plugpack_isolation::IsolationError;
use thiserror::Error;

/// Errors arising while building a plugin.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A file the build depends on is missing.
    #[error("required file not found: {path}")]
    FileNotFound {
        /// Path that was expected to exist.
        path: Utf8PathBuf,
    },

    /// An external tool ran and exited unsuccessfully.
    #[error("command `{command}` failed with {}", display_status(.status))]
    CommandRun {
        /// Command line that was run.
        command: String,
        /// Exit code, if the tool exited normally.
        status: Option<i32>,
    },

    /// An external tool could not be started.
    #[error("failed to start `{command}`: {source}")]
    CommandSpawn {
        /// Command line that was attempted.
        command: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A manifest named an operating system the builder has no installer for.
    #[error("unsupported operating system '{name}'")]
    UnsupportedOperatingSystem {
        /// Name found in the manifest.
        name: String,
    },

    /// A filesystem operation failed.
    #[error("{context}: {source}")]
    Io {
        /// What was being done.
        context: String,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },

    /// A containerised install or dry run failed.
    #[error(transparent)]
    Isolation(#[from] IsolationError),

    /// The plugin manifest is missing required data or is malformed.
    #[error("invalid manifest {path}: {message}")]
    Manifest {
        /// Manifest file that was read.
        path: Utf8PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// A dry-run installation report could not be read.
    #[error("invalid package report {path}: {message}")]
    PackageReport {
        /// Report file that was read.
        path: Utf8PathBuf,
        /// Description of the problem.
        message: String,
    },

    /// The configuration schema could not be produced.
    #[error("failed to produce config schema: {message}")]
    Schema {
        /// Description of the problem.
        message: String,
    },

    /// Clearing the build directory would delete the plugin source.
    #[error("build directory {build_dir} contains the plugin directory {plugin_dir}")]
    BuildDirContainsPlugin {
        /// Directory that would be cleared.
        build_dir: Utf8PathBuf,
        /// Plugin directory inside it.
        plugin_dir: Utf8PathBuf,
    },

    /// Copying a file onto itself would truncate it.
    #[error("{path} is already in the distribution directory")]
    SameFile {
        /// File that was both source and destination.
        path: Utf8PathBuf,
    },

    /// Writing an archive failed.
    #[error("failed to write archive {path}: {source}")]
    Archive {
        /// Archive being written.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: Arc<io::Error>,
    },
}

impl BuildError {
    /// Wraps an I/O error with a description of the failed operation.
    #[must_use]
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source: Arc::new(source),
        }
    }

    /// Wraps an I/O error raised while writing `path` as an archive.
    #[must_use]
    pub fn archive(path: impl Into<Utf8PathBuf>, source: io::Error) -> Self {
        Self::Archive {
            path: path.into(),
            source: Arc::new(source),
        }
    }
}

fn display_status(status: &Option<i32>) -> String {
    status.map_or_else(
        || String::from("no exit code"),
        |code| format!("exit code {code}"),
    )
}
