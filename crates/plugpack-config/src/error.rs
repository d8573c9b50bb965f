//! Errors raised while validating build configuration.

use std::io;
use std::path::PathBuf;

use camino::Utf8PathBuf;
use thiserror::Error;

/// Validation failures for build options.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The source directory name is unsafe to use in paths or scripts.
    #[error("invalid source directory name {name:?}: {reason}")]
    InvalidSourceDirName {
        /// Rejected value.
        name: String,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// The plugin directory path failed path-safety validation.
    #[error("invalid plugin directory {path}: {reason}")]
    InvalidPluginDir {
        /// Rejected path.
        path: PathBuf,
        /// Why the path was rejected.
        reason: String,
    },

    /// The plugin directory does not exist or is not a directory.
    #[error("plugin directory {path} does not exist")]
    PluginDirNotFound {
        /// Path that was checked.
        path: Utf8PathBuf,
    },

    /// A build or dist directory path is unsafe to use.
    #[error("invalid output directory {path}: {reason}")]
    InvalidOutputDir {
        /// Rejected path.
        path: PathBuf,
        /// Why the path was rejected.
        reason: &'static str,
    },

    /// Wiping the build directory would delete the plugin source.
    #[error("build directory {build_dir} contains the plugin directory {plugin_dir}")]
    BuildDirContainsPlugin {
        /// Requested build directory.
        build_dir: Utf8PathBuf,
        /// Plugin directory inside it.
        plugin_dir: Utf8PathBuf,
    },

    /// A path is not valid UTF-8.
    #[error("path {0} is not valid UTF-8")]
    NonUtf8Path(PathBuf),

    /// A relative path could not be made absolute.
    #[error("failed to resolve {path}: {source}")]
    Resolve {
        /// Path that was resolved.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
}
