//! Validated build configuration for the plugin packager.
//!
//! Everything the build needs to know up front lives here: where the plugin
//! source, scratch build directory, and distribution directory are, which
//! subdirectory holds the importable code, how platform dependencies are
//! packaged, and which container images perform the installs. Values are
//! validated when they are constructed, so a [`BuildOptions`] that exists is
//! safe to splice into paths and container commands.

mod defaults;
mod error;
mod images;
mod logging;
mod options;
mod packaging;
mod source_dir;

pub use defaults::{
    BUILD_LOG_FILENAME, DEFAULT_BUILD_DIR, DEFAULT_DIST_DIR, DEFAULT_LINUX_IMAGE,
    DEFAULT_WINDOWS_IMAGE,
};
pub use error::ConfigError;
pub use images::IsolationImages;
pub use logging::{LogFormat, LogFormatParseError};
pub use options::{BuildOptions, BuildPaths, resolve_plugin_dir};
pub use packaging::PackagingMethod;
pub use source_dir::SourceDirName;
