//! Default values for command-line options.

/// Name of the build directory created in the working directory by default.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// Name of the distribution directory created in the working directory by default.
pub const DEFAULT_DIST_DIR: &str = "dist";

/// Image used for Linux installs and dry runs.
pub const DEFAULT_LINUX_IMAGE: &str = "infectionmonkey/agent-builder:latest";

/// Image with a Wine-hosted Windows Python used for Windows installs.
pub const DEFAULT_WINDOWS_IMAGE: &str = "infectionmonkey/plugin-builder:latest";

/// File name of the per-build log written into the build directory.
pub const BUILD_LOG_FILENAME: &str = "plugin_builder.log";
