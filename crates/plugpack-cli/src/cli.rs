//! Command-line argument definitions for the plugin packager.

use std::path::PathBuf;

use clap::{ArgAction, Parser};
use plugpack_config::{
    BuildPaths, DEFAULT_BUILD_DIR, DEFAULT_DIST_DIR, DEFAULT_LINUX_IMAGE, DEFAULT_WINDOWS_IMAGE,
    IsolationImages, LogFormat, PackagingMethod,
};

/// Builds a distributable archive from an agent plugin directory.
#[derive(Parser, Debug)]
#[command(name = "plugpack", version)]
pub(crate) struct Cli {
    /// Directory containing the plugin manifest and source.
    #[arg(value_name = "PLUGIN_PATH")]
    pub(crate) plugin_path: PathBuf,
    /// Scratch directory recreated for the build.
    #[arg(short = 'b', long, value_name = "DIR", default_value = DEFAULT_BUILD_DIR)]
    pub(crate) build_dir_path: PathBuf,
    /// Directory receiving the finished plugin archive.
    #[arg(short = 'd', long, value_name = "DIR", default_value = DEFAULT_DIST_DIR)]
    pub(crate) dist_dir_path: PathBuf,
    /// Plugin subdirectory holding importable code.
    /// Defaults to `<name>_<type>` from the manifest, lowercased.
    #[arg(short = 's', long = "source-dir", value_name = "NAME")]
    pub(crate) source_dir: Option<String>,
    /// How third-party dependencies are packaged for each platform.
    #[arg(long, value_enum, default_value_t = PackagingMethod::Autodetect)]
    pub(crate) platform_dependencies: PackagingMethod,
    /// Export requirements with integrity hashes (default).
    #[arg(long, overrides_with = "no_verify")]
    verify: bool,
    /// Export requirements without integrity hashes.
    #[arg(long = "no-verify", overrides_with = "verify")]
    no_verify: bool,
    /// Console verbosity; repeat to select a level.
    #[arg(short = 'v', action = ArgAction::Count)]
    pub(crate) verbosity: u8,
    /// Console log format.
    #[arg(long, value_name = "FORMAT", default_value_t = LogFormat::Compact)]
    pub(crate) log_format: LogFormat,
    /// Image used for Linux dry runs and installs.
    #[arg(long, value_name = "IMAGE", default_value = DEFAULT_LINUX_IMAGE)]
    linux_image: String,
    /// Image used for Windows dry runs and installs.
    #[arg(long, value_name = "IMAGE", default_value = DEFAULT_WINDOWS_IMAGE)]
    windows_image: String,
}

impl Cli {
    /// Whether requirements are exported with hashes; the last flag wins.
    pub(crate) const fn verify_hashes(&self) -> bool {
        self.verify || !self.no_verify
    }

    pub(crate) fn build_paths(&self) -> BuildPaths {
        BuildPaths {
            plugin_dir: self.plugin_path.clone(),
            build_dir: self.build_dir_path.clone(),
            dist_dir: self.dist_dir_path.clone(),
        }
    }

    pub(crate) fn images(&self) -> IsolationImages {
        IsolationImages::new(&self.linux_image, &self.windows_image)
    }
}
