//! Command-line runtime for the plugin packager.
//!
//! The module owns argument parsing, the logging lifecycle, and top-level
//! error reporting. The build itself lives in `plugpack-core`; this crate
//! resolves the plugin directory, loads its manifest, assembles validated
//! build options, and hands them to a [`PluginBuilder`]. Failures are logged
//! with context and turned into a non-zero exit code.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use plugpack_config::{BuildOptions, SourceDirName, resolve_plugin_dir};
use plugpack_core::{BuildArtifacts, PluginBuilder, SystemToolRunner, ToolRunner, load_manifest};
use plugpack_isolation::{ContainerRuntime, DockerCli};
use tracing::{error, info, warn};

mod cli;
mod errors;
pub mod logging;

use cli::Cli;
use errors::AppError;
pub use logging::{LoggingContext, LoggingError, console_level};

/// Tracing target for CLI events.
const CLI_TARGET: &str = "plugpack_cli";

/// Parses `args`, builds the plugin, and reports the outcome.
///
/// Help and version output go to `stdout`; argument errors go to `stderr`.
/// Everything after parsing is reported through the logging context.
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return report_usage(&error, stdout, stderr),
    };

    let logging = LoggingContext::init(cli.verbosity, cli.log_format);
    info!(target: CLI_TARGET, arguments = ?cli, "starting plugin build");

    let builder = PluginBuilder::new(SystemToolRunner, DockerCli::new());
    let outcome = execute(&cli, &logging, &builder);
    let code = match outcome {
        Ok(artifacts) => {
            info!(
                target: CLI_TARGET,
                archive = %artifacts.dist_archive,
                layout = ?artifacts.layout,
                "plugin archive ready"
            );
            ExitCode::SUCCESS
        }
        Err(failure) => {
            error!(target: CLI_TARGET, %failure, "plugpack failed");
            ExitCode::FAILURE
        }
    };
    logging.detach_build_log();
    code
}

fn report_usage<W: Write, E: Write>(
    error: &clap::Error,
    stdout: &mut W,
    stderr: &mut E,
) -> ExitCode {
    let rendered = error.render();
    let written = if error.use_stderr() {
        write!(stderr, "{rendered}")
    } else {
        write!(stdout, "{rendered}")
    };
    if written.is_err() {
        return ExitCode::FAILURE;
    }
    u8::try_from(error.exit_code()).map_or(ExitCode::FAILURE, ExitCode::from)
}

/// Loads the manifest, validates options, and runs the build.
///
/// The build log is attached as soon as the build directory exists, so the
/// log lands inside the directory the build recreates.
fn execute<T, C>(
    cli: &Cli,
    logging: &LoggingContext,
    builder: &PluginBuilder<T, C>,
) -> Result<BuildArtifacts, AppError>
where
    T: ToolRunner,
    C: ContainerRuntime,
{
    let plugin_dir = resolve_plugin_dir(&cli.plugin_path)?;
    let manifest = load_manifest(&plugin_dir)?;
    let source_dir_name = match cli.source_dir.as_deref() {
        Some(name) => SourceDirName::new(name)?,
        None => SourceDirName::for_plugin(manifest.name(), manifest.plugin_type().as_str())?,
    };
    let options = BuildOptions::new(
        cli.build_paths(),
        source_dir_name,
        cli.platform_dependencies,
        cli.verify_hashes(),
    )?
    .with_images(cli.images());

    let artifacts = builder.build_with_hook(&options, &manifest, |build_dir| {
        if let Err(failure) = logging.attach_build_log(build_dir) {
            warn!(target: CLI_TARGET, %failure, "continuing without a build log");
        }
    })?;
    Ok(artifacts)
}

#[cfg(test)]
mod tests;
