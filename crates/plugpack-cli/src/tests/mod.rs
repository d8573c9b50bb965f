//! Argument parsing and end-to-end CLI runs against in-process fakes.

use std::cell::RefCell;
use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use plugpack_config::{
    BUILD_LOG_FILENAME, DEFAULT_LINUX_IMAGE, DEFAULT_WINDOWS_IMAGE, LogFormat, PackagingMethod,
};
use plugpack_core::requirements::REQUIREMENTS_FILE;
use plugpack_core::{BuildError, PluginBuilder, ToolCommand, ToolExit, ToolRunner, VendorLayout};
use plugpack_isolation::{ContainerOutput, ContainerRun, ContainerRuntime, IsolationError};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use crate::cli::Cli;
use crate::errors::AppError;
use crate::logging::LoggingContext;
use crate::{execute, run};

/// Export tool double that writes a one-line requirements file.
struct ExportingTools;

impl ToolRunner for ExportingTools {
    fn run(&self, command: &ToolCommand) -> Result<ToolExit, BuildError> {
        fs::write(
            command.working_dir().join(REQUIREMENTS_FILE),
            "requests==2.31.0\n",
        )
        .map_err(|source| BuildError::io("write requirements", source))?;
        Ok(ToolExit::success())
    }
}

/// Container runtime double that records images and succeeds.
#[derive(Default)]
struct RecordingRuntime {
    images: RefCell<Vec<String>>,
}

impl ContainerRuntime for RecordingRuntime {
    fn run(&self, run: &ContainerRun) -> Result<ContainerOutput, IsolationError> {
        self.images.borrow_mut().push(run.image().to_owned());
        Ok(ContainerOutput::default())
    }
}

struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    fn plugin(&self) -> Utf8PathBuf {
        self.root.join("plugin")
    }

    fn args(&self, extra: &[&str]) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "plugpack".into(),
            self.plugin().as_str().into(),
            "-b".into(),
            self.root.join("build").as_str().into(),
            "-d".into(),
            self.root.join("dist").as_str().into(),
        ];
        args.extend(extra.iter().map(OsString::from));
        args
    }
}

#[fixture]
fn workspace() -> Workspace {
    let dir = TempDir::new().expect("temp dir");
    let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf8 temp dir");
    write_plugin(&root.join("plugin"));
    Workspace { _dir: dir, root }
}

fn write_plugin(plugin: &Utf8Path) {
    fs::create_dir_all(plugin.join("mock1_exploiter")).expect("create source dir");
    fs::write(
        plugin.join("manifest.yaml"),
        "name: Mock1\nplugin_type: Exploiter\nsupported_operating_systems:\n  - linux\n  - windows\nversion: 1.0.0\n",
    )
    .expect("write manifest");
    fs::write(plugin.join("poetry.lock"), "").expect("write lock");
    fs::write(plugin.join("mock1_exploiter/plugin.py"), "def run(): pass\n")
        .expect("write plugin module");
}

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("plugpack").chain(args.iter().copied()))
        .expect("arguments should parse")
}

#[test]
fn defaults_apply_when_only_the_plugin_path_is_given() {
    let cli = parse(&["plugin"]);

    assert_eq!(cli.plugin_path, PathBuf::from("plugin"));
    assert_eq!(cli.build_dir_path, PathBuf::from("build"));
    assert_eq!(cli.dist_dir_path, PathBuf::from("dist"));
    assert_eq!(cli.source_dir, None);
    assert_eq!(cli.platform_dependencies, PackagingMethod::Autodetect);
    assert!(cli.verify_hashes());
    assert_eq!(cli.verbosity, 0);
    assert_eq!(cli.log_format, LogFormat::Compact);
    assert_eq!(cli.images().linux(), DEFAULT_LINUX_IMAGE);
    assert_eq!(cli.images().windows(), DEFAULT_WINDOWS_IMAGE);
}

#[test]
fn every_option_is_parsed() {
    let cli = parse(&[
        "plugin",
        "-b",
        "out/build",
        "-d",
        "out/dist",
        "-s",
        "custom_src",
        "--platform-dependencies",
        "separate",
        "--no-verify",
        "-vvv",
        "--log-format",
        "json",
        "--linux-image",
        "linux:test",
        "--windows-image",
        "windows:test",
    ]);

    let paths = cli.build_paths();
    assert_eq!(paths.build_dir, PathBuf::from("out/build"));
    assert_eq!(paths.dist_dir, PathBuf::from("out/dist"));
    assert_eq!(cli.source_dir.as_deref(), Some("custom_src"));
    assert_eq!(cli.platform_dependencies, PackagingMethod::Separate);
    assert!(!cli.verify_hashes());
    assert_eq!(cli.verbosity, 3);
    assert_eq!(cli.log_format, LogFormat::Json);
    assert_eq!(cli.images().linux(), "linux:test");
    assert_eq!(cli.images().windows(), "windows:test");
}

#[rstest]
#[case::verify_last(&["plugin", "--no-verify", "--verify"], true)]
#[case::no_verify_last(&["plugin", "--verify", "--no-verify"], false)]
fn last_verification_flag_wins(#[case] args: &[&str], #[case] expected: bool) {
    assert_eq!(parse(args).verify_hashes(), expected);
}

#[rstest]
#[case::uppercase("COMMON")]
#[case::unknown("invalid")]
#[case::empty("")]
fn unknown_packaging_methods_are_rejected(#[case] method: &str) {
    let result = Cli::try_parse_from(["plugpack", "plugin", "--platform-dependencies", method]);
    assert!(result.is_err());
}

#[test]
fn help_is_written_to_stdout() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let exit = run(["plugpack", "--help"].map(OsString::from), &mut stdout, &mut stderr);

    assert_eq!(exit, ExitCode::SUCCESS);
    assert!(String::from_utf8_lossy(&stdout).contains("PLUGIN_PATH"));
    assert!(stderr.is_empty());
}

#[test]
fn usage_errors_are_written_to_stderr() {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    let exit = run(
        ["plugpack", "plugin", "--platform-dependencies", "sometimes"].map(OsString::from),
        &mut stdout,
        &mut stderr,
    );

    assert_eq!(exit, ExitCode::from(2));
    assert!(String::from_utf8_lossy(&stderr).contains("sometimes"));
    assert!(stdout.is_empty());
}

#[rstest]
fn missing_plugin_directory_exits_non_zero(workspace: Workspace) {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut args = workspace.args(&[]);
    if let Some(plugin) = args.get_mut(1) {
        *plugin = workspace.root.join("absent").as_str().into();
    }

    let exit = run(args, &mut stdout, &mut stderr);

    assert_eq!(exit, ExitCode::FAILURE);
    assert!(!workspace.root.join("build").exists());
}

#[rstest]
fn build_produces_archive_and_build_log(workspace: Workspace) {
    let cli = Cli::try_parse_from(workspace.args(&["--platform-dependencies", "common"]))
        .expect("arguments should parse");
    let logging = LoggingContext::init(0, cli.log_format);
    let runtime = RecordingRuntime::default();
    let builder = PluginBuilder::new(ExportingTools, runtime).with_owner(None);

    let artifacts = execute(&cli, &logging, &builder).expect("build should succeed");
    logging.detach_build_log();

    assert_eq!(artifacts.layout, VendorLayout::Shared);
    assert!(artifacts.dist_archive.is_file());
    assert_eq!(artifacts.dist_archive, workspace.root.join("dist/Mock1-exploiter.tar"));
    assert_eq!(
        builder.runtime().images.borrow().as_slice(),
        [DEFAULT_LINUX_IMAGE]
    );

    let log = fs::read_to_string(workspace.root.join("build").join(BUILD_LOG_FILENAME))
        .expect("build log should exist");
    assert!(log.contains("using build options"));
}

#[rstest]
fn invalid_source_dir_override_fails_before_building(workspace: Workspace) {
    let cli = Cli::try_parse_from(workspace.args(&["-s", "../../etc"]))
        .expect("arguments should parse");
    let logging = LoggingContext::init(0, cli.log_format);
    let builder = PluginBuilder::new(ExportingTools, RecordingRuntime::default());

    let result = execute(&cli, &logging, &builder);

    assert!(matches!(result, Err(AppError::Config(_))));
    assert!(builder.runtime().images.borrow().is_empty());
    assert!(!logging.has_build_log());
}

#[rstest]
fn missing_lock_file_is_a_build_error(workspace: Workspace) {
    fs::remove_file(workspace.plugin().join("poetry.lock")).expect("remove lock");
    let cli = Cli::try_parse_from(workspace.args(&[])).expect("arguments should parse");
    let logging = LoggingContext::init(0, cli.log_format);
    let builder = PluginBuilder::new(ExportingTools, RecordingRuntime::default());

    let result = execute(&cli, &logging, &builder);

    assert!(matches!(
        result,
        Err(AppError::Build(BuildError::FileNotFound { .. }))
    ));
    assert!(logging.has_build_log());
}
