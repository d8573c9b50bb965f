//! Unit tests for build orchestration.

use std::cell::Cell;

use plugpack_config::{BuildPaths, IsolationImages, PackagingMethod, SourceDirName};
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::manifest::load_manifest;
use crate::requirements::ToolExit;
use crate::tests::{
    MockRuntime, MockTools, SimulatedRuntime, exporting_tools, utf8_dir, write_plugin,
};

struct Project {
    _dir: TempDir,
    options: BuildOptions,
    manifest: PluginManifest,
}

fn project(method: PackagingMethod, systems: &[&str]) -> Project {
    let dir = TempDir::new().expect("temp dir");
    let root = utf8_dir(&dir);
    let plugin = write_plugin(&root, systems);
    let manifest = load_manifest(&plugin).expect("manifest");
    let options = BuildOptions::new(
        BuildPaths {
            plugin_dir: plugin.into_std_path_buf(),
            build_dir: root.join("build").into_std_path_buf(),
            dist_dir: root.join("dist").into_std_path_buf(),
        },
        SourceDirName::new("mock1_exploiter").expect("valid name"),
        method,
        true,
    )
    .expect("options")
    .with_images(IsolationImages::new("linux:test", "windows:test"));
    Project {
        _dir: dir,
        options,
        manifest,
    }
}

#[fixture]
fn common_project() -> Project {
    project(PackagingMethod::Common, &["linux", "windows"])
}

#[rstest]
fn hook_runs_once_after_copy(common_project: Project) {
    let builder = PluginBuilder::new(exporting_tools(), SimulatedRuntime::default());
    let calls = Cell::new(0);

    builder
        .build_with_hook(&common_project.options, &common_project.manifest, |build_dir| {
            assert!(build_dir.join("manifest.yaml").is_file());
            assert!(!build_dir.join("requirements.txt").exists());
            calls.set(calls.get() + 1);
        })
        .expect("build");

    assert_eq!(calls.get(), 1);
}

#[rstest]
fn build_reports_artifacts(common_project: Project) {
    let builder = PluginBuilder::new(exporting_tools(), SimulatedRuntime::default());

    let artifacts = builder
        .build(&common_project.options, &common_project.manifest)
        .expect("build");

    let build_dir = common_project.options.build_dir_path();
    assert_eq!(artifacts.layout, VendorLayout::Shared);
    assert_eq!(
        artifacts.vendor_dirs,
        vec![build_dir.join("mock1_exploiter/vendor")]
    );
    assert_eq!(artifacts.plugin_archive, build_dir.join("Mock1-exploiter.tar"));
    assert_eq!(
        artifacts.dist_archive,
        common_project.options.dist_dir_path().join("Mock1-exploiter.tar")
    );
    assert!(artifacts.dist_archive.is_file());
}

#[rstest]
fn export_failure_stops_before_containers(common_project: Project) {
    let mut tools = MockTools::new();
    tools
        .expect_run()
        .once()
        .returning(|_| Ok(ToolExit::from_code(Some(1))));
    let mut runtime = MockRuntime::new();
    runtime.expect_run().never();
    let builder = PluginBuilder::new(tools, runtime);

    let error = builder
        .build(&common_project.options, &common_project.manifest)
        .expect_err("export fails");

    assert!(matches!(error, BuildError::CommandRun { status: Some(1), .. }));
    assert!(!common_project.options.dist_dir_path().exists());
}

#[rstest]
fn missing_plugin_dir_fails_before_hook(common_project: Project) {
    std::fs::remove_dir_all(common_project.options.plugin_dir_path()).expect("remove plugin");
    let builder = PluginBuilder::new(MockTools::new(), MockRuntime::new());

    let error = builder
        .build_with_hook(&common_project.options, &common_project.manifest, |_| {
            panic!("hook must not run");
        })
        .expect_err("plugin missing");

    assert!(matches!(error, BuildError::FileNotFound { .. }));
}

#[rstest]
fn custom_schema_source_replaces_default(common_project: Project) {
    #[derive(schemars::JsonSchema)]
    #[expect(dead_code, reason = "only the derived schema is inspected")]
    struct Options {
        retries: u8,
    }

    let builder = PluginBuilder::new(exporting_tools(), SimulatedRuntime::default())
        .with_schema_source(crate::schema::SchemarsSchema::<Options>::new());
    builder
        .build(&common_project.options, &common_project.manifest)
        .expect("build");

    let schema = std::fs::read_to_string(
        common_project
            .options
            .build_dir_path()
            .join(crate::schema::CONFIG_SCHEMA_FILE),
    )
    .expect("read schema");
    assert!(schema.contains("\"retries\""));
}
