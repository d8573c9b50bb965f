//! Shared test doubles and fixtures for the packaging engine.


use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use mockall::mock;
use plugpack_isolation::{ContainerOutput, ContainerRun, ContainerRuntime, IsolationError};
use tempfile::TempDir;

use crate::error::BuildError;
use crate::requirements::{REQUIREMENTS_FILE, ToolCommand, ToolExit, ToolRunner};

mock! {
    pub Tools {}
    impl ToolRunner for Tools {
        fn run(&self, command: &ToolCommand) -> Result<ToolExit, BuildError>;
    }
}

mock! {
    pub Runtime {}
    impl ContainerRuntime for Runtime {
        fn run(&self, run: &ContainerRun) -> Result<ContainerOutput, IsolationError>;
    }
}

/// Returns the temp directory path as UTF-8.
pub fn utf8_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("temp dir is UTF-8")
}

/// Tool runner double that writes `requirements.txt` and succeeds.
pub fn exporting_tools() -> MockTools {
    let mut tools = MockTools::new();
    tools.expect_run().returning(|command| {
        fs::write(
            command.working_dir().join(REQUIREMENTS_FILE),
            "requests==2.31.0\n",
        )
        .map_err(|source| BuildError::io("write requirements", source))?;
        Ok(ToolExit::success())
    });
    tools
}

/// Pip installation report listing the given download URLs.
pub fn report_json(urls: &[&str]) -> String {
    let install: Vec<serde_json::Value> = urls
        .iter()
        .map(|url| serde_json::json!({"download_info": {"url": url}}))
        .collect();
    serde_json::json!({ "version": "1", "install": install }).to_string()
}

/// Container runtime that imitates pip inside the builder images.
///
/// Install scripts create their `-t` target directory under the mount, and
/// dry runs write a report listing the packages configured for the image.
/// Every run is recorded.
#[derive(Default)]
pub struct SimulatedRuntime {
    packages: HashMap<String, Vec<String>>,
    runs: RefCell<Vec<ContainerRun>>,
}

impl SimulatedRuntime {
    /// Configures the download URLs a dry run in `image` resolves to.
    pub fn with_packages(mut self, image: &str, urls: &[&str]) -> Self {
        self.packages.insert(
            image.to_owned(),
            urls.iter().map(|url| (*url).to_owned()).collect(),
        );
        self
    }

    /// Runs recorded so far.
    pub fn runs(&self) -> Vec<ContainerRun> {
        self.runs.borrow().clone()
    }

    fn simulate(&self, run: &ContainerRun) -> Result<(), String> {
        let words = shlex::split(run.script()).ok_or("script does not split")?;
        let value_after = |flag: &str| {
            words
                .iter()
                .position(|word| word == flag)
                .and_then(|index| words.get(index + 1))
                .cloned()
        };

        if let Some(report) = value_after("--report") {
            let urls: Vec<&str> = self
                .packages
                .get(run.image())
                .map(|urls| urls.iter().map(String::as_str).collect())
                .unwrap_or_default();
            fs::write(run.mount().join(report), report_json(&urls)).map_err(|e| e.to_string())
        } else if let Some(target) = value_after("-t") {
            let vendor = run.mount().join(target);
            fs::create_dir_all(&vendor).map_err(|e| e.to_string())?;
            fs::write(vendor.join("installed.txt"), run.image()).map_err(|e| e.to_string())
        } else {
            Err(String::from("unrecognised script"))
        }
    }
}

impl ContainerRuntime for SimulatedRuntime {
    fn run(&self, run: &ContainerRun) -> Result<ContainerOutput, IsolationError> {
        self.runs.borrow_mut().push(run.clone());
        self.simulate(run)
            .map_err(|output| IsolationError::ContainerFailed {
                image: run.image().to_owned(),
                status: Some(1),
                output,
            })?;
        Ok(ContainerOutput::new(b"Successfully installed\n".to_vec()))
    }
}

/// Writes a minimal plugin tree: manifest, poetry lock, and source module.
pub fn write_plugin(root: &Utf8Path, systems: &[&str]) -> Utf8PathBuf {
    let plugin = root.join("plugin");
    fs::create_dir_all(plugin.join("mock1_exploiter")).expect("create source dir");
    let os_list: String = systems
        .iter()
        .map(|os| format!("  - {os}\n"))
        .collect();
    let manifest = format!(
        "name: Mock1\nplugin_type: Exploiter\nsupported_operating_systems:\n{os_list}version: 1.0.0\n"
    );
    fs::write(plugin.join("manifest.yaml"), manifest).expect("write manifest");
    fs::write(plugin.join("poetry.lock"), "").expect("write lock");
    fs::write(plugin.join("mock1_exploiter/plugin.py"), "def run(): pass\n")
        .expect("write plugin module");
    plugin
}
