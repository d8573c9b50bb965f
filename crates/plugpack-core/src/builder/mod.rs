//! Plugin build orchestration.
//!
//! The [`PluginBuilder`] runs a build end to end: copy the plugin into a
//! fresh build directory, export its requirements, decide the vendor layout,
//! install dependencies in containers, generate the config schema, assemble
//! the archives, and copy the result into the distribution directory. Steps
//! run one after another and the first failure aborts the build.

use camino::{Utf8Path, Utf8PathBuf};
use plugpack_config::BuildOptions;
use plugpack_isolation::{ContainerRuntime, Owner};
use tracing::{debug, error, info};

use crate::archive::{
    copy_to_dist, create_plugin_archive, create_source_archive, prepare_build_dir,
};
use crate::decision::{PackagingPlan, VendorLayout, decide};
use crate::error::BuildError;
use crate::manifest::PluginManifest;
use crate::requirements::{ToolRunner, materialize_requirements};
use crate::schema::{DeclaredOptionsSchema, SchemaSource, write_config_schema};
use crate::vendor::{COMMON_VENDOR_DIR, DryRunProbe, VendorBuilder};

/// Tracing target for build orchestration.
const BUILDER_TARGET: &str = "plugpack_core::builder";

/// Paths produced by a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildArtifacts {
    /// Vendor layout that was materialised.
    pub layout: VendorLayout,
    /// Vendor directories created in the build directory.
    pub vendor_dirs: Vec<Utf8PathBuf>,
    /// Plugin archive inside the build directory.
    pub plugin_archive: Utf8PathBuf,
    /// Copy of the plugin archive in the distribution directory.
    pub dist_archive: Utf8PathBuf,
}

/// Builds plugin archives using an export tool runner and a container
/// runtime.
///
/// # Example
///
/// ```no_run
/// use camino::Utf8Path;
/// use plugpack_core::{PluginBuilder, SystemToolRunner, load_manifest};
/// use plugpack_config::{BuildOptions, BuildPaths, PackagingMethod, SourceDirName};
/// use plugpack_isolation::DockerCli;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let manifest = load_manifest(Utf8Path::new("plugins/ssh"))?;
/// let options = BuildOptions::new(
///     BuildPaths {
///         plugin_dir: "plugins/ssh".into(),
///         build_dir: "build".into(),
///         dist_dir: "dist".into(),
///     },
///     SourceDirName::new("ssh_exploiter")?,
///     PackagingMethod::Autodetect,
///     true,
/// )?;
/// let builder = PluginBuilder::new(SystemToolRunner, DockerCli::new());
/// let artifacts = builder.build(&options, &manifest)?;
/// println!("{}", artifacts.dist_archive);
/// # Ok(())
/// # }
/// ```
pub struct PluginBuilder<T, C> {
    tools: T,
    runtime: C,
    owner: Option<Owner>,
    schema_source: Option<Box<dyn SchemaSource>>,
}

impl<T, C> PluginBuilder<T, C> {
    /// Creates a builder whose containers run as the invoking user.
    #[must_use]
    pub fn new(tools: T, runtime: C) -> Self {
        Self {
            tools,
            runtime,
            owner: Some(Owner::current()),
            schema_source: None,
        }
    }

    /// Overrides the user containers run as; `None` keeps the image user.
    #[must_use]
    pub const fn with_owner(mut self, owner: Option<Owner>) -> Self {
        self.owner = owner;
        self
    }

    /// Returns the export tool runner.
    #[must_use]
    pub const fn tools(&self) -> &T {
        &self.tools
    }

    /// Returns the container runtime.
    #[must_use]
    pub const fn runtime(&self) -> &C {
        &self.runtime
    }

    /// Replaces the default declared-options schema source.
    #[must_use]
    pub fn with_schema_source(mut self, source: impl SchemaSource + 'static) -> Self {
        self.schema_source = Some(Box::new(source));
        self
    }
}

impl<T: ToolRunner, C: ContainerRuntime> PluginBuilder<T, C> {
    /// Builds the plugin described by `manifest`.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] raised by any build step.
    pub fn build(
        &self,
        options: &BuildOptions,
        manifest: &PluginManifest,
    ) -> Result<BuildArtifacts, BuildError> {
        self.build_with_hook(options, manifest, |_| {})
    }

    /// Builds the plugin, calling `on_build_dir_created` once the plugin has
    /// been copied into the build directory and before any generation step.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] raised by any build step.
    pub fn build_with_hook<F>(
        &self,
        options: &BuildOptions,
        manifest: &PluginManifest,
        on_build_dir_created: F,
    ) -> Result<BuildArtifacts, BuildError>
    where
        F: FnOnce(&Utf8Path),
    {
        prepare_build_dir(options.plugin_dir_path(), options.build_dir_path())?;
        on_build_dir_created(options.build_dir_path());

        debug!(target: BUILDER_TARGET, ?options, "using build options");
        self.create_plugin_archive(options, manifest)
            .inspect_err(|failure| {
                error!(target: BUILDER_TARGET, plugin = manifest.name(), %failure, "plugin build failed");
            })
    }

    fn create_plugin_archive(
        &self,
        options: &BuildOptions,
        manifest: &PluginManifest,
    ) -> Result<BuildArtifacts, BuildError> {
        let build_dir = options.build_dir_path();
        let (layout, vendor_dirs) = self.generate_vendor_dirs(options, manifest)?;

        let schema = match &self.schema_source {
            Some(source) => write_config_schema(build_dir, source.as_ref())?,
            None => {
                let declared = DeclaredOptionsSchema::for_plugin(
                    build_dir,
                    options.source_dir_name(),
                    manifest,
                );
                write_config_schema(build_dir, &declared)?
            }
        };
        debug!(target: BUILDER_TARGET, path = %schema, "config schema ready");

        create_source_archive(build_dir, options.source_dir_name())?;
        let plugin_archive = create_plugin_archive(build_dir, manifest)?;
        let dist_archive = copy_to_dist(&plugin_archive, options.dist_dir_path())?;
        info!(target: BUILDER_TARGET, path = %dist_archive, "plugin built");

        Ok(BuildArtifacts {
            layout,
            vendor_dirs,
            plugin_archive,
            dist_archive,
        })
    }

    fn generate_vendor_dirs(
        &self,
        options: &BuildOptions,
        manifest: &PluginManifest,
    ) -> Result<(VendorLayout, Vec<Utf8PathBuf>), BuildError> {
        let build_dir = options.build_dir_path();
        let source_dir_name = options.source_dir_name();
        materialize_requirements(&self.tools, build_dir, options.verify_hashes())?;

        let vendor = VendorBuilder::new(&self.runtime, options.images()).with_owner(self.owner);
        let plan = PackagingPlan::new(
            options.platform_dependencies(),
            manifest.supported_operating_systems(),
        );
        let layout = decide(&plan, &DryRunProbe::new(&vendor, build_dir))?;

        let vendor_dirs = match &layout {
            VendorLayout::Shared => vec![vendor.build_common_vendor_dir(
                build_dir,
                source_dir_name,
                COMMON_VENDOR_DIR,
            )?],
            VendorLayout::PerOs(systems) => systems
                .iter()
                .map(|os| vendor.build_vendor_dir_for_os(build_dir, source_dir_name, *os))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok((layout, vendor_dirs))
    }
}

#[cfg(test)]
mod tests;
