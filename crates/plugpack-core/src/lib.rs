//! Plugin packaging engine.
//!
//! This crate turns a plugin directory into a distributable archive. It
//! exports the plugin's locked requirements, decides whether its third-party
//! dependencies can share one vendor directory or need one per operating
//! system, installs them inside isolated containers, and assembles the
//! source, config schema, and manifest into a reproducible nested archive.
//!
//! The entry point is [`PluginBuilder`]. External tools sit behind the
//! [`ToolRunner`] and [`plugpack_isolation::ContainerRuntime`] traits so the
//! whole pipeline can run against test doubles.

pub mod archive;
mod builder;
pub mod decision;
mod error;
pub mod manifest;
pub mod report;
pub mod requirements;
pub mod schema;
pub mod vendor;

pub use builder::{BuildArtifacts, PluginBuilder};
pub use decision::{PackageProbe, PackagingPlan, VendorLayout};
pub use error::BuildError;
pub use manifest::{OperatingSystem, PluginManifest, PluginType, load_manifest};
pub use requirements::{SystemToolRunner, ToolCommand, ToolExit, ToolRunner};
pub use schema::{DeclaredOptionsSchema, SchemaSource, SchemarsSchema};

#[cfg(test)]
mod tests;
