//! Generation of the plugin's `config-schema.json`.
//!
//! The schema describes the options a plugin accepts. Any [`SchemaSource`]
//! can supply it; the builder's default reads the JSON schema a plugin
//! declares next to its source, and [`SchemarsSchema`] derives one from a
//! Rust type. Only the `properties` of the declared schema are kept.

use std::fmt;
use std::fs;
use std::marker::PhantomData;

use camino::{Utf8Path, Utf8PathBuf};
use plugpack_config::SourceDirName;
use schemars::JsonSchema;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::BuildError;
use crate::manifest::PluginManifest;

/// Tracing target for schema generation.
const SCHEMA_TARGET: &str = "plugpack_core::schema";

/// Schema file name inside the build directory and the plugin archive.
pub const CONFIG_SCHEMA_FILE: &str = "config-schema.json";

/// Capability producing a plugin's configuration schema.
pub trait SchemaSource {
    /// Produces the schema JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Schema`] when no valid schema can be produced.
    fn produce_schema(&self) -> Result<Value, BuildError>;
}

/// Schema used for plugins that declare no options.
#[must_use]
pub fn default_schema() -> Value {
    json!({ "type": "object" })
}

/// Reduces a full JSON schema to `{"properties": ...}`.
///
/// # Errors
///
/// Returns [`BuildError::Schema`] when the schema has no `properties`
/// object.
pub fn properties_only(schema: &Value) -> Result<Value, BuildError> {
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .ok_or_else(|| BuildError::Schema {
            message: String::from("options schema has no \"properties\" object"),
        })?;
    let mut reduced = Map::new();
    reduced.insert(String::from("properties"), Value::Object(properties.clone()));
    Ok(Value::Object(reduced))
}

/// Schema declared by the plugin in
/// `<source_dir>/<lowercase name>_options.schema.json`.
///
/// A plugin without the file gets [`default_schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeclaredOptionsSchema {
    path: Utf8PathBuf,
}

impl DeclaredOptionsSchema {
    /// Reads the schema from an explicit path.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Locates the declared schema for `manifest` inside the build directory.
    #[must_use]
    pub fn for_plugin(
        build_dir: &Utf8Path,
        source_dir_name: &SourceDirName,
        manifest: &PluginManifest,
    ) -> Self {
        let file_name = format!("{}_options.schema.json", manifest.name().to_lowercase());
        Self::new(build_dir.join(source_dir_name.as_str()).join(file_name))
    }

    /// Path the schema is read from.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl SchemaSource for DeclaredOptionsSchema {
    fn produce_schema(&self) -> Result<Value, BuildError> {
        if !self.path.is_file() {
            return Ok(default_schema());
        }
        let contents = fs::read_to_string(&self.path).map_err(|source| {
            BuildError::io(format!("failed to read options schema {}", self.path), source)
        })?;
        let schema: Value = serde_json::from_str(&contents).map_err(|error| BuildError::Schema {
            message: format!("{}: {error}", self.path),
        })?;
        properties_only(&schema)
    }
}

/// Schema derived from a Rust options type with `schemars`.
pub struct SchemarsSchema<T>(PhantomData<fn() -> T>);

impl<T> SchemarsSchema<T> {
    /// Creates the source.
    #[must_use]
    pub const fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for SchemarsSchema<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SchemarsSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SchemarsSchema")
            .field(&std::any::type_name::<T>())
            .finish()
    }
}

impl<T: JsonSchema> SchemaSource for SchemarsSchema<T> {
    fn produce_schema(&self) -> Result<Value, BuildError> {
        let schema = schemars::schema_for!(T);
        let value = serde_json::to_value(&schema).map_err(|error| BuildError::Schema {
            message: error.to_string(),
        })?;
        properties_only(&value)
    }
}

/// Writes `config-schema.json` into the build directory.
///
/// An existing schema file is left untouched, so plugins can ship a
/// hand-written schema.
///
/// # Errors
///
/// Returns the source's [`BuildError`] or [`BuildError::Io`] when the file
/// cannot be written.
pub fn write_config_schema<S>(build_dir: &Utf8Path, source: &S) -> Result<Utf8PathBuf, BuildError>
where
    S: SchemaSource + ?Sized,
{
    let path = build_dir.join(CONFIG_SCHEMA_FILE);
    if path.exists() {
        info!(target: SCHEMA_TARGET, path = %path, "skipping config schema generation, file already exists");
        return Ok(path);
    }

    info!(target: SCHEMA_TARGET, path = %path, "generating config schema");
    let schema = source.produce_schema()?;
    let contents = serde_json::to_string(&schema).map_err(|error| BuildError::Schema {
        message: error.to_string(),
    })?;
    fs::write(&path, contents)
        .map_err(|error| BuildError::io(format!("failed to write {path}"), error))?;
    Ok(path)
}

#[cfg(test)]
mod tests;
