//! Unit tests for config schema generation.

use std::fs;

use schemars::JsonSchema;
use serde_json::json;
use tempfile::TempDir;

use super::*;
use crate::manifest::{OperatingSystem, PluginType};
use crate::tests::utf8_dir;

#[derive(JsonSchema)]
#[expect(dead_code, reason = "only the derived schema is inspected")]
struct MockOptions {
    timeout: u32,
    credentials: Vec<String>,
}

fn manifest() -> PluginManifest {
    PluginManifest::new("Mock", PluginType::Exploiter, "1.0.0", vec![OperatingSystem::Linux])
        .expect("valid manifest")
}

fn source_dir() -> SourceDirName {
    SourceDirName::new("src").expect("valid name")
}

#[test]
fn missing_declaration_yields_default_schema() {
    let dir = TempDir::new().expect("temp dir");
    let source = DeclaredOptionsSchema::for_plugin(&utf8_dir(&dir), &source_dir(), &manifest());

    assert_eq!(source.produce_schema().expect("schema"), json!({"type": "object"}));
}

#[test]
fn declared_schema_path_uses_lowercase_name() {
    let source = DeclaredOptionsSchema::for_plugin(
        Utf8Path::new("/tmp/build"),
        &source_dir(),
        &manifest(),
    );
    assert_eq!(
        source.path(),
        Utf8Path::new("/tmp/build/src/mock_options.schema.json")
    );
}

#[test]
fn declared_schema_keeps_only_properties() {
    let dir = TempDir::new().expect("temp dir");
    let build_dir = utf8_dir(&dir);
    fs::create_dir(build_dir.join("src")).expect("create source dir");
    let declared = json!({
        "title": "MockOptions",
        "type": "object",
        "properties": {"timeout": {"type": "integer"}},
        "required": ["timeout"],
    });
    fs::write(
        build_dir.join("src/mock_options.schema.json"),
        declared.to_string(),
    )
    .expect("write schema");

    let source = DeclaredOptionsSchema::for_plugin(&build_dir, &source_dir(), &manifest());
    assert_eq!(
        source.produce_schema().expect("schema"),
        json!({"properties": {"timeout": {"type": "integer"}}})
    );
}

#[test]
fn declared_schema_without_properties_is_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let path = utf8_dir(&dir).join("options.schema.json");
    fs::write(&path, r#"{"type": "object"}"#).expect("write schema");

    let error = DeclaredOptionsSchema::new(path)
        .produce_schema()
        .expect_err("no properties");
    assert!(matches!(error, BuildError::Schema { .. }));
}

#[test]
fn schemars_source_reduces_to_properties() {
    let schema = SchemarsSchema::<MockOptions>::new()
        .produce_schema()
        .expect("schema");
    let object = schema.as_object().expect("object");

    assert_eq!(object.len(), 1);
    let properties = schema
        .get("properties")
        .and_then(Value::as_object)
        .expect("properties");
    assert!(properties.contains_key("timeout"));
    assert!(properties.contains_key("credentials"));
}

#[test]
fn writes_schema_file() {
    let dir = TempDir::new().expect("temp dir");
    let build_dir = utf8_dir(&dir);

    let path = write_config_schema(&build_dir, &DeclaredOptionsSchema::new(build_dir.join("none")))
        .expect("write schema");

    let written = fs::read_to_string(&path).expect("read schema");
    assert_eq!(written, r#"{"type":"object"}"#);
}

#[test]
fn existing_schema_file_is_kept() {
    let dir = TempDir::new().expect("temp dir");
    let build_dir = utf8_dir(&dir);
    fs::write(build_dir.join(CONFIG_SCHEMA_FILE), "{\"custom\": true}").expect("write schema");

    write_config_schema(&build_dir, &SchemarsSchema::<MockOptions>::new()).expect("skip");

    let kept = fs::read_to_string(build_dir.join(CONFIG_SCHEMA_FILE)).expect("read schema");
    assert_eq!(kept, "{\"custom\": true}");
}
