//! Plugin manifest loading and validation.
//!
//! A plugin describes itself in `manifest.yaml` (or `manifest.yml`) at the
//! root of its directory. The manifest names the plugin, its type, and the
//! operating systems it supports; the supported list drives how vendor
//! directories are laid out.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::info;

use crate::error::BuildError;

/// Tracing target for manifest loading.
const MANIFEST_TARGET: &str = "plugpack_core::manifest";

/// Preferred manifest file name.
pub const MANIFEST_YAML: &str = "manifest.yaml";

/// Fallback manifest file name, used when [`MANIFEST_YAML`] is absent.
pub const MANIFEST_YML: &str = "manifest.yml";

/// Operating systems a plugin can be packaged for.
///
/// ```
/// use std::str::FromStr;
/// use plugpack_core::OperatingSystem;
///
/// assert_eq!(OperatingSystem::from_str("windows").ok(), Some(OperatingSystem::Windows));
/// assert_eq!(OperatingSystem::Linux.vendor_dir_name(), "vendor-linux");
/// ```
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperatingSystem {
    /// Linux, installed with the native builder image.
    Linux,
    /// Windows, installed under Wine in the plugin builder image.
    Windows,
}

impl OperatingSystem {
    /// Name of the vendor directory holding this platform's dependencies.
    #[must_use]
    pub const fn vendor_dir_name(self) -> &'static str {
        match self {
            Self::Linux => "vendor-linux",
            Self::Windows => "vendor-windows",
        }
    }

    /// Parses a manifest operating system name.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::UnsupportedOperatingSystem`] for any name other
    /// than `linux` or `windows`.
    pub fn parse(name: &str) -> Result<Self, BuildError> {
        name.parse()
            .map_err(|_| BuildError::UnsupportedOperatingSystem {
                name: name.to_owned(),
            })
    }
}

/// Kind of agent plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PluginType {
    /// Exploits a vulnerability to propagate.
    Exploiter,
    /// Collects credentials from a compromised host.
    CredentialsCollector,
    /// Identifies services on a target.
    Fingerprinter,
    /// Runs a payload on a compromised host.
    Payload,
}

impl PluginType {
    /// Returns the manifest spelling of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exploiter => "Exploiter",
            Self::CredentialsCollector => "CredentialsCollector",
            Self::Fingerprinter => "Fingerprinter",
            Self::Payload => "Payload",
        }
    }
}

impl std::fmt::Display for PluginType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Manifest as written on disk, before validation.
#[derive(Debug, Deserialize)]
struct RawManifest {
    name: String,
    plugin_type: PluginType,
    supported_operating_systems: Vec<String>,
    #[serde(default)]
    target_operating_systems: Vec<String>,
    #[serde(default)]
    title: Option<String>,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    link_to_documentation: Option<String>,
    #[serde(default)]
    safe: bool,
    #[serde(default)]
    remediation_suggestion: Option<String>,
}

/// Validated plugin manifest.
///
/// The supported operating system list is non-empty and free of duplicates,
/// in the order the manifest declares them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginManifest {
    name: String,
    plugin_type: PluginType,
    supported_operating_systems: Vec<OperatingSystem>,
    target_operating_systems: Vec<OperatingSystem>,
    title: Option<String>,
    version: String,
    description: Option<String>,
    link_to_documentation: Option<String>,
    safe: bool,
    remediation_suggestion: Option<String>,
}

impl PluginManifest {
    /// Creates a manifest with the identity fields and supported platforms.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Manifest`] if the name is not a plain identifier
    /// or the supported operating system list is empty.
    pub fn new(
        name: impl Into<String>,
        plugin_type: PluginType,
        version: impl Into<String>,
        supported_operating_systems: Vec<OperatingSystem>,
    ) -> Result<Self, BuildError> {
        let systems = dedup_in_order(supported_operating_systems);
        let manifest = Self {
            name: name.into(),
            plugin_type,
            target_operating_systems: systems.clone(),
            supported_operating_systems: systems,
            title: None,
            version: version.into(),
            description: None,
            link_to_documentation: None,
            safe: false,
            remediation_suggestion: None,
        };
        manifest.validate(Utf8Path::new(MANIFEST_YAML))?;
        Ok(manifest)
    }

    /// Parses and validates manifest YAML read from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::Manifest`] for malformed YAML or invalid field
    /// values, and [`BuildError::UnsupportedOperatingSystem`] for an unknown
    /// operating system name.
    pub fn from_yaml(contents: &str, path: &Utf8Path) -> Result<Self, BuildError> {
        let raw: RawManifest =
            serde_saphyr::from_str(contents).map_err(|error| BuildError::Manifest {
                path: path.to_owned(),
                message: error.to_string(),
            })?;

        let manifest = Self {
            name: raw.name,
            plugin_type: raw.plugin_type,
            supported_operating_systems: parse_systems(&raw.supported_operating_systems)?,
            target_operating_systems: parse_systems(&raw.target_operating_systems)?,
            title: raw.title,
            version: raw.version,
            description: raw.description,
            link_to_documentation: raw.link_to_documentation,
            safe: raw.safe,
            remediation_suggestion: raw.remediation_suggestion,
        };
        manifest.validate(path)?;
        Ok(manifest)
    }

    fn validate(&self, path: &Utf8Path) -> Result<(), BuildError> {
        let invalid = |message: &str| BuildError::Manifest {
            path: path.to_owned(),
            message: message.to_owned(),
        };

        if self.name.is_empty() {
            return Err(invalid("plugin name must not be empty"));
        }
        if !self
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(invalid(
                "plugin name may only contain ASCII letters, digits and '_'",
            ));
        }
        if self.supported_operating_systems.is_empty() {
            return Err(invalid("supported_operating_systems must not be empty"));
        }
        Ok(())
    }

    /// Returns the plugin name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the plugin type.
    #[must_use]
    pub const fn plugin_type(&self) -> PluginType {
        self.plugin_type
    }

    /// Operating systems the plugin runs on, in declaration order.
    #[must_use]
    pub fn supported_operating_systems(&self) -> &[OperatingSystem] {
        &self.supported_operating_systems
    }

    /// Operating systems the plugin can attack.
    #[must_use]
    pub fn target_operating_systems(&self) -> &[OperatingSystem] {
        &self.target_operating_systems
    }

    /// Display title.
    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Plugin version string.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Link to the plugin's documentation.
    #[must_use]
    pub fn link_to_documentation(&self) -> Option<&str> {
        self.link_to_documentation.as_deref()
    }

    /// Whether the plugin is safe to run against production hosts.
    #[must_use]
    pub const fn safe(&self) -> bool {
        self.safe
    }

    /// Suggested remediation for what the plugin exploits.
    #[must_use]
    pub fn remediation_suggestion(&self) -> Option<&str> {
        self.remediation_suggestion.as_deref()
    }

    /// File name of the plugin archive: `<name>-<type lowercased>.tar`.
    #[must_use]
    pub fn archive_file_name(&self) -> String {
        format!(
            "{}-{}.tar",
            self.name,
            self.plugin_type.as_str().to_lowercase()
        )
    }
}

/// Returns the manifest path in `dir`, preferring [`MANIFEST_YAML`].
#[must_use]
pub fn manifest_file_path(dir: &Utf8Path) -> Utf8PathBuf {
    let yaml = dir.join(MANIFEST_YAML);
    if yaml.exists() {
        yaml
    } else {
        dir.join(MANIFEST_YML)
    }
}

/// Reads and validates the manifest found in `dir`.
///
/// # Errors
///
/// Returns [`BuildError::FileNotFound`] when neither manifest file exists,
/// [`BuildError::Io`] when it cannot be read, and the errors of
/// [`PluginManifest::from_yaml`] when its contents are invalid.
pub fn load_manifest(dir: &Utf8Path) -> Result<PluginManifest, BuildError> {
    let path = manifest_file_path(dir);
    if !path.is_file() {
        return Err(BuildError::FileNotFound { path });
    }

    info!(target: MANIFEST_TARGET, path = %path, "reading plugin manifest");
    let contents = fs::read_to_string(&path)
        .map_err(|source| BuildError::io(format!("failed to read manifest {path}"), source))?;
    PluginManifest::from_yaml(&contents, &path)
}

fn parse_systems(names: &[String]) -> Result<Vec<OperatingSystem>, BuildError> {
    let systems = names
        .iter()
        .map(String::as_str)
        .map(OperatingSystem::parse)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(dedup_in_order(systems))
}

fn dedup_in_order(systems: Vec<OperatingSystem>) -> Vec<OperatingSystem> {
    let mut unique = Vec::with_capacity(systems.len());
    for system in systems {
        if !unique.contains(&system) {
            unique.push(system);
        }
    }
    unique
}
