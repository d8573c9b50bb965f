//! Build options validated at construction time.

use std::path::{Component, Path, PathBuf};

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::error::ConfigError;
use crate::images::IsolationImages;
use crate::packaging::PackagingMethod;
use crate::source_dir::SourceDirName;

/// Characters that never appear in a plugin directory path we accept.
const FORBIDDEN_PATH_CHARS: &[char] = &[
    '|', '\\', '\'', '"', ';', '%', '$', '`', '!', '<', '>', '*', '?', '&', '\n', '\r', '\0',
];

/// Device names that Windows reserves regardless of extension.
const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Raw directory locations supplied by the caller, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPaths {
    /// Plugin source directory.
    pub plugin_dir: PathBuf,
    /// Scratch directory recreated for every build.
    pub build_dir: PathBuf,
    /// Directory receiving the finished plugin archive.
    pub dist_dir: PathBuf,
}

/// Validated options for one plugin build.
///
/// All paths are absolute UTF-8 paths. The plugin directory exists and passed
/// path-safety checks, and the build directory does not contain it, so the
/// build directory can be wiped without touching the plugin source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
    plugin_dir_path: Utf8PathBuf,
    build_dir_path: Utf8PathBuf,
    dist_dir_path: Utf8PathBuf,
    source_dir_name: SourceDirName,
    platform_dependencies: PackagingMethod,
    verify_hashes: bool,
    images: IsolationImages,
}

impl BuildOptions {
    /// Validates the supplied paths and assembles build options.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the plugin directory fails path-safety
    /// validation or does not exist, if the build or dist directory contains
    /// a `..` component, if any path is not UTF-8 or cannot be resolved, or
    /// if the build directory contains the plugin directory once symlinks
    /// are resolved.
    pub fn new(
        paths: BuildPaths,
        source_dir_name: SourceDirName,
        platform_dependencies: PackagingMethod,
        verify_hashes: bool,
    ) -> Result<Self, ConfigError> {
        let plugin_dir_path = resolve_plugin_dir(&paths.plugin_dir)?;
        let build_dir_path = output_dir(&paths.build_dir)?;
        if resolve_existing_prefix(&plugin_dir_path)?
            .starts_with(resolve_existing_prefix(&build_dir_path)?)
        {
            return Err(ConfigError::BuildDirContainsPlugin {
                build_dir: build_dir_path,
                plugin_dir: plugin_dir_path,
            });
        }
        let dist_dir_path = output_dir(&paths.dist_dir)?;

        Ok(Self {
            plugin_dir_path,
            build_dir_path,
            dist_dir_path,
            source_dir_name,
            platform_dependencies,
            verify_hashes,
            images: IsolationImages::default(),
        })
    }

    /// Overrides the container images used for installs.
    #[must_use]
    pub fn with_images(mut self, images: IsolationImages) -> Self {
        self.images = images;
        self
    }

    /// Plugin source directory.
    #[must_use]
    pub fn plugin_dir_path(&self) -> &Utf8Path {
        &self.plugin_dir_path
    }

    /// Scratch build directory.
    #[must_use]
    pub fn build_dir_path(&self) -> &Utf8Path {
        &self.build_dir_path
    }

    /// Distribution directory.
    #[must_use]
    pub fn dist_dir_path(&self) -> &Utf8Path {
        &self.dist_dir_path
    }

    /// Importable source subdirectory name.
    #[must_use]
    pub const fn source_dir_name(&self) -> &SourceDirName {
        &self.source_dir_name
    }

    /// Requested dependency packaging method.
    #[must_use]
    pub const fn platform_dependencies(&self) -> PackagingMethod {
        self.platform_dependencies
    }

    /// Whether exported requirements carry integrity hashes.
    #[must_use]
    pub const fn verify_hashes(&self) -> bool {
        self.verify_hashes
    }

    /// Container images used for dry runs and installs.
    #[must_use]
    pub const fn images(&self) -> &IsolationImages {
        &self.images
    }
}

/// Checks a plugin directory path and returns it as an absolute UTF-8 path.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidPluginDir`] when the path is empty, contains
/// a shell metacharacter, a backslash, `%`, a `..` component, or a reserved
/// device name, [`ConfigError::NonUtf8Path`] when it is not UTF-8, and
/// [`ConfigError::PluginDirNotFound`] when it is not an existing directory.
pub fn resolve_plugin_dir(path: &Path) -> Result<Utf8PathBuf, ConfigError> {
    validate_plugin_dir(path)?;
    let absolute = absolute_utf8(path)?;
    if !absolute.is_dir() {
        return Err(ConfigError::PluginDirNotFound { path: absolute });
    }
    Ok(absolute)
}

fn validate_plugin_dir(path: &Path) -> Result<(), ConfigError> {
    let reject = |reason: String| {
        Err(ConfigError::InvalidPluginDir {
            path: path.to_path_buf(),
            reason,
        })
    };

    let Some(text) = path.to_str() else {
        return Err(ConfigError::NonUtf8Path(path.to_path_buf()));
    };
    if text.is_empty() {
        return reject(String::from("path must not be empty"));
    }
    if let Some(found) = text.chars().find(|c| FORBIDDEN_PATH_CHARS.contains(c)) {
        return reject(format!("path must not contain {found:?}"));
    }

    for component in path.components() {
        match component {
            Component::ParentDir => return reject(String::from("path must not contain '..'")),
            Component::Normal(os_part) => {
                let part = os_part.to_string_lossy();
                if is_reserved_device_name(&part) {
                    return reject(format!("{part:?} is a reserved device name"));
                }
            }
            Component::Prefix(_) | Component::RootDir | Component::CurDir => {}
        }
    }
    Ok(())
}

fn is_reserved_device_name(part: &str) -> bool {
    let stem = part.split('.').next().unwrap_or(part);
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

/// Makes a build or dist directory absolute, rejecting `..` components.
fn output_dir(path: &Path) -> Result<Utf8PathBuf, ConfigError> {
    if path.components().any(|part| part == Component::ParentDir) {
        return Err(ConfigError::InvalidOutputDir {
            path: path.to_path_buf(),
            reason: "path must not contain '..'",
        });
    }
    absolute_utf8(path)
}

/// Resolves symlinks in the longest existing prefix of `path` and appends the
/// components that do not exist yet.
fn resolve_existing_prefix(path: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    let mut existing = path;
    let mut missing = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => break,
        }
    }
    let resolved = existing
        .canonicalize_utf8()
        .map_err(|source| ConfigError::Resolve {
            path: existing.as_std_path().to_path_buf(),
            source,
        })?;
    Ok(missing
        .iter()
        .rev()
        .fold(resolved, |joined, name| joined.join(name)))
}

fn absolute_utf8(path: &Path) -> Result<Utf8PathBuf, ConfigError> {
    let absolute = std::path::absolute(path).map_err(|source| ConfigError::Resolve {
        path: path.to_path_buf(),
        source,
    })?;
    Utf8PathBuf::from_path_buf(absolute).map_err(ConfigError::NonUtf8Path)
}

#[cfg(test)]
mod tests {
    use super::is_reserved_device_name;

    #[test]
    fn reserved_names_ignore_case_and_extension() {
        assert!(is_reserved_device_name("con"));
        assert!(is_reserved_device_name("PRN.txt"));
        assert!(is_reserved_device_name("Lpt1"));
        assert!(!is_reserved_device_name("console"));
        assert!(!is_reserved_device_name("plugins"));
    }
}
