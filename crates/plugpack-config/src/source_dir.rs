//! Validated name of the plugin's importable source subdirectory.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Name of the subdirectory inside the plugin that holds importable code.
///
/// The name is spliced into filesystem paths and container scripts, so it is
/// restricted to a single path component of ASCII letters, digits, `_` and
/// `-`, not starting with `-`. That rules out traversal (`..`, `/`), home
/// expansion (`~`), and every shell metacharacter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceDirName(String);

impl SourceDirName {
    /// Validates and wraps a source directory name.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSourceDirName`] when the name is empty,
    /// starts with `-`, or contains anything other than ASCII alphanumerics,
    /// `_` and `-`.
    pub fn new(name: impl Into<String>) -> Result<Self, ConfigError> {
        let owned = name.into();
        validate(&owned)?;
        Ok(Self(owned))
    }

    /// Derives the conventional name `<plugin name>_<plugin type>`, lowercased.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidSourceDirName`] when the derived name is
    /// not a safe directory name.
    pub fn for_plugin(plugin_name: &str, plugin_type: &str) -> Result<Self, ConfigError> {
        Self::new(format!("{plugin_name}_{plugin_type}").to_lowercase())
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate(name: &str) -> Result<(), ConfigError> {
    let reject = |reason| {
        Err(ConfigError::InvalidSourceDirName {
            name: name.to_owned(),
            reason,
        })
    };

    if name.is_empty() {
        return reject("name must not be empty");
    }
    if name.starts_with('-') {
        return reject("name must not start with '-'");
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return reject("only ASCII letters, digits, '_' and '-' are allowed");
    }
    Ok(())
}

impl fmt::Display for SourceDirName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SourceDirName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SourceDirName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for SourceDirName {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SourceDirName> for String {
    fn from(value: SourceDirName) -> Self {
        value.0
    }
}
