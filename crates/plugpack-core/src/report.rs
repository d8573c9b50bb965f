//! Parsing of pip installation reports produced by dry runs.
//!
//! `pip install --dry-run --report <file>` writes JSON describing every
//! distribution it would install. Two platforms resolve to the same packages
//! exactly when the final path segments of their download URLs match, since
//! the wheel file name encodes name, version, and platform tags.

use std::collections::BTreeSet;
use std::fs;

use camino::Utf8Path;
use serde::Deserialize;

use crate::error::BuildError;
use crate::manifest::OperatingSystem;

/// Set of package identities resolved for one platform.
pub type PackageSet = BTreeSet<String>;

#[derive(Debug, Deserialize)]
struct InstallationReport {
    install: Vec<InstallItem>,
}

#[derive(Debug, Deserialize)]
struct InstallItem {
    download_info: DownloadInfo,
}

#[derive(Debug, Deserialize)]
struct DownloadInfo {
    url: String,
}

/// Report file name written into the build directory by a dry run.
#[must_use]
pub const fn report_file_name(os: OperatingSystem) -> &'static str {
    match os {
        OperatingSystem::Linux => "linux_packages.json",
        OperatingSystem::Windows => "windows_packages.json",
    }
}

/// Identity of a package: the final path segment of its download URL.
///
/// ```
/// use plugpack_core::report::package_identity;
///
/// assert_eq!(
///     package_identity("https://files.example/p/six-1.16.0-py2.py3-none-any.whl"),
///     "six-1.16.0-py2.py3-none-any.whl"
/// );
/// ```
#[must_use]
pub fn package_identity(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// Extracts the package identity set from report JSON.
///
/// # Errors
///
/// Returns [`BuildError::PackageReport`] when the JSON lacks the
/// `install[].download_info.url` structure.
pub fn parse_package_identities(contents: &str, path: &Utf8Path) -> Result<PackageSet, BuildError> {
    let report: InstallationReport =
        serde_json::from_str(contents).map_err(|error| BuildError::PackageReport {
            path: path.to_owned(),
            message: error.to_string(),
        })?;
    Ok(report
        .install
        .iter()
        .map(|item| package_identity(&item.download_info.url).to_owned())
        .collect())
}

/// Reads a report file and extracts its package identity set.
///
/// # Errors
///
/// Returns [`BuildError::FileNotFound`] when the report is missing,
/// [`BuildError::Io`] when it cannot be read, and
/// [`BuildError::PackageReport`] when it is malformed.
pub fn load_package_identities(path: &Utf8Path) -> Result<PackageSet, BuildError> {
    if !path.is_file() {
        return Err(BuildError::FileNotFound {
            path: path.to_owned(),
        });
    }
    let contents = fs::read_to_string(path)
        .map_err(|source| BuildError::io(format!("failed to read package report {path}"), source))?;
    parse_package_identities(&contents, path)
}
