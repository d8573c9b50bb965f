//! Build directory preparation and archive assembly.
//!
//! A build starts from a fresh copy of the plugin in the build directory,
//! where vendor directories and the config schema are generated in place.
//! The source subdirectory is then packed into `source.tar.gz`, which is
//! bundled with the schema and manifest into the uncompressed plugin archive
//! and copied into the distribution directory.

use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use flate2::Compression;
use flate2::write::GzEncoder;
use plugpack_config::SourceDirName;
use tracing::{error, info};
use walkdir::WalkDir;

use crate::error::BuildError;
use crate::manifest::{PluginManifest, manifest_file_path};
use crate::schema::CONFIG_SCHEMA_FILE;

/// Tracing target for archive assembly.
const ARCHIVE_TARGET: &str = "plugpack_core::archive";

/// File name of the compressed source archive.
pub const SOURCE_ARCHIVE_FILE: &str = "source.tar.gz";

/// Substrings that mark development artefacts excluded from the source
/// archive.
pub const EXCLUDED_SOURCE_PATTERNS: [&str; 6] = [
    "__pycache__",
    ".mypy_cache",
    ".pytest_cache",
    ".git",
    ".gitignore",
    ".DS_Store",
];

/// Replaces the build directory with a fresh copy of the plugin directory.
///
/// A build directory nested inside the plugin directory is skipped while
/// copying.
///
/// # Errors
///
/// Returns [`BuildError::FileNotFound`] when the plugin directory is missing,
/// [`BuildError::BuildDirContainsPlugin`] when clearing the build directory
/// would delete the plugin, and [`BuildError::Io`] when the build directory
/// cannot be cleared or the copy fails.
pub fn prepare_build_dir(plugin_dir: &Utf8Path, build_dir: &Utf8Path) -> Result<(), BuildError> {
    if !plugin_dir.is_dir() {
        error!(target: ARCHIVE_TARGET, path = %plugin_dir, "plugin path does not exist");
        return Err(BuildError::FileNotFound {
            path: plugin_dir.to_owned(),
        });
    }

    if build_dir.exists() {
        if contains_path(build_dir, plugin_dir)? {
            error!(target: ARCHIVE_TARGET, build_dir = %build_dir, plugin_dir = %plugin_dir, "refusing to clear a build directory that holds the plugin");
            return Err(BuildError::BuildDirContainsPlugin {
                build_dir: build_dir.to_owned(),
                plugin_dir: plugin_dir.to_owned(),
            });
        }
        info!(target: ARCHIVE_TARGET, path = %build_dir, "clearing build directory");
        fs::remove_dir_all(build_dir).map_err(|source| {
            error!(target: ARCHIVE_TARGET, path = %build_dir, %source, "unable to clear build directory");
            BuildError::io(format!("failed to clear build directory {build_dir}"), source)
        })?;
    }

    info!(target: ARCHIVE_TARGET, from = %plugin_dir, to = %build_dir, "copying plugin code to build directory");
    copy_tree(plugin_dir.as_std_path(), build_dir.as_std_path()).map_err(|source| {
        error!(target: ARCHIVE_TARGET, from = %plugin_dir, to = %build_dir, %source, "unable to copy plugin code to build directory");
        BuildError::io(
            format!("failed to copy {plugin_dir} to {build_dir}"),
            source,
        )
    })
}

/// Whether `inner` resolves to `outer` or a path below it. Both must exist.
fn contains_path(outer: &Utf8Path, inner: &Utf8Path) -> Result<bool, BuildError> {
    let resolve = |path: &Utf8Path| {
        path.canonicalize_utf8()
            .map_err(|source| BuildError::io(format!("failed to resolve {path}"), source))
    };
    Ok(resolve(inner)?.starts_with(resolve(outer)?))
}

fn copy_tree(from: &Path, to: &Path) -> io::Result<()> {
    if !fs::metadata(from)?.is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotADirectory,
            format!("{} is not a directory", from.display()),
        ));
    }
    fs::create_dir_all(to)?;
    let walker = WalkDir::new(from)
        .follow_links(true)
        .min_depth(1)
        .into_iter()
        .filter_entry(|entry| entry.path() != to);
    for walked in walker {
        let entry = walked?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .map_err(|error| io::Error::other(error.to_string()))?;
        let destination = to.join(relative);
        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination)?;
        } else {
            copy_file_preserving_times(entry.path(), &destination)?;
        }
    }
    Ok(())
}

fn copy_file_preserving_times(from: &Path, to: &Path) -> io::Result<()> {
    fs::copy(from, to)?;
    let metadata = fs::metadata(from)?;
    let times = FileTimes::new()
        .set_accessed(metadata.accessed()?)
        .set_modified(metadata.modified()?);
    File::options().write(true).open(to)?.set_times(times)
}

fn is_excluded(relative: &Path) -> bool {
    let name = relative.to_string_lossy();
    EXCLUDED_SOURCE_PATTERNS
        .iter()
        .any(|pattern| name.contains(pattern))
}

/// Packs the source subdirectory into `source.tar.gz`.
///
/// Each immediate child of the source directory is added recursively at the
/// archive root, skipping any entry whose relative path contains one of
/// [`EXCLUDED_SOURCE_PATTERNS`]. Symbolic links are stored as links.
///
/// # Errors
///
/// Returns [`BuildError::FileNotFound`] when the source directory is
/// missing and [`BuildError::Archive`] when writing fails.
pub fn create_source_archive(
    build_dir: &Utf8Path,
    source_dir_name: &SourceDirName,
) -> Result<Utf8PathBuf, BuildError> {
    let source_dir = build_dir.join(source_dir_name.as_str());
    if !source_dir.is_dir() {
        error!(target: ARCHIVE_TARGET, path = %source_dir, "source directory does not exist");
        return Err(BuildError::FileNotFound { path: source_dir });
    }

    let archive = build_dir.join(SOURCE_ARCHIVE_FILE);
    info!(target: ARCHIVE_TARGET, path = %archive, "creating source archive");
    write_source_archive(source_dir.as_std_path(), archive.as_std_path())
        .map_err(|source| BuildError::archive(archive.clone(), source))?;
    Ok(archive)
}

fn write_source_archive(source_dir: &Path, archive: &Path) -> io::Result<()> {
    let encoder = GzEncoder::new(File::create(archive)?, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.follow_symlinks(false);

    let walker = WalkDir::new(source_dir)
        .follow_links(false)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry
                .path()
                .strip_prefix(source_dir)
                .is_ok_and(|relative| !is_excluded(relative))
        });
    for walked in walker {
        let entry = walked?;
        let relative = entry
            .path()
            .strip_prefix(source_dir)
            .map_err(|error| io::Error::other(error.to_string()))?;
        builder.append_path_with_name(entry.path(), relative)?;
    }

    builder.into_inner()?.finish()?;
    Ok(())
}

/// Bundles the source archive, config schema, and manifest into the plugin
/// archive `<name>-<type>.tar`, replacing any previous archive.
///
/// # Errors
///
/// Returns [`BuildError::FileNotFound`] when a member is missing,
/// [`BuildError::Io`] when the stale archive cannot be removed, and
/// [`BuildError::Archive`] when writing fails.
pub fn create_plugin_archive(
    build_dir: &Utf8Path,
    manifest: &PluginManifest,
) -> Result<Utf8PathBuf, BuildError> {
    let archive = build_dir.join(manifest.archive_file_name());
    if archive.exists() {
        info!(target: ARCHIVE_TARGET, path = %archive, "removing existing plugin archive");
        fs::remove_file(&archive).map_err(|source| {
            BuildError::io(format!("failed to remove {archive}"), source)
        })?;
    }

    let members = plugin_archive_members(build_dir);
    for member in &members {
        if !member.is_file() {
            error!(target: ARCHIVE_TARGET, path = %member, "plugin archive member is missing");
            return Err(BuildError::FileNotFound {
                path: member.clone(),
            });
        }
    }

    info!(target: ARCHIVE_TARGET, path = %archive, "creating plugin archive");
    write_plugin_archive(&archive, &members)
        .map_err(|source| BuildError::archive(archive.clone(), source))?;
    info!(target: ARCHIVE_TARGET, path = %archive, "plugin archive created");
    Ok(archive)
}

/// Files bundled into the plugin archive, in archive order.
#[must_use]
pub fn plugin_archive_members(build_dir: &Utf8Path) -> [Utf8PathBuf; 3] {
    [
        build_dir.join(SOURCE_ARCHIVE_FILE),
        build_dir.join(CONFIG_SCHEMA_FILE),
        manifest_file_path(build_dir),
    ]
}

fn write_plugin_archive(archive: &Utf8Path, members: &[Utf8PathBuf]) -> io::Result<()> {
    let mut builder = tar::Builder::new(File::create(archive)?);
    for member in members {
        let name = member
            .file_name()
            .ok_or_else(|| io::Error::other(format!("{member} has no file name")))?;
        builder.append_path_with_name(member, name)?;
    }
    builder.into_inner()?;
    Ok(())
}

/// Copies the plugin archive into the distribution directory, creating it
/// when absent and preserving the archive's timestamps.
///
/// # Errors
///
/// Returns [`BuildError::SameFile`] when the archive already sits in the
/// distribution directory and [`BuildError::Io`] when the directory cannot
/// be created or the copy fails.
pub fn copy_to_dist(archive: &Utf8Path, dist_dir: &Utf8Path) -> Result<Utf8PathBuf, BuildError> {
    if !dist_dir.exists() {
        info!(target: ARCHIVE_TARGET, path = %dist_dir, "creating dist directory");
        fs::create_dir_all(dist_dir).map_err(|source| {
            BuildError::io(format!("failed to create dist directory {dist_dir}"), source)
        })?;
    }

    let file_name = archive.file_name().ok_or_else(|| BuildError::FileNotFound {
        path: archive.to_owned(),
    })?;
    let destination = dist_dir.join(file_name);
    if destination.exists() && contains_path(archive, &destination)? {
        error!(target: ARCHIVE_TARGET, path = %archive, "distribution directory is the build directory");
        return Err(BuildError::SameFile {
            path: archive.to_owned(),
        });
    }
    info!(target: ARCHIVE_TARGET, from = %archive, to = %destination, "copying plugin archive");
    copy_file_preserving_times(archive.as_std_path(), destination.as_std_path()).map_err(
        |source| BuildError::io(format!("failed to copy {archive} to {destination}"), source),
    )?;
    Ok(destination)
}
