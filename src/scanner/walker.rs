//! One-level reader for local directories
//!
//! The reconciler drives traversal itself with an explicit worklist, so this
//! only lists the immediate children of one directory, sorted by name.

use crate::types::{EntryKind, Fingerprint, LocalEntry, SyncError};
use camino::Utf8Path;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Immediate children of one local directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalDirListing {
    pub files: Vec<LocalEntry>,
    pub dirs: Vec<LocalEntry>,
}

/// List the regular files and subdirectories of `base/relative`
///
/// # Arguments
/// * `base` - The local base directory
/// * `relative` - Directory to read, relative to `base` (empty for the root)
///
/// # Errors
/// * I/O errors reading the directory itself are returned; a directory that
///   disappears mid-walk is fatal.
/// * Children whose metadata cannot be read, broken symlinks, special files
///   and non-UTF-8 names are skipped with a warning.
pub fn read_local_dir(base: &Path, relative: &Utf8Path) -> Result<LocalDirListing, SyncError> {
    let dir = base.join(relative.as_std_path());
    let mut listing = LocalDirListing::default();

    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        let name = match entry.file_name().into_string() {
            Ok(name) => name,
            Err(raw) => {
                warn!(
                    "Skipping '{}': file name is not valid UTF-8",
                    dir.join(raw).display()
                );
                continue;
            }
        };
        let child = relative.join(&name);

        let file_type = match entry.file_type() {
            Ok(ft) => ft,
            Err(e) => {
                warn!("Skipping '{child}': failed to read file type: {e}");
                continue;
            }
        };

        if file_type.is_dir() {
            listing.dirs.push(LocalEntry::directory(child));
            continue;
        }

        // Follows symlinks: a link to a regular file is synced as that file
        let metadata = match fs::metadata(entry.path()) {
            Ok(m) => m,
            Err(e) => {
                warn!("Skipping '{child}': failed to read metadata: {e}");
                continue;
            }
        };

        if metadata.is_file() {
            listing
                .files
                .push(LocalEntry::file(child, Fingerprint::from_metadata(&metadata)));
        } else if metadata.is_dir() {
            debug!("Not descending into symlinked directory '{child}'");
        } else {
            warn!("Skipping '{child}': not a regular file");
        }
    }

    listing.files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    listing.dirs.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(listing)
}

/// Check that `path` is an existing, readable directory
pub fn check_local_base(path: &Path) -> Result<(), SyncError> {
    let metadata = fs::metadata(path).map_err(|_| {
        SyncError::Config(format!(
            "Directory {} doesn't exist or isn't readable",
            path.display()
        ))
    })?;
    if !metadata.is_dir() {
        return Err(SyncError::Config(format!(
            "{} is not a directory",
            path.display()
        )));
    }
    fs::read_dir(path).map_err(|e| {
        SyncError::Config(format!("Directory {} isn't readable: {e}", path.display()))
    })?;
    Ok(())
}

/// Kind of the local entry at `relative`, as the upload pass sees it.
///
/// A symlink counts as a file only when it points to a regular file. Links
/// to directories are never descended into, so they report `None`.
pub fn local_kind(base: &Path, relative: &Utf8Path) -> Option<EntryKind> {
    let path = base.join(relative.as_std_path());
    let mut metadata = fs::symlink_metadata(&path).ok()?;
    if metadata.file_type().is_symlink() {
        metadata = fs::metadata(&path).ok()?;
        return metadata.is_file().then_some(EntryKind::File);
    }
    if metadata.is_dir() {
        Some(EntryKind::Directory)
    } else if metadata.is_file() {
        Some(EntryKind::File)
    } else {
        None
    }
}
