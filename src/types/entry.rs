//! Local and remote entries, plus the fingerprint used for change detection

use camino::Utf8PathBuf;
use filetime::FileTime;
use serde::{Deserialize, Serialize};
use std::fs::Metadata;

/// Kind of a tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

impl EntryKind {
    /// Lower-case label used in log lines
    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Directory => "directory",
        }
    }
}

/// Cheap proxy for "file unchanged": modification time and size.
///
/// `modified_time` is nanoseconds since the UNIX epoch, so equality is exact
/// on every platform regardless of sub-second mtime support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub modified_time: i64,
    pub size: u64,
}

impl Fingerprint {
    pub fn new(modified_time: i64, size: u64) -> Self {
        Self {
            modified_time,
            size,
        }
    }

    /// Read the fingerprint of a local file from its metadata
    pub fn from_metadata(metadata: &Metadata) -> Self {
        let mtime = FileTime::from_last_modification_time(metadata);
        let nanos = mtime
            .unix_seconds()
            .saturating_mul(1_000_000_000)
            .saturating_add(i64::from(mtime.nanoseconds()));
        Self::new(nanos, metadata.len())
    }

    /// The recorded modification time, for restoring it on a local file
    pub fn file_time(&self) -> FileTime {
        let seconds = self.modified_time.div_euclid(1_000_000_000);
        let nanos = self.modified_time.rem_euclid(1_000_000_000) as u32;
        FileTime::from_unix_time(seconds, nanos)
    }
}

/// A file or directory found while walking the local tree
#[derive(Debug, Clone, PartialEq)]
pub struct LocalEntry {
    /// Relative path from the local base
    pub relative_path: Utf8PathBuf,

    pub kind: EntryKind,

    /// Present for files only
    pub fingerprint: Option<Fingerprint>,
}

impl LocalEntry {
    pub fn file(relative_path: Utf8PathBuf, fingerprint: Fingerprint) -> Self {
        Self {
            relative_path,
            kind: EntryKind::File,
            fingerprint: Some(fingerprint),
        }
    }

    pub fn directory(relative_path: Utf8PathBuf) -> Self {
        Self {
            relative_path,
            kind: EntryKind::Directory,
            fingerprint: None,
        }
    }

    /// Base name of the entry (empty for the root)
    pub fn file_name(&self) -> &str {
        self.relative_path.file_name().unwrap_or("")
    }
}

/// An entry listed from the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    /// Path relative to the remote base, `/`-separated, no leading slash
    pub name: String,

    pub kind: EntryKind,
}

impl RemoteEntry {
    pub fn new(name: impl Into<String>, kind: EntryKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}
