//! Remote store adapters
//!
//! Every operation is addressed by a `/`-separated path relative to the
//! adapter's fixed base; the empty path is the base itself. All calls are
//! blocking.

mod local;
mod multistatus;
mod webdav;

pub use local::LocalStore;
pub use multistatus::{parse_multistatus, DavResource};
pub use webdav::{WebDavOptions, WebDavStore};

use crate::types::{RemoteEntry, SyncError};
use std::io::Write;
use std::path::Path;

/// Hierarchical remote store
pub trait RemoteStore {
    /// Human-readable location of the base, for log lines
    fn describe(&self) -> String;

    fn exists(&self, path: &str) -> Result<bool, SyncError>;

    /// # Errors
    /// * `SyncError::RemoteNotFound` if nothing exists at `path`
    fn is_directory(&self, path: &str) -> Result<bool, SyncError>;

    /// Immediate children of a directory (not recursive)
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError>;

    /// # Errors
    /// * `SyncError::RemoteConflict` if a non-directory occupies `path`
    fn make_directory(&self, path: &str) -> Result<(), SyncError>;

    /// Upload a local file, overwriting any existing object
    fn upload(&self, local: &Path, remote: &str) -> Result<(), SyncError>;

    fn download_into(&self, remote: &str, sink: &mut dyn Write) -> Result<(), SyncError>;

    /// Remove a file, or a directory with all its descendants
    fn remove(&self, path: &str) -> Result<(), SyncError>;
}

/// Result of probing the configured remote base at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetStatus {
    Directory,
    NotADirectory,
    Missing,
}

/// Probe the remote base; "not found" is an outcome here, not an error
pub fn probe_target<S: RemoteStore + ?Sized>(store: &S) -> Result<TargetStatus, SyncError> {
    match store.is_directory("") {
        Ok(true) => Ok(TargetStatus::Directory),
        Ok(false) => Ok(TargetStatus::NotADirectory),
        Err(e) if e.is_not_found() => Ok(TargetStatus::Missing),
        Err(e) => Err(e),
    }
}

/// Open the adapter matching `remote_base`: `http(s)://` selects WebDAV,
/// anything else (optionally `file://`) a local directory.
pub fn open_store(remote_base: &str, options: WebDavOptions) -> Result<Box<dyn RemoteStore>, SyncError> {
    if remote_base.starts_with("http://") || remote_base.starts_with("https://") {
        Ok(Box::new(WebDavStore::new(remote_base, options)?))
    } else {
        let path = remote_base.strip_prefix("file://").unwrap_or(remote_base);
        Ok(Box::new(LocalStore::new(path)))
    }
}

impl<S: RemoteStore + ?Sized> RemoteStore for Box<S> {
    fn describe(&self) -> String {
        (**self).describe()
    }
    fn exists(&self, path: &str) -> Result<bool, SyncError> {
        (**self).exists(path)
    }
    fn is_directory(&self, path: &str) -> Result<bool, SyncError> {
        (**self).is_directory(path)
    }
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError> {
        (**self).list(path)
    }
    fn make_directory(&self, path: &str) -> Result<(), SyncError> {
        (**self).make_directory(path)
    }
    fn upload(&self, local: &Path, remote: &str) -> Result<(), SyncError> {
        (**self).upload(local, remote)
    }
    fn download_into(&self, remote: &str, sink: &mut dyn Write) -> Result<(), SyncError> {
        (**self).download_into(remote, sink)
    }
    fn remove(&self, path: &str) -> Result<(), SyncError> {
        (**self).remove(path)
    }
}
