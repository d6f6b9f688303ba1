//! Shared helpers for integration tests
#![allow(dead_code)]

use filetime::{set_file_mtime, FileTime};
use sealsync::remote::LocalStore;
use sealsync::types::RemoteEntry;
use sealsync::{Config, RemoteStore, SyncError};
use std::cell::Cell;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Passphrase used by every integration test
pub const PASSPHRASE: &str = "integration-test-passphrase";

/// Local directory store that counts writes, so tests can assert "no
/// network write" properties
pub struct CountingStore {
    inner: LocalStore,
    uploads: Cell<usize>,
    removals: Cell<usize>,
    mkcols: Cell<usize>,
}

impl CountingStore {
    pub fn new(root: &Path) -> Self {
        Self {
            inner: LocalStore::new(root),
            uploads: Cell::new(0),
            removals: Cell::new(0),
            mkcols: Cell::new(0),
        }
    }

    /// Uploads of encrypted objects, manifest writes included
    pub fn uploads(&self) -> usize {
        self.uploads.get()
    }

    pub fn removals(&self) -> usize {
        self.removals.get()
    }

    pub fn directories_created(&self) -> usize {
        self.mkcols.get()
    }

    pub fn reset(&self) {
        self.uploads.set(0);
        self.removals.set(0);
        self.mkcols.set(0);
    }
}

impl RemoteStore for CountingStore {
    fn describe(&self) -> String {
        self.inner.describe()
    }

    fn exists(&self, path: &str) -> Result<bool, SyncError> {
        self.inner.exists(path)
    }

    fn is_directory(&self, path: &str) -> Result<bool, SyncError> {
        self.inner.is_directory(path)
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError> {
        self.inner.list(path)
    }

    fn make_directory(&self, path: &str) -> Result<(), SyncError> {
        self.mkcols.set(self.mkcols.get() + 1);
        self.inner.make_directory(path)
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<(), SyncError> {
        self.uploads.set(self.uploads.get() + 1);
        self.inner.upload(local, remote)
    }

    fn download_into(&self, remote: &str, sink: &mut dyn Write) -> Result<(), SyncError> {
        self.inner.download_into(remote, sink)
    }

    fn remove(&self, path: &str) -> Result<(), SyncError> {
        self.removals.set(self.removals.get() + 1);
        self.inner.remove(path)
    }
}

/// Config syncing `local` into `remote` with a cheap key derivation
pub fn config_for(local: &Path, remote: &Path) -> Config {
    let mut config = Config {
        local_base: local.to_path_buf(),
        remote_base: remote.display().to_string(),
        passphrase: PASSPHRASE.to_string(),
        ..Config::default()
    };
    config.encryption.iterations = 1_000;
    config
}

/// Write a file with `len` bytes and a fixed mtime
pub fn write_file(root: &Path, relative: &str, len: usize, mtime_secs: i64) {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, vec![b'x'; len]).expect("write file");
    set_file_mtime(&path, FileTime::from_unix_time(mtime_secs, 0)).expect("set mtime");
}

/// Parse the remote manifest as raw JSON
pub fn read_manifest(remote: &Path) -> serde_json::Value {
    let bytes = fs::read(remote.join(".sealsync-manifest.json")).expect("manifest exists");
    serde_json::from_slice(&bytes).expect("manifest is JSON")
}
