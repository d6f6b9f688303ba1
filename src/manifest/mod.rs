//! Remote manifest: encrypted remote path → fingerprint
//!
//! The manifest is the only durable memory of prior runs. It is loaded once,
//! checkpointed mid-run as `merge(previous, seen_so_far)` so a crash does not
//! erase history for files not yet visited, and finally replaced with exactly
//! the files seen by a completed pass.

use crate::remote::RemoteStore;
use crate::types::path::MANIFEST_NAME;
use crate::types::{Fingerprint, SyncError};
use std::collections::BTreeMap;
use std::io::Write;
use tempfile::NamedTempFile;
use tracing::info;

/// Mapping from encrypted remote path to fingerprint.
///
/// A `BTreeMap` keeps the JSON encoding canonical: an unchanged mapping
/// always serializes to the same bytes.
pub type Manifest = BTreeMap<String, Fingerprint>;

/// Union of `base` and `delta`, `delta` winning on key collision
pub fn merge(base: &Manifest, delta: &Manifest) -> Manifest {
    let mut merged = base.clone();
    merged.extend(delta.iter().map(|(k, v)| (k.clone(), *v)));
    merged
}

/// Compact JSON encoding
pub fn encode(manifest: &Manifest) -> Result<Vec<u8>, SyncError> {
    serde_json::to_vec(manifest).map_err(|e| SyncError::Manifest(format!("failed to serialize: {e}")))
}

pub fn decode(bytes: &[u8]) -> Result<Manifest, SyncError> {
    serde_json::from_slice(bytes).map_err(|e| SyncError::Manifest(format!("failed to parse {MANIFEST_NAME}: {e}")))
}

/// Reads and writes the manifest object at the root of a remote store
pub struct ManifestStore<'a, S: RemoteStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: RemoteStore + ?Sized> ManifestStore<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Load the manifest, or an empty one if no manifest object exists
    pub fn load(&self) -> Result<Manifest, SyncError> {
        info!("Loading manifest from remote dir...");
        if !self.store.exists(MANIFEST_NAME)? {
            return Ok(Manifest::new());
        }
        let mut bytes = Vec::new();
        self.store.download_into(MANIFEST_NAME, &mut bytes)?;
        decode(&bytes)
    }

    /// Mid-run write: upload `merge(base, delta)`; neither input is modified
    pub fn checkpoint(&self, base: &Manifest, delta: &Manifest) -> Result<(), SyncError> {
        self.write(&merge(base, delta))
    }

    /// End-of-pass write: the remote manifest becomes exactly `complete`
    pub fn replace(&self, complete: &Manifest) -> Result<(), SyncError> {
        self.write(complete)
    }

    fn write(&self, manifest: &Manifest) -> Result<(), SyncError> {
        info!("Uploading manifest to remote dir...");
        let bytes = encode(manifest)?;
        let mut temp = NamedTempFile::new()?;
        temp.write_all(&bytes)?;
        temp.flush()?;
        self.store.upload(temp.path(), MANIFEST_NAME)
    }
}
