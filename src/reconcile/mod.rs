//! Reconciler: one-way push of an encrypted local tree
//!
//! A run is two passes over the trees, both driven by explicit worklists so
//! deep hierarchies never grow the call stack:
//!
//! 1. the upload pass walks the local tree, mirrors directories, encrypts and
//!    uploads new or changed files and maintains the remote manifest;
//! 2. the prune pass (only with deletion enabled) walks the remote tree and
//!    removes entries that no longer have a local counterpart.
//!
//! The first error aborts the run. The manifest is only replaced after a
//! complete upload pass; checkpoints in between merge into the old one.

mod compare;
mod prune;
mod upload;

pub use compare::{decide_prune, decide_upload};

use crate::config::Config;
use crate::crypto::Encryptor;
use crate::filter::ExclusionSet;
use crate::remote::{probe_target, RemoteStore, TargetStatus};
use crate::types::SyncError;
use crate::ui::ProgressReporter;
use tracing::{debug, info};

/// Counters collected during a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub directories_visited: u64,
    pub files_checked: u64,
    pub files_uploaded: u64,
    pub bytes_uploaded: u64,
    pub files_excluded: u64,
    pub checkpoints_written: u64,
    pub remote_removed: u64,
    /// Local entries skipped because their remote name is taken
    pub name_conflicts: u64,
}

/// One reconciliation run against a remote store
pub struct Reconciler<'a, S: RemoteStore + ?Sized> {
    config: &'a Config,
    store: &'a S,
    filter: ExclusionSet,
    encryptor: Encryptor,
    progress: ProgressReporter,
}

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    /// # Errors
    /// * `SyncError::Pattern` if an exclude pattern doesn't compile
    pub fn new(config: &'a Config, store: &'a S) -> Result<Self, SyncError> {
        Ok(Self {
            config,
            store,
            filter: ExclusionSet::new(&config.exclude)?,
            encryptor: Encryptor::new(&config.passphrase, config.encryption),
            progress: ProgressReporter::hidden(),
        })
    }

    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    /// Run the upload pass, then the prune pass if deletion is enabled
    pub fn run(mut self) -> Result<SyncReport, SyncError> {
        self.validate_target()?;

        let mut report = SyncReport::default();
        self.upload_pass(&mut report)?;

        if self.config.delete_mode.is_enabled() {
            self.prune_pass(&mut report)?;
        } else {
            debug!("Deletion disabled, skipping remote check");
        }

        self.progress.finish();
        Ok(report)
    }

    /// The remote base must already exist as a directory; it is never created
    fn validate_target(&self) -> Result<(), SyncError> {
        info!("Connecting to {}...", self.store.describe());
        match probe_target(self.store)? {
            TargetStatus::Directory => Ok(()),
            TargetStatus::Missing | TargetStatus::NotADirectory => {
                Err(SyncError::TargetMissing(self.store.describe()))
            }
        }
    }
}
