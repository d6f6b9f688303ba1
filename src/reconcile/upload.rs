//! Upload pass: local tree → encrypted remote objects

use super::compare::decide_upload;
use super::{Reconciler, SyncReport};
use crate::manifest::{Manifest, ManifestStore};
use crate::remote::RemoteStore;
use crate::scanner::read_local_dir;
use crate::types::path::{encrypted_name, is_manifest, remote_name};
use crate::types::{EntryKind, FileAction, Fingerprint, SyncError, UploadReason};
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Manifest state threaded through the pass
struct UploadState {
    /// As loaded at the start of the run; never modified
    previous: Manifest,
    /// Every non-excluded file seen so far
    seen: Manifest,
}

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    pub(super) fn upload_pass(&mut self, report: &mut SyncReport) -> Result<(), SyncError> {
        let manifests = ManifestStore::new(self.store);
        let mut state = UploadState {
            previous: manifests.load()?,
            seen: Manifest::new(),
        };

        info!("Checking files...");
        self.progress.start_phase("Checking files...");

        let mut worklist: Vec<Utf8PathBuf> = vec![Utf8PathBuf::new()];
        while let Some(dir) = worklist.pop() {
            if !dir.as_str().is_empty() && self.filter.is_excluded(&dir) {
                debug!("Skipping excluded dir '{dir}'");
                continue;
            }
            self.visit_directory(&dir, &mut state, &mut worklist, report)?;
        }

        manifests.replace(&state.seen)?;
        Ok(())
    }

    fn visit_directory(
        &mut self,
        dir: &Utf8Path,
        state: &mut UploadState,
        worklist: &mut Vec<Utf8PathBuf>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        debug!("Checking dir '{dir}'...");
        let remote_dir = remote_name(dir);
        if !remote_dir.is_empty() {
            self.ensure_remote_directory(&remote_dir)?;
        }

        let listing = read_local_dir(&self.config.local_base, dir)?;
        let remote_children: HashMap<String, EntryKind> = self
            .store
            .list(&remote_dir)?
            .into_iter()
            .map(|entry| (entry.name, entry.kind))
            .collect();
        let local_dirs: HashSet<String> = listing
            .dirs
            .iter()
            .filter(|sub| !self.filter.is_excluded(&sub.relative_path))
            .map(|sub| remote_name(&sub.relative_path))
            .collect();

        for file in &listing.files {
            let Some(fingerprint) = file.fingerprint else {
                continue;
            };
            self.visit_file(
                &file.relative_path,
                fingerprint,
                &remote_children,
                &local_dirs,
                state,
                report,
            )?;
        }

        // Reversed so the stack pops subdirectories in sorted order
        for sub in listing.dirs.into_iter().rev() {
            if is_manifest(&remote_name(&sub.relative_path)) {
                warn!("Skipping dir '{}': its name is reserved for the manifest", sub.relative_path);
                report.name_conflicts += 1;
                continue;
            }
            worklist.push(sub.relative_path);
        }

        report.directories_visited += 1;
        Ok(())
    }

    /// Create `path` remotely, replacing a file that occupies it
    fn ensure_remote_directory(&self, path: &str) -> Result<(), SyncError> {
        if self.store.exists(path)? {
            if self.store.is_directory(path)? {
                return Ok(());
            }
            info!("Remove file '{path}' from remote, a directory replaces it");
            self.store.remove(path)?;
        }
        debug!("Creating remote dir '{path}'");
        self.store.make_directory(path)
    }

    fn visit_file(
        &mut self,
        relative: &Utf8Path,
        fingerprint: Fingerprint,
        remote_children: &HashMap<String, EntryKind>,
        local_dirs: &HashSet<String>,
        state: &mut UploadState,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        if let Some(pattern) = self.filter.matching_pattern(relative) {
            debug!("Skipping '{relative}': excluded by '{pattern}'");
            report.files_excluded += 1;
            return Ok(());
        }

        debug!("Checking file '{relative}'...");
        report.files_checked += 1;
        self.progress.file_checked();

        let remote = encrypted_name(relative);
        // A sibling directory already maps to this remote name
        if local_dirs.contains(&remote) {
            warn!("Skipping file '{relative}': local dir '{remote}' has the same remote name");
            report.name_conflicts += 1;
            return Ok(());
        }

        let mut remote_kind = remote_children.get(&remote).copied();
        if remote_kind == Some(EntryKind::Directory) {
            info!("Remove dir '{remote}' from remote, a file replaces it");
            self.store.remove(&remote)?;
            remote_kind = None;
        }

        let action = decide_upload(
            self.config.force,
            remote_kind.is_some(),
            state.previous.get(&remote),
            &fingerprint,
        );

        match action {
            FileAction::Skip => {
                state.seen.insert(remote, fingerprint);
            }
            FileAction::Upload(reason) => {
                self.upload_file(relative, &remote, reason, report)?;
                state.seen.insert(remote, fingerprint);

                if report.files_uploaded % self.config.save_metadata_step.max(1) as u64 == 0 {
                    ManifestStore::new(self.store).checkpoint(&state.previous, &state.seen)?;
                    report.checkpoints_written += 1;
                }
            }
        }
        Ok(())
    }

    fn upload_file(
        &mut self,
        relative: &Utf8Path,
        remote: &str,
        reason: UploadReason,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        info!("Uploading file '{remote}'...");
        debug!("'{relative}' needs upload: {}", reason.describe());
        self.progress.set_current("Uploading", remote);

        let artifact = self
            .encryptor
            .encrypt(&self.config.local_base.join(relative.as_std_path()))?;
        // On failure the artifact is dropped here and its file removed
        self.store.upload(artifact.path(), remote)?;

        let size = artifact.size();
        if let Err(e) = artifact.close() {
            warn!("Failed to remove temporary file for '{remote}': {e}");
        }

        report.files_uploaded += 1;
        report.bytes_uploaded += size;
        self.progress.file_uploaded(size);
        Ok(())
    }
}
