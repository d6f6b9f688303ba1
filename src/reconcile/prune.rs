//! Prune pass: remove remote entries without a local counterpart

use super::compare::decide_prune;
use super::{Reconciler, SyncReport};
use crate::remote::RemoteStore;
use crate::scanner::local_kind;
use crate::types::path::{is_manifest, local_path_for_dir, local_path_for_file};
use crate::types::{EntryKind, PruneAction, RemoteEntry, SyncError};
use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info};

impl<'a, S: RemoteStore + ?Sized> Reconciler<'a, S> {
    pub(super) fn prune_pass(&mut self, report: &mut SyncReport) -> Result<(), SyncError> {
        info!("Checking remote files...");
        self.progress.start_phase("Checking remote files...");

        let mut worklist: Vec<String> = vec![String::new()];
        while let Some(dir) = worklist.pop() {
            let mut subdirs = Vec::new();
            for entry in self.store.list(&dir)? {
                if dir.is_empty() && is_manifest(&entry.name) {
                    continue;
                }
                if self.prune_entry(&entry, report)? == PruneAction::Keep && entry.is_dir() {
                    subdirs.push(entry.name);
                }
            }
            worklist.extend(subdirs.into_iter().rev());
        }
        Ok(())
    }

    /// Classify one remote entry and remove it if needed
    fn prune_entry(
        &mut self,
        entry: &RemoteEntry,
        report: &mut SyncReport,
    ) -> Result<PruneAction, SyncError> {
        let mapped: Option<Utf8PathBuf> = match entry.kind {
            EntryKind::File => local_path_for_file(&entry.name),
            EntryKind::Directory => Some(local_path_for_dir(&entry.name)),
        };

        let (local, excluded) = match &mapped {
            Some(path) => (
                local_kind(&self.config.local_base, path),
                self.filter.is_excluded(path),
            ),
            // Not produced by us; still subject to exclusion by its own name
            None => (None, self.filter.is_excluded(Utf8Path::new(&entry.name))),
        };

        let action = decide_prune(entry.kind, local, excluded, self.config.delete_mode);
        if action.is_remove() {
            info!("Remove {} '{}' from remote", entry.kind.label(), entry.name);
            self.progress.set_current("Removing", &entry.name);
            self.store.remove(&entry.name)?;
            report.remote_removed += 1;
        } else if action == PruneAction::KeepExcluded {
            debug!("Keeping excluded {} '{}'", entry.kind.label(), entry.name);
        }
        Ok(action)
    }
}
