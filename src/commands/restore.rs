//! Restore command: pull the encrypted remote tree back into a local directory

use crate::crypto::decrypt;
use crate::filter::ExclusionSet;
use crate::manifest::{Manifest, ManifestStore};
use crate::remote::{open_store, probe_target, RemoteStore, TargetStatus};
use crate::types::path::{is_manifest, local_path_for_dir, local_path_for_file};
use crate::types::{EntryKind, RemoteEntry, SyncError};
use crate::Config;
use camino::Utf8Path;
use indicatif::HumanBytes;
use std::fs;
use std::io::{BufReader, Seek, SeekFrom};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Counters collected during a restore
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub files_restored: u64,
    pub bytes_restored: u64,
    /// Already present locally (without `--force`) or blocked by a directory
    pub files_skipped: u64,
    pub files_excluded: u64,
    /// Remote objects without the encrypted suffix
    pub foreign_objects: u64,
}

/// Restore from the store selected by `config.remote_base`
pub fn run(config: Config) -> Result<RestoreReport, SyncError> {
    config.validate()?;
    let store = open_store(&config.remote_base, config.webdav.clone())?;
    run_with_store(&config, &store)
}

/// Restore from an already opened store into `config.local_base`
pub fn run_with_store<S: RemoteStore + ?Sized>(
    config: &Config,
    store: &S,
) -> Result<RestoreReport, SyncError> {
    let filter = ExclusionSet::new(&config.exclude)?;
    if probe_target(store)? != TargetStatus::Directory {
        return Err(SyncError::TargetMissing(store.describe()));
    }

    let manifest = ManifestStore::new(store).load()?;
    let restorer = Restorer {
        config,
        store,
        filter,
        manifest,
    };

    info!("Restoring {} into {}...", store.describe(), config.local_base.display());
    let report = restorer.run()?;
    println!("{}", format_report(&report));
    Ok(report)
}

struct Restorer<'a, S: RemoteStore + ?Sized> {
    config: &'a Config,
    store: &'a S,
    filter: ExclusionSet,
    manifest: Manifest,
}

impl<'a, S: RemoteStore + ?Sized> Restorer<'a, S> {
    fn run(&self) -> Result<RestoreReport, SyncError> {
        let mut report = RestoreReport::default();
        let mut worklist: Vec<String> = vec![String::new()];

        while let Some(dir) = worklist.pop() {
            let mut entries = self.store.list(&dir)?;
            entries.sort_by(|a, b| a.name.cmp(&b.name));

            let mut subdirs = Vec::new();
            for entry in entries {
                if dir.is_empty() && is_manifest(&entry.name) {
                    continue;
                }
                match entry.kind {
                    EntryKind::Directory => {
                        if self.prepare_directory(&entry.name, &mut report)? {
                            subdirs.push(entry.name);
                        }
                    }
                    EntryKind::File => self.restore_file(&entry, &mut report)?,
                }
            }
            // Reversed so the stack pops subdirectories in sorted order
            worklist.extend(subdirs.into_iter().rev());
        }
        Ok(report)
    }

    /// Create the local counterpart of a remote directory; false to skip its subtree
    fn prepare_directory(&self, remote: &str, report: &mut RestoreReport) -> Result<bool, SyncError> {
        let local = local_path_for_dir(remote);
        if self.filter.is_excluded(&local) {
            debug!("Skipping excluded dir '{local}'");
            return Ok(false);
        }

        let target = self.config.local_base.join(local.as_std_path());
        match fs::symlink_metadata(&target) {
            Ok(metadata) if metadata.is_dir() => Ok(true),
            Ok(_) => {
                warn!("Skipping dir '{remote}': '{local}' exists locally and is not a directory");
                report.files_skipped += 1;
                Ok(false)
            }
            Err(_) => {
                debug!("Creating local dir '{local}'");
                fs::create_dir(&target)?;
                Ok(true)
            }
        }
    }

    fn restore_file(&self, entry: &RemoteEntry, report: &mut RestoreReport) -> Result<(), SyncError> {
        let Some(local) = local_path_for_file(&entry.name) else {
            debug!("Skipping foreign object '{}'", entry.name);
            report.foreign_objects += 1;
            return Ok(());
        };
        if let Some(pattern) = self.filter.matching_pattern(&local) {
            debug!("Skipping '{local}': excluded by '{pattern}'");
            report.files_excluded += 1;
            return Ok(());
        }

        let target = self.config.local_base.join(local.as_std_path());
        match fs::symlink_metadata(&target) {
            Ok(metadata) if metadata.is_dir() => {
                warn!("Skipping '{}': local dir '{local}' is in the way", entry.name);
                report.files_skipped += 1;
                return Ok(());
            }
            Ok(_) if !self.config.force => {
                debug!("Skipping '{local}': already exists");
                report.files_skipped += 1;
                return Ok(());
            }
            _ => {}
        }

        info!("Restoring file '{local}'...");
        let size = self.fetch_and_decrypt(&entry.name, &local, &target)?;

        if let Some(fingerprint) = self.manifest.get(&entry.name) {
            if let Err(e) = filetime::set_file_mtime(&target, fingerprint.file_time()) {
                warn!("Failed to set modification time on '{local}': {e}");
            }
        }

        report.files_restored += 1;
        report.bytes_restored += size;
        Ok(())
    }

    /// Download `remote`, decrypt it next to `target` and move it into place
    fn fetch_and_decrypt(&self, remote: &str, local: &Utf8Path, target: &Path) -> Result<u64, SyncError> {
        let mut encrypted = tempfile::tempfile()?;
        self.store.download_into(remote, &mut encrypted)?;
        encrypted.seek(SeekFrom::Start(0))?;

        let parent = target.parent().unwrap_or(self.config.local_base.as_path());
        let mut plain = NamedTempFile::new_in(parent)?;
        let artifact = decrypt(
            &mut BufReader::new(encrypted),
            plain.as_file_mut(),
            &self.config.passphrase,
        )
        .map_err(|e| SyncError::Decryption(format!("'{remote}': {e}")))?;

        if Some(artifact.filename.as_str()) != local.file_name() {
            warn!(
                "'{remote}' was encrypted from a file named '{}'",
                artifact.filename
            );
        }

        let size = plain.as_file().metadata()?.len();
        // On failure the temporary file is dropped and removed
        plain.persist(target).map_err(|e| SyncError::Io(e.error))?;
        Ok(size)
    }
}

fn format_report(report: &RestoreReport) -> String {
    let mut summary = format!(
        "Restored: {} files ({}) | {} skipped, {} excluded",
        report.files_restored,
        HumanBytes(report.bytes_restored),
        report.files_skipped,
        report.files_excluded
    );
    if report.foreign_objects > 0 {
        summary.push_str(&format!(" | {} foreign objects ignored", report.foreign_objects));
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_report_contains_counts() {
        let report = RestoreReport {
            files_restored: 4,
            bytes_restored: 3 * 1024 * 1024,
            files_skipped: 1,
            files_excluded: 2,
            foreign_objects: 0,
        };
        let summary = format_report(&report);
        assert!(summary.contains("4 files"));
        assert!(summary.contains("MiB"), "expected human-readable size, got: {summary}");
        assert!(summary.contains("1 skipped"));
        assert!(!summary.contains("foreign"));
    }

    #[test]
    fn test_format_report_mentions_foreign_objects() {
        let report = RestoreReport {
            foreign_objects: 3,
            ..RestoreReport::default()
        };
        assert!(format_report(&report).contains("3 foreign objects ignored"));
    }
}
