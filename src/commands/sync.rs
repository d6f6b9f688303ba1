//! Main sync command

use crate::reconcile::{Reconciler, SyncReport};
use crate::remote::{open_store, RemoteStore};
use crate::types::{ErrorKind, SyncError};
use crate::ui::ProgressReporter;
use crate::Config;
use indicatif::HumanBytes;

/// Run the sync operation against the store selected by `config.remote_base`
pub fn run(config: Config) -> Result<SyncReport, SyncError> {
    config.validate()?;
    let store = open_store(&config.remote_base, config.webdav.clone())?;
    run_with_store(&config, &store)
}

/// Run the sync operation against an already opened store
pub fn run_with_store<S: RemoteStore + ?Sized>(
    config: &Config,
    store: &S,
) -> Result<SyncReport, SyncError> {
    let progress = ProgressReporter::for_terminal(config.progress);
    let report = Reconciler::new(config, store)?
        .with_progress(progress)
        .run()?;
    println!("{}", format_report(&report));
    Ok(report)
}

fn format_report(report: &SyncReport) -> String {
    let mut summary = format!(
        "Done: {} uploaded ({}) | {} checked, {} excluded | {} dirs",
        report.files_uploaded,
        HumanBytes(report.bytes_uploaded),
        report.files_checked,
        report.files_excluded,
        report.directories_visited
    );
    if report.remote_removed > 0 {
        summary.push_str(&format!(" | {} removed from remote", report.remote_removed));
    }
    if report.name_conflicts > 0 {
        summary.push_str(&format!(" | {} skipped on name conflicts", report.name_conflicts));
    }
    summary
}

/// Plain-English description of a fatal error, with a suggestion when one helps
pub fn humanize_error(error: &SyncError) -> (String, Option<String>) {
    match error {
        SyncError::TargetMissing(_) => (
            error.to_string(),
            Some("Create the remote directory first; sealsync never creates its base.".to_string()),
        ),
        SyncError::RemoteUnavailable(msg) if msg.contains("authentication") => (
            error.to_string(),
            Some("Check --webdav-user and the password source.".to_string()),
        ),
        SyncError::RemoteUnavailable(_) => (
            error.to_string(),
            Some("Check the URL and network connectivity, or raise --timeout.".to_string()),
        ),
        SyncError::Config(msg) => (msg.clone(), None),
        SyncError::Pattern { .. } => (
            error.to_string(),
            Some("Patterns use shell wildcards: *, ?, [abc].".to_string()),
        ),
        SyncError::Decryption(_) => (
            error.to_string(),
            Some("Check the passphrase; it must match the one used for upload.".to_string()),
        ),
        SyncError::Manifest(_) => (
            error.to_string(),
            Some("Remove the remote manifest to force a full upload.".to_string()),
        ),
        SyncError::Io(io) => match io.kind() {
            std::io::ErrorKind::PermissionDenied => (
                "Permission denied while reading a local file".to_string(),
                Some("Check file permissions or run with a user that has access.".to_string()),
            ),
            std::io::ErrorKind::NotFound => (
                "A local file or directory disappeared during the run".to_string(),
                Some("Re-run the sync once the tree is stable.".to_string()),
            ),
            _ => (format!("Local I/O operation failed: {io}"), None),
        },
        _ => (error.to_string(), None),
    }
}

/// Short label for the error class
pub fn error_kind_label(error: &SyncError) -> &'static str {
    match error.kind() {
        ErrorKind::Configuration => "Configuration error",
        ErrorKind::RemoteUnavailable => "Remote unavailable",
        ErrorKind::Remote => "Remote error",
        ErrorKind::Encryption => "Encryption error",
        ErrorKind::LocalIo => "I/O error",
    }
}
