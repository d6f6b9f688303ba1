//! Pure decision functions of the reconciler

use crate::types::{DeleteMode, EntryKind, FileAction, Fingerprint, PruneAction, UploadReason};

/// Decide whether a local file must be (re-)uploaded
///
/// Upload is needed when any holds, checked in this order:
/// 1. `force` is set
/// 2. no remote object exists at the encrypted path
/// 3. the manifest has no record for it
/// 4. the recorded fingerprint differs from the current one
///
/// Fingerprints are compared exactly; no content is read.
pub fn decide_upload(
    force: bool,
    remote_present: bool,
    recorded: Option<&Fingerprint>,
    current: &Fingerprint,
) -> FileAction {
    if force {
        return FileAction::Upload(UploadReason::Forced);
    }
    if !remote_present {
        return FileAction::Upload(UploadReason::MissingRemote);
    }
    match recorded {
        None => FileAction::Upload(UploadReason::MissingRecord),
        Some(recorded) if recorded != current => FileAction::Upload(UploadReason::Changed),
        Some(_) => FileAction::Skip,
    }
}

/// Decide what happens to one remote entry in the prune pass
///
/// `local_kind` is the kind of the local entry the remote name maps back to
/// (`None` when there is none, or the name carries no encryption suffix).
/// Exclusion protects an entry unless `mode` also prunes excluded entries;
/// otherwise an entry survives only if the local side has the same kind.
pub fn decide_prune(
    remote_kind: EntryKind,
    local_kind: Option<EntryKind>,
    excluded: bool,
    mode: DeleteMode,
) -> PruneAction {
    if excluded {
        return if mode == DeleteMode::OrphansAndExcluded {
            PruneAction::RemoveExcluded
        } else {
            PruneAction::KeepExcluded
        };
    }
    if local_kind == Some(remote_kind) {
        PruneAction::Keep
    } else {
        PruneAction::RemoveOrphan
    }
}
