//! Decisions taken by the reconciler

/// Why a file has to be (re-)uploaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadReason {
    /// `--force` bypasses the fingerprint comparison
    Forced,

    /// No remote object at the encrypted path
    MissingRemote,

    /// The manifest has no record for the encrypted path
    MissingRecord,

    /// Recorded fingerprint differs from the local one
    Changed,
}

impl UploadReason {
    pub fn describe(&self) -> &'static str {
        match self {
            UploadReason::Forced => "forced",
            UploadReason::MissingRemote => "not on remote",
            UploadReason::MissingRecord => "not in manifest",
            UploadReason::Changed => "modified",
        }
    }
}

/// Outcome of comparing a local file against remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileAction {
    Upload(UploadReason),

    /// Remote copy is up to date, no network write
    Skip,
}

impl FileAction {
    pub fn is_upload(&self) -> bool {
        matches!(self, FileAction::Upload(_))
    }
}

/// Outcome of checking one remote entry in the prune pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneAction {
    /// No local counterpart, remove it
    RemoveOrphan,

    /// Excluded and `--delete-excluded` is in effect
    RemoveExcluded,

    /// Excluded, kept because exclusion protects it
    KeepExcluded,

    /// Local counterpart exists
    Keep,
}

impl PruneAction {
    pub fn is_remove(&self) -> bool {
        matches!(self, PruneAction::RemoveOrphan | PruneAction::RemoveExcluded)
    }
}

/// Delete behavior for the prune pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeleteMode {
    /// Don't prune anything
    #[default]
    None,

    /// Prune orphans, exclusion protects remote entries
    Orphans,

    /// Prune orphans and every excluded remote entry
    OrphansAndExcluded,
}

impl DeleteMode {
    /// Combine the `--delete` and `--delete-excluded` flags
    pub fn from_flags(delete: bool, delete_excluded: bool) -> Self {
        match (delete, delete_excluded) {
            (false, _) => DeleteMode::None,
            (true, false) => DeleteMode::Orphans,
            (true, true) => DeleteMode::OrphansAndExcluded,
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self != DeleteMode::None
    }
}
