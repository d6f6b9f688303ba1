//! Core type definitions for sealsync

mod action;
mod entry;
mod error;
pub mod path;

pub use action::{DeleteMode, FileAction, PruneAction, UploadReason};
pub use entry::{EntryKind, Fingerprint, LocalEntry, RemoteEntry};
pub use error::{ErrorKind, SyncError};
