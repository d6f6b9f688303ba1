//! # sealsync - Encrypting one-way synchronizer
//!
//! Pushes a local directory tree to a WebDAV share, encrypting every file
//! under a symmetric passphrase. A manifest stored next to the encrypted
//! objects records what was uploaded, so unchanged files are skipped on the
//! next run without downloading anything.

// Module declarations
pub mod commands;
pub mod config;
pub mod crypto;
pub mod filter;
pub mod logging;
pub mod manifest;
pub mod reconcile;
pub mod remote;
pub mod scanner;
pub mod types;
pub mod ui;

// Re-export commonly used types
pub use config::Config;
pub use reconcile::{Reconciler, SyncReport};
pub use remote::{LocalStore, RemoteStore, WebDavStore};
pub use types::{DeleteMode, Fingerprint, SyncError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
