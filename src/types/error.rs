//! Error types for sealsync

use std::path::PathBuf;
use thiserror::Error;

/// Error types for sealsync operations
#[derive(Debug, Error)]
pub enum SyncError {
    /// Standard IO error (automatically converted via #[from])
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration (bad local directory, missing passphrase, ...)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Exclusion pattern could not be compiled
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    Pattern { pattern: String, reason: String },

    /// Shell command used to fetch a credential failed
    #[error("Credential command `{command}` failed: {reason}")]
    CredentialCommand { command: String, reason: String },

    /// Connectivity, TLS or authentication failure talking to the remote store
    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    /// The remote base directory does not exist
    #[error("Remote directory '{0}' doesn't exist")]
    TargetMissing(String),

    /// A remote resource was not found
    #[error("Remote resource not found: {path}")]
    RemoteNotFound { path: String },

    /// A remote path is occupied by an entry of the wrong kind
    #[error("Remote path '{path}' is occupied: {reason}")]
    RemoteConflict { path: String, reason: String },

    /// The remote store answered with an unexpected status
    #[error("Remote store returned {status} for '{path}'")]
    RemoteStatus { status: u16, path: String },

    /// Encrypting a local file failed
    #[error("Encryption failed for {path}: {reason}")]
    Encryption { path: PathBuf, reason: String },

    /// Decrypting an artifact failed
    #[error("Decryption failed: {0}")]
    Decryption(String),

    /// The manifest could not be parsed or serialized
    #[error("Manifest error: {0}")]
    Manifest(String),
}

/// Taxonomy of fatal conditions, used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    RemoteUnavailable,
    Remote,
    Encryption,
    LocalIo,
}

impl SyncError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Config(_) | SyncError::Pattern { .. } | SyncError::CredentialCommand { .. } => {
                ErrorKind::Configuration
            }
            SyncError::RemoteUnavailable(_) | SyncError::TargetMissing(_) => {
                ErrorKind::RemoteUnavailable
            }
            SyncError::RemoteNotFound { .. }
            | SyncError::RemoteConflict { .. }
            | SyncError::RemoteStatus { .. }
            | SyncError::Manifest(_) => ErrorKind::Remote,
            SyncError::Encryption { .. } | SyncError::Decryption(_) => ErrorKind::Encryption,
            SyncError::Io(_) => ErrorKind::LocalIo,
        }
    }

    /// Check if this error means "resource not found" on the remote side
    pub fn is_not_found(&self) -> bool {
        matches!(self, SyncError::RemoteNotFound { .. })
    }

    /// Check if this error is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoError, ErrorKind as IoErrorKind};

    #[test]
    fn test_io_error_automatic_conversion() {
        let io_error = IoError::new(IoErrorKind::NotFound, "file not found");
        let error: SyncError = io_error.into();

        assert!(matches!(error, SyncError::Io(_)));
        assert!(error.to_string().contains("IO error"));
        assert_eq!(error.kind(), ErrorKind::LocalIo);
    }

    #[test]
    fn test_io_error_from_function() {
        fn returns_io_error() -> Result<(), SyncError> {
            let _file = std::fs::File::open("/nonexistent/path/file.txt")?;
            Ok(())
        }

        let result = returns_io_error();
        assert!(matches!(result.unwrap_err(), SyncError::Io(_)));
    }

    #[test]
    fn test_config_error() {
        let error = SyncError::Config("Passphrase is not set".to_string());
        assert!(error.to_string().contains("Configuration error"));
        assert!(error.to_string().contains("Passphrase is not set"));
        assert!(error.is_configuration_error());
    }

    #[test]
    fn test_pattern_and_command_errors_are_configuration() {
        let pattern = SyncError::Pattern {
            pattern: "[".to_string(),
            reason: "unclosed class".to_string(),
        };
        assert!(pattern.is_configuration_error());
        assert!(pattern.to_string().contains("'['"));

        let command = SyncError::CredentialCommand {
            command: "pass show dav".to_string(),
            reason: "exit status 1".to_string(),
        };
        assert!(command.is_configuration_error());
        assert!(command.to_string().contains("pass show dav"));
    }

    #[test]
    fn test_target_missing_is_remote_unavailable() {
        let error = SyncError::TargetMissing("https://example.org/dav/backup".to_string());
        assert_eq!(error.kind(), ErrorKind::RemoteUnavailable);
        assert!(error.to_string().contains("doesn't exist"));
    }

    #[test]
    fn test_not_found() {
        let error = SyncError::RemoteNotFound {
            path: "sub/a.txt.enc".to_string(),
        };
        assert!(error.is_not_found());
        assert_eq!(error.kind(), ErrorKind::Remote);
        assert!(!SyncError::RemoteUnavailable("timeout".to_string()).is_not_found());
    }

    #[test]
    fn test_encryption_error() {
        let error = SyncError::Encryption {
            path: PathBuf::from("secret.txt"),
            reason: "unsupported cipher".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Encryption);
        assert!(error.to_string().contains("secret.txt"));
        assert!(!error.is_configuration_error());
    }

    #[test]
    fn test_result_propagation() {
        fn inner_function() -> Result<(), SyncError> {
            Err(SyncError::RemoteStatus {
                status: 507,
                path: "a.txt.enc".to_string(),
            })
        }

        fn outer_function() -> Result<(), SyncError> {
            inner_function()?;
            Ok(())
        }

        let err = outer_function().unwrap_err();
        assert!(matches!(err, SyncError::RemoteStatus { status: 507, .. }));
        assert!(err.to_string().contains("507"));
    }
}
