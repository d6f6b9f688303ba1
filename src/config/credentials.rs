//! Secret sources for passphrases and WebDAV passwords

use crate::types::SyncError;
use std::fs;
use std::path::Path;
use std::process::Command;

/// Read a secret from a file, trimming surrounding whitespace
pub fn read_secret_file(path: &Path) -> Result<String, SyncError> {
    let content = fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("Failed to read secret file {}: {e}", path.display()))
    })?;
    Ok(content.trim().to_string())
}

/// Run `command` through `sh -c` and return its trimmed stdout
///
/// # Errors
/// * `SyncError::CredentialCommand` if the command can't be spawned, exits
///   non-zero or prints non-UTF-8 output
pub fn run_secret_command(command: &str) -> Result<String, SyncError> {
    let failed = |reason: String| SyncError::CredentialCommand {
        command: command.to_string(),
        reason,
    };

    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|e| failed(e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(failed(format!("{} {}", output.status, stderr.trim())));
    }

    let stdout = String::from_utf8(output.stdout).map_err(|e| failed(e.to_string()))?;
    Ok(stdout.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_secret_file_trims() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pw");
        fs::write(&path, "  s3cret \n\n").unwrap();
        assert_eq!(read_secret_file(&path).unwrap(), "s3cret");
    }

    #[test]
    fn test_missing_secret_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = read_secret_file(&dir.path().join("missing")).unwrap_err();
        assert!(err.is_configuration_error());
    }

    #[cfg(unix)]
    #[test]
    fn test_command_stdout() {
        assert_eq!(run_secret_command("printf 'abc\\n'").unwrap(), "abc");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_failure_reports_stderr() {
        let err = run_secret_command("echo nope >&2; exit 1").unwrap_err();
        match err {
            SyncError::CredentialCommand { command, reason } => {
                assert!(command.contains("exit 1"));
                assert!(reason.contains("nope"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
