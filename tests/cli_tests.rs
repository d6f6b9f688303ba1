//! Binary-level tests: exit codes and user-facing messages.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn sealsync() -> Command {
    let mut cmd = Command::cargo_bin("sealsync").expect("binary builds");
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_main_flags() {
    sealsync()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--delete-excluded"))
        .stdout(predicate::str::contains("--save-metadata-step"))
        .stdout(predicate::str::contains("--passphrase-command"));
}

#[test]
fn test_missing_local_directory_exits_with_one() {
    let remote = TempDir::new().unwrap();
    sealsync()
        .args(["/definitely/not/a/dir", remote.path().to_str().unwrap()])
        .args(["--passphrase", "pw"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("doesn't exist"));
}

#[test]
fn test_missing_passphrase_exits_with_one() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    sealsync()
        .args([local.path().to_str().unwrap(), remote.path().to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("passphrase"));
}

#[test]
fn test_missing_remote_directory_exits_with_one() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let missing = remote.path().join("nope");
    sealsync()
        .args([local.path().to_str().unwrap(), missing.to_str().unwrap()])
        .args(["--passphrase", "pw"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("doesn't exist"));
    assert!(!missing.exists());
}

#[test]
fn test_invalid_exclude_pattern_exits_with_one() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    sealsync()
        .args([local.path().to_str().unwrap(), remote.path().to_str().unwrap()])
        .args(["--passphrase", "pw", "--exclude", "[oops"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("[oops"));
    assert!(fs::read_dir(remote.path()).unwrap().next().is_none());
}

#[test]
fn test_sync_into_local_directory_succeeds() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    fs::create_dir(local.path().join("sub")).unwrap();
    fs::write(local.path().join("sub/b.txt"), b"hello").unwrap();
    let passphrase_file = local.path().join("pass");
    fs::write(&passphrase_file, "from-file\n").unwrap();

    sealsync()
        .args([local.path().to_str().unwrap(), remote.path().to_str().unwrap()])
        .args(["--passphrase-file", passphrase_file.to_str().unwrap()])
        .args(["--exclude", "pass"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1 uploaded"));

    assert!(remote.path().join("sub/b.txt.enc").is_file());
    assert!(!remote.path().join("pass.enc").exists());
    assert!(remote.path().join(".sealsync-manifest.json").is_file());
}

#[test]
fn test_restore_round_trip_through_binary() {
    let local = TempDir::new().unwrap();
    let remote = TempDir::new().unwrap();
    let target = TempDir::new().unwrap();
    fs::create_dir(local.path().join("sub")).unwrap();
    fs::write(local.path().join("sub/b.txt"), b"hello").unwrap();

    sealsync()
        .args([local.path().to_str().unwrap(), remote.path().to_str().unwrap()])
        .args(["--passphrase", "pw"])
        .assert()
        .success();

    sealsync()
        .args([target.path().to_str().unwrap(), remote.path().to_str().unwrap()])
        .args(["--passphrase", "pw", "--restore"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Restored: 1 files"));
    assert_eq!(fs::read(target.path().join("sub/b.txt")).unwrap(), b"hello");

    sealsync()
        .args([target.path().to_str().unwrap(), remote.path().to_str().unwrap()])
        .args(["--passphrase", "wrong", "--restore", "--force"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("passphrase"));
}
