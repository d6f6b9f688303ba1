//! Directory-backed remote store (mounted drives, tests)

use super::RemoteStore;
use crate::types::{path::remote_join, EntryKind, RemoteEntry, SyncError};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, SyncError> {
        let mut full = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." || segment == "." {
                return Err(SyncError::RemoteConflict {
                    path: path.to_string(),
                    reason: "relative path segments are not allowed".to_string(),
                });
            }
            full.push(segment);
        }
        Ok(full)
    }
}

fn map_io(path: &str, err: std::io::Error) -> SyncError {
    if err.kind() == ErrorKind::NotFound {
        SyncError::RemoteNotFound {
            path: path.to_string(),
        }
    } else {
        SyncError::Io(err)
    }
}

impl RemoteStore for LocalStore {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn exists(&self, path: &str) -> Result<bool, SyncError> {
        match fs::symlink_metadata(self.resolve(path)?) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(SyncError::Io(e)),
        }
    }

    fn is_directory(&self, path: &str) -> Result<bool, SyncError> {
        let metadata = fs::metadata(self.resolve(path)?).map_err(|e| map_io(path, e))?;
        Ok(metadata.is_dir())
    }

    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>, SyncError> {
        let dir = self.resolve(path)?;
        let mut entries = Vec::new();
        for entry in fs::read_dir(&dir).map_err(|e| map_io(path, e))? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            let kind = if entry.file_type()?.is_dir() {
                EntryKind::Directory
            } else {
                EntryKind::File
            };
            entries.push(RemoteEntry::new(remote_join(path, &name), kind));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn make_directory(&self, path: &str) -> Result<(), SyncError> {
        let dir = self.resolve(path)?;
        match fs::create_dir(&dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                if dir.is_dir() {
                    Ok(())
                } else {
                    Err(SyncError::RemoteConflict {
                        path: path.to_string(),
                        reason: "a file already exists at this path".to_string(),
                    })
                }
            }
            Err(e) => Err(map_io(path, e)),
        }
    }

    fn upload(&self, local: &Path, remote: &str) -> Result<(), SyncError> {
        let target = self.resolve(remote)?;
        if target.is_dir() {
            return Err(SyncError::RemoteConflict {
                path: remote.to_string(),
                reason: "a directory already exists at this path".to_string(),
            });
        }
        fs::copy(local, &target).map_err(|e| map_io(remote, e))?;
        Ok(())
    }

    fn download_into(&self, remote: &str, sink: &mut dyn Write) -> Result<(), SyncError> {
        let mut file = fs::File::open(self.resolve(remote)?).map_err(|e| map_io(remote, e))?;
        std::io::copy(&mut file, sink)?;
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<(), SyncError> {
        let target = self.resolve(path)?;
        let metadata = fs::symlink_metadata(&target).map_err(|e| map_io(path, e))?;
        if metadata.is_dir() {
            fs::remove_dir_all(&target).map_err(|e| map_io(path, e))
        } else {
            fs::remove_file(&target).map_err(|e| map_io(path, e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_make_directory_and_list() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        store.make_directory("sub").unwrap();
        store.make_directory("sub").unwrap();
        store.make_directory("sub/deeper").unwrap();
        fs::write(dir.path().join("sub/a.txt.enc"), b"x").unwrap();

        let listed = store.list("sub").unwrap();
        assert_eq!(
            listed,
            vec![
                RemoteEntry::new("sub/a.txt.enc", EntryKind::File),
                RemoteEntry::new("sub/deeper", EntryKind::Directory),
            ]
        );
    }

    #[test]
    fn test_make_directory_over_file_conflicts() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        fs::write(dir.path().join("taken"), b"x").unwrap();

        let err = store.make_directory("taken").unwrap_err();
        assert!(matches!(err, SyncError::RemoteConflict { .. }));
    }

    #[test]
    fn test_upload_download_and_overwrite() {
        let dir = TempDir::new().unwrap();
        let src = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());

        let local = src.path().join("artifact");
        fs::write(&local, b"first").unwrap();
        store.upload(&local, "a.enc").unwrap();
        fs::write(&local, b"second").unwrap();
        store.upload(&local, "a.enc").unwrap();

        let mut out = Vec::new();
        store.download_into("a.enc", &mut out).unwrap();
        assert_eq!(out, b"second");
    }

    #[test]
    fn test_remove_is_recursive() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        fs::create_dir_all(dir.path().join("d/e")).unwrap();
        fs::write(dir.path().join("d/e/f.enc"), b"x").unwrap();

        store.remove("d").unwrap();
        assert!(!store.exists("d").unwrap());
    }

    #[test]
    fn test_missing_paths_are_not_found() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path());
        assert!(!store.exists("nope").unwrap());
        assert!(store.is_directory("nope").unwrap_err().is_not_found());
        assert!(store.list("nope").unwrap_err().is_not_found());
        let mut sink = Vec::new();
        assert!(store.download_into("nope", &mut sink).unwrap_err().is_not_found());
    }

    #[test]
    fn test_parent_segments_rejected() {
        let dir = TempDir::new().unwrap();
        let store = LocalStore::new(dir.path().join("base"));
        assert!(store.exists("../escape").is_err());
    }
}
