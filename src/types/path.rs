//! Mapping between local relative paths and remote object names
//!
//! Remote names are `/`-separated and relative to the remote base. The
//! mapping local → remote appends [`ENCRYPTED_SUFFIX`] to files; remote →
//! local strips it again.

use camino::{Utf8Path, Utf8PathBuf};

/// Suffix appended to every encrypted remote object
pub const ENCRYPTED_SUFFIX: &str = ".enc";

/// Reserved manifest object at the root of the remote base
pub const MANIFEST_NAME: &str = ".sealsync-manifest.json";

/// Convert a local relative path into a remote name (`/`-separated)
pub fn remote_name(relative: &Utf8Path) -> String {
    relative
        .components()
        .map(|c| c.as_str())
        .filter(|c| !c.is_empty() && *c != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// Join a remote directory and a child name
pub fn remote_join(dir: &str, name: &str) -> String {
    let dir = dir.trim_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Remote name of the encrypted artifact for a local file
pub fn encrypted_name(relative: &Utf8Path) -> String {
    format!("{}{}", remote_name(relative), ENCRYPTED_SUFFIX)
}

/// Recover the local relative path of a remote file.
///
/// Returns `None` when the name does not carry the encryption suffix, i.e.
/// the object was not produced by sealsync.
pub fn local_path_for_file(remote: &str) -> Option<Utf8PathBuf> {
    remote
        .strip_suffix(ENCRYPTED_SUFFIX)
        .filter(|stem| !stem.is_empty() && !stem.ends_with('/'))
        .map(Utf8PathBuf::from)
}

/// Recover the local relative path of a remote directory
pub fn local_path_for_dir(remote: &str) -> Utf8PathBuf {
    Utf8PathBuf::from(remote.trim_matches('/'))
}

/// Whether a remote name is the reserved manifest object
pub fn is_manifest(remote: &str) -> bool {
    remote.trim_matches('/') == MANIFEST_NAME
}
