//! Local directory reading

mod walker;

pub use walker::{check_local_base, local_kind, read_local_dir, LocalDirListing};
