//! Command implementations

pub mod restore;
pub mod sync;
