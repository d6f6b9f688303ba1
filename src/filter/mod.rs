//! Exclusion patterns
//!
//! Patterns are shell-style globs (`*`, `?`, `[...]`) anchored to the whole
//! relative path. As with `fnmatch`, `*` also matches `/`, so `*.log`
//! excludes log files at any depth.

use crate::types::SyncError;
use camino::Utf8Path;
use globset::{Glob, GlobSet, GlobSetBuilder};

/// Ordered set of compiled exclusion patterns
#[derive(Debug, Clone)]
pub struct ExclusionSet {
    patterns: Vec<String>,
    set: GlobSet,
}

impl ExclusionSet {
    /// Compile exclusion patterns
    ///
    /// # Errors
    /// * `SyncError::Pattern` if any pattern is not a valid glob
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, SyncError> {
        let mut builder = GlobSetBuilder::new();
        let mut kept = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let pattern = pattern.as_ref();
            let glob = Glob::new(pattern).map_err(|e| SyncError::Pattern {
                pattern: pattern.to_string(),
                reason: e.kind().to_string(),
            })?;
            builder.add(glob);
            kept.push(pattern.to_string());
        }

        let set = builder.build().map_err(|e| SyncError::Pattern {
            pattern: kept.join(", "),
            reason: e.to_string(),
        })?;

        Ok(Self {
            patterns: kept,
            set,
        })
    }

    /// A set that excludes nothing
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
            set: GlobSet::empty(),
        }
    }

    /// True iff any pattern matches the relative path.
    ///
    /// The root (empty path) is only excluded by a pattern that matches the
    /// empty string.
    pub fn is_excluded(&self, relative: &Utf8Path) -> bool {
        self.matching_pattern(relative).is_some()
    }

    /// First pattern (in configuration order) matching the path
    pub fn matching_pattern(&self, relative: &Utf8Path) -> Option<&str> {
        if self.patterns.is_empty() {
            return None;
        }
        self.set
            .matches(relative.as_str())
            .into_iter()
            .min()
            .map(|idx| self.patterns[idx].as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

impl Default for ExclusionSet {
    fn default() -> Self {
        Self::empty()
    }
}
