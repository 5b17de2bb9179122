//! Exclude pattern matching for inventories.
//!
//! Patterns are globs matched against the path relative to the mapping root
//! (local side) or the object key (remote side). A file excluded on one side is
//! excluded on the other too, so it never becomes an upload or delete candidate.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Component, Path};

/// Compiled exclude patterns for one mapping.
#[derive(Debug, Clone)]
pub struct ExcludePatterns {
    glob_set: GlobSet,
    patterns: Vec<String>,
}

impl Default for ExcludePatterns {
    fn default() -> Self {
        Self::new()
    }
}

impl ExcludePatterns {
    /// An empty set that excludes nothing.
    pub fn new() -> Self {
        Self {
            glob_set: GlobSet::empty(),
            patterns: Vec::new(),
        }
    }

    /// Compile a list of patterns.
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Result<Self, globset::Error> {
        let mut builder = GlobSetBuilder::new();
        let mut pattern_list = Vec::with_capacity(patterns.len());

        for pattern in patterns {
            let pattern = pattern.as_ref();
            builder.add(Glob::new(pattern)?);
            pattern_list.push(pattern.to_string());
        }

        Ok(Self {
            glob_set: builder.build()?,
            patterns: pattern_list,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Check if a relative path should be excluded.
    ///
    /// Matches the whole path first, then each component so that `.git` or
    /// `node_modules` exclude everything underneath them.
    pub fn is_excluded(&self, relative: &str) -> bool {
        if self.is_empty() {
            return false;
        }

        if self.glob_set.is_match(relative) {
            return true;
        }

        Path::new(relative).components().any(|component| match component {
            Component::Normal(name) => self.glob_set.is_match(name.to_string_lossy().as_ref()),
            _ => false,
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}
