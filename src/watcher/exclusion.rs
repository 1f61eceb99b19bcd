//! Segment-wise path exclusion.
//!
//! A path is excluded when any of its segments is hidden (starts with `.`)
//! or exactly equals one of the configured names. Both `/` and `\` are
//! treated as separators regardless of host platform.

use std::collections::HashSet;
use std::path::Path;

/// Pure predicate over paths.
#[derive(Debug, Clone, Default)]
pub struct ExclusionFilter {
    names: HashSet<String>,
}

impl ExclusionFilter {
    /// Create a filter from excluded segment names.
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| !name.is_empty())
                .collect(),
        }
    }

    /// Add more excluded names (e.g. files a handler writes itself).
    pub fn extend<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names.extend(
            names
                .into_iter()
                .map(Into::into)
                .filter(|name: &String| !name.is_empty()),
        );
    }

    /// Check whether a path lies in an ignored location.
    pub fn is_excluded(&self, path: &Path) -> bool {
        self.is_excluded_str(&path.to_string_lossy())
    }

    /// String form of [`is_excluded`](Self::is_excluded); accepts either
    /// separator style.
    pub fn is_excluded_str(&self, path: &str) -> bool {
        path.split(['/', '\\'])
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .any(|segment| segment.starts_with('.') || self.names.contains(segment))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}
