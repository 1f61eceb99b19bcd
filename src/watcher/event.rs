//! Event types flowing through the watcher pipeline.

use std::fmt;
use std::path::{Path, PathBuf};

/// Kind of filesystem change reported by a notification source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Create,
    Write,
    Remove,
    Rename,
}

impl EventKind {
    /// Lowercase name, as handed to handlers and observers.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "create",
            EventKind::Write => "write",
            EventKind::Remove => "remove",
            EventKind::Rename => "rename",
        }
    }

    /// Removal events target paths that no longer exist.
    pub fn is_remove(&self) -> bool {
        matches!(self, EventKind::Remove)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw notification: one path, one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: EventKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: EventKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// A file event that survived filtering and debouncing.
#[derive(Debug, Clone)]
pub struct FileEvent {
    /// Base name of the file (e.g. `main.go`).
    pub file_name: String,
    /// Extension including the leading dot (e.g. `.go`), empty if none.
    pub extension: String,
    /// Full path as reported by the notification source.
    pub path: PathBuf,
    pub kind: EventKind,
}

impl FileEvent {
    /// Derive name and extension from a path. Returns `None` for paths
    /// without a final component (e.g. `/` or `..`).
    pub fn from_path(path: &Path, kind: EventKind) -> Option<Self> {
        let file_name = path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            file_name,
            extension: extension_of(path),
            path: path.to_path_buf(),
            kind,
        })
    }
}

/// Extension with its leading dot, or an empty string.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}
