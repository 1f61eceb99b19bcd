//! Recursive directory registration.
//!
//! A single "directory created" notification does not mean the OS is
//! already watching grandchildren created in the same operation (e.g.
//! `mkdir -p a/b/c`), so every new directory is walked and each
//! subdirectory registered.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::WatchError;
use super::exclusion::ExclusionFilter;
use super::source::NotificationSource;

/// Keeps new subdirectory trees under observation.
pub struct DirectoryWatcher {
    source: Box<dyn NotificationSource>,
    filter: ExclusionFilter,
    /// Project root; exclusion is evaluated relative to it.
    root: PathBuf,
}

impl DirectoryWatcher {
    pub fn new(
        source: Box<dyn NotificationSource>,
        filter: ExclusionFilter,
        root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            source,
            filter,
            root: root.into(),
        }
    }

    /// Register a single directory with the notification source.
    pub fn register(&mut self, path: &Path) -> Result<(), WatchError> {
        self.source.watch(path)?;
        crate::debug_event!("watcher", "watching", "{}", path.display());
        Ok(())
    }

    /// Register `path` and every non-excluded directory beneath it.
    ///
    /// Returns the directories registered during this walk. Entry errors are
    /// skipped; failure to register `path` itself aborts the walk.
    pub fn register_tree(&mut self, path: &Path) -> Result<Vec<PathBuf>, WatchError> {
        // Scoped to this walk only; the source tolerates repeats across walks.
        let mut registered: HashSet<PathBuf> = HashSet::new();
        let mut order = Vec::new();

        self.register(path)?;
        registered.insert(path.to_path_buf());
        order.push(path.to_path_buf());

        let filter = self.filter.clone();
        let root = self.root.clone();
        let walker = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(move |entry| {
                entry.depth() == 0 || !excluded_under(&filter, &root, entry.path())
            });

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    tracing::warn!("[watcher] error walking new directory {}: {e}", path.display());
                    break;
                }
                Err(_) => continue,
            };

            if entry.depth() == 0 || !entry.file_type().is_dir() {
                continue;
            }

            let dir = entry.into_path();
            if !registered.insert(dir.clone()) {
                continue;
            }
            match self.register(&dir) {
                Ok(()) => order.push(dir),
                Err(e) => tracing::warn!("[watcher] {e}"),
            }
        }

        Ok(order)
    }

    /// Exclusion check relative to the project root.
    pub fn excluded(&self, path: &Path) -> bool {
        excluded_under(&self.filter, &self.root, path)
    }

    pub fn filter(&self) -> &ExclusionFilter {
        &self.filter
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Close the underlying notification source.
    pub fn close(&mut self) {
        self.source.close();
    }
}

/// Paths under `root` are judged by their root-relative segments only.
pub(crate) fn excluded_under(filter: &ExclusionFilter, root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    filter.is_excluded(relative)
}
