//! Handler and observer traits for the reload watcher.

use std::path::Path;

use async_trait::async_trait;

use super::WatchError;
use super::event::{EventKind, FileEvent};

/// Trait for handlers that process file change events.
///
/// Handlers declare which extensions they care about and the entry-point
/// file that identifies their build target. The watcher invokes every
/// applicable handler for each surviving event.
#[async_trait]
pub trait FileEventHandler: Send + Sync {
    /// Handler name for logging.
    fn name(&self) -> &str;

    /// Extensions this handler supports, with leading dot (e.g. `.go`).
    fn supported_extensions(&self) -> &[String];

    /// Entry-point file relative to the project root
    /// (e.g. `app/server/main.go`). Used as the ownership query key.
    fn main_input_path(&self) -> &Path;

    /// File names this handler writes itself and that must never be observed
    /// (e.g. `main.wasm`).
    fn unobserved_files(&self) -> Vec<String> {
        Vec::new()
    }

    /// Check if this handler should see events for `extension`.
    fn supports(&self, extension: &str) -> bool {
        self.supported_extensions().iter().any(|ext| ext == extension)
    }

    /// Process one file event. May block for as long as a build takes.
    async fn on_file_event(&self, event: &FileEvent) -> Result<(), WatchError>;
}

/// Notified of directory creation/removal that survived filtering.
pub trait FolderEventObserver: Send + Sync {
    fn on_folder_event(&self, name: &str, path: &Path, kind: EventKind) -> Result<(), WatchError>;
}
