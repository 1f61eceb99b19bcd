pub mod logging;

pub mod cli;
pub mod config;
pub mod ownership;
pub mod watcher;

pub use config::Settings;
pub use ownership::{GoImportOracle, OwnershipOracle};
pub use watcher::{
    DebounceTracker, EventKind, ExclusionFilter, FileEvent, FileEventHandler, FolderEventObserver,
    ReloadAction, ReloadScheduler, ReloadWatcher, WatchError, WatchEvent,
};
