//! Change-detection pipeline for development-time hot reload.
//!
//! Consumes raw filesystem notifications, drops duplicates while keeping
//! genuinely rapid edits, routes each surviving file event to the handlers
//! that own it, and coalesces handler successes into one debounced reload.
//!
//! # Architecture
//!
//! ```text
//! NotificationSource (notify::RecommendedWatcher)
//!         |
//!   ReloadWatcher (single consumer, strict FIFO)
//!     - ExclusionFilter      hidden / excluded segments
//!     - DirectoryWatcher     recursive registration of new dirs
//!     - DebounceTracker      time window + SHA-256 content check
//!     - EventClassifier      extension match + ownership oracle
//!         |
//!   ReloadScheduler (consumer task) --> ReloadAction
//! ```

mod classifier;
mod debouncer;
mod directories;
mod error;
mod event;
mod event_loop;
mod exclusion;
mod handler;
pub mod handlers;
mod reload;
mod source;

pub use classifier::{DEFAULT_COMPILED_EXTENSION, DispatchOutcome, EventClassifier};
pub use debouncer::{DebounceRecord, DebounceTracker, Fingerprint};
pub use directories::DirectoryWatcher;
pub use error::WatchError;
pub use event::{EventKind, FileEvent, WatchEvent, extension_of};
pub use event_loop::{DEFAULT_DEBOUNCE_MS, DEFAULT_EVENT_BUFFER, ReloadWatcher, ReloadWatcherBuilder};
pub use exclusion::ExclusionFilter;
pub use handler::{FileEventHandler, FolderEventObserver};
pub use reload::{ReloadAction, ReloadScheduler};
pub use source::{EventSender, EventStream, NotificationSource, NotifySource};
