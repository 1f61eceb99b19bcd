//! The reload watcher: single consumer of the notification stream.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use super::classifier::{DEFAULT_COMPILED_EXTENSION, EventClassifier};
use super::debouncer::DebounceTracker;
use super::directories::DirectoryWatcher;
use super::error::WatchError;
use super::event::{EventKind, FileEvent, WatchEvent};
use super::exclusion::ExclusionFilter;
use super::handler::{FileEventHandler, FolderEventObserver};
use super::reload::{ReloadAction, ReloadScheduler};
use super::source::{EventStream, NotificationSource, NotifySource};
use crate::ownership::OwnershipOracle;

/// Default window for both content debouncing and reload coalescing.
pub const DEFAULT_DEBOUNCE_MS: u64 = 50;

/// Default notification channel capacity.
pub const DEFAULT_EVENT_BUFFER: usize = 100;

/// Change-detection pipeline from raw notifications to a debounced reload.
///
/// Events are handled strictly in delivery order. Handler dispatch runs on
/// the loop itself, so a slow build delays later events (they queue in the
/// source's channel) but never reorders them.
pub struct ReloadWatcher {
    root: PathBuf,
    directories: DirectoryWatcher,
    debouncer: DebounceTracker,
    classifier: EventClassifier,
    folder_observer: Option<Arc<dyn FolderEventObserver>>,
    reload_action: Option<Arc<dyn ReloadAction>>,
    reload_delay: Duration,
    stream: EventStream,
}

impl ReloadWatcher {
    /// Create a builder for configuring the watcher.
    pub fn builder() -> ReloadWatcherBuilder {
        ReloadWatcherBuilder::new()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register the project tree and process events until `exit` fires or a
    /// stream closes.
    ///
    /// Every exit route shuts the reload scheduler down: a reload whose
    /// deadline already elapsed is delivered, one still pending is dropped.
    pub async fn watch(mut self, exit: CancellationToken) -> Result<(), WatchError> {
        let root = self.root.clone();
        let registered = self.directories.register_tree(&root)?;
        crate::log_event!(
            "watcher",
            "monitoring",
            "{} directories under {}",
            registered.len(),
            root.display()
        );

        let mut scheduler = ReloadScheduler::start(self.reload_delay, self.reload_action.clone());

        let result = loop {
            tokio::select! {
                biased;

                _ = exit.cancelled() => {
                    crate::log_event!("watcher", "stopping");
                    self.directories.close();
                    break Ok(());
                }

                event = self.stream.events.recv() => {
                    match event {
                        Some(event) => self.handle_event(event, &scheduler).await,
                        None => {
                            tracing::error!("[watcher] event stream closed");
                            break Err(WatchError::ChannelClosed);
                        }
                    }
                }

                error = self.stream.errors.recv() => {
                    match error {
                        Some(e) => tracing::warn!("[watcher] file watch error: {e}"),
                        None => {
                            tracing::error!("[watcher] error stream closed");
                            break Err(WatchError::ChannelClosed);
                        }
                    }
                }
            }
        };

        scheduler.shutdown().await;
        result
    }

    /// Filter, classify, dispatch, then record one raw event.
    async fn handle_event(&mut self, event: WatchEvent, scheduler: &ReloadScheduler) {
        let WatchEvent { path, kind } = event;

        if self.directories.excluded(&path) {
            return;
        }

        // Removed paths cannot be stat'ed; they always take the file route.
        let is_dir = if kind.is_remove() {
            false
        } else {
            match std::fs::metadata(&path) {
                Ok(meta) => meta.is_dir(),
                Err(_) => return,
            }
        };

        let Some(file_event) = FileEvent::from_path(&path, kind) else {
            return;
        };

        if is_dir {
            self.handle_directory_event(&file_event);
            return;
        }

        let now = Instant::now();
        if !self.debouncer.should_process(&path, now) {
            crate::debug_event!("watcher", "duplicate", "{} {kind}", path.display());
            return;
        }

        let outcome = self.classifier.dispatch(&file_event).await;
        if outcome.warrants_reload() {
            scheduler.schedule();
        }

        // Fingerprint after dispatch: handlers may have rewritten the file.
        self.debouncer.record(&path, now);
    }

    fn handle_directory_event(&mut self, event: &FileEvent) {
        if let Some(observer) = &self.folder_observer {
            if let Err(e) = observer.on_folder_event(&event.file_name, &event.path, event.kind) {
                tracing::warn!("[watcher] folder event error: {e}");
            }
        }

        if event.kind == EventKind::Create {
            match self.directories.register_tree(&event.path) {
                Ok(dirs) => {
                    crate::debug_event!(
                        "watcher",
                        "new directory",
                        "{} ({} registered)",
                        event.path.display(),
                        dirs.len()
                    );
                }
                Err(e) => tracing::warn!("[watcher] {e}"),
            }
        }
    }
}

/// Builder for constructing a ReloadWatcher.
pub struct ReloadWatcherBuilder {
    root: Option<PathBuf>,
    handlers: Vec<Arc<dyn FileEventHandler>>,
    oracle: Option<Arc<dyn OwnershipOracle>>,
    folder_observer: Option<Arc<dyn FolderEventObserver>>,
    reload_action: Option<Arc<dyn ReloadAction>>,
    excluded: Vec<String>,
    debounce: Duration,
    reload_delay: Duration,
    compiled_extension: String,
    event_buffer: usize,
}

impl ReloadWatcherBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            root: None,
            handlers: Vec::new(),
            oracle: None,
            folder_observer: None,
            reload_action: None,
            excluded: Vec::new(),
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            reload_delay: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            compiled_extension: DEFAULT_COMPILED_EXTENSION.to_string(),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }

    /// Set the project root.
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Add a handler. Handlers are invoked in registration order.
    pub fn handler(mut self, handler: impl FileEventHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    /// Add an already shared handler.
    pub fn shared_handler(mut self, handler: Arc<dyn FileEventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    /// Set the ownership oracle consulted for compiled-source events.
    pub fn oracle(mut self, oracle: Arc<dyn OwnershipOracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn folder_observer(mut self, observer: Arc<dyn FolderEventObserver>) -> Self {
        self.folder_observer = Some(observer);
        self
    }

    /// Set the action run when a reload fires.
    pub fn reload(mut self, action: Arc<dyn ReloadAction>) -> Self {
        self.reload_action = Some(action);
        self
    }

    /// Add excluded path-segment names.
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(names.into_iter().map(Into::into));
        self
    }

    /// Set the content-debounce window.
    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Set the reload coalescing delay.
    pub fn reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    /// Set the extension whose handlers are filtered by ownership.
    pub fn compiled_extension(mut self, extension: impl Into<String>) -> Self {
        self.compiled_extension = extension.into();
        self
    }

    /// Set the notification channel capacity.
    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }

    /// Build on top of the OS notification source.
    pub fn build(self) -> Result<ReloadWatcher, WatchError> {
        let (source, stream) = NotifySource::new(self.event_buffer)?;
        self.build_with_source(Box::new(source), stream)
    }

    /// Build on top of a caller-supplied notification source.
    pub fn build_with_source(
        self,
        source: Box<dyn NotificationSource>,
        stream: EventStream,
    ) -> Result<ReloadWatcher, WatchError> {
        let root = match self.root {
            Some(root) => root,
            None => std::env::current_dir().map_err(|e| WatchError::InitFailed {
                reason: format!("cannot determine project root: {e}"),
            })?,
        };

        let mut filter = ExclusionFilter::new(self.excluded);
        for handler in &self.handlers {
            filter.extend(handler.unobserved_files());
        }

        Ok(ReloadWatcher {
            directories: DirectoryWatcher::new(source, filter, root.clone()),
            debouncer: DebounceTracker::new(self.debounce),
            classifier: EventClassifier::new(self.handlers, self.oracle, self.compiled_extension),
            folder_observer: self.folder_observer,
            reload_action: self.reload_action,
            reload_delay: self.reload_delay,
            stream,
            root,
        })
    }
}

impl Default for ReloadWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
