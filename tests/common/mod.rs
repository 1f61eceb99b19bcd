//! Shared fixtures for watcher integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reloadwatch::watcher::{
    EventKind, EventSender, EventStream, FileEvent, FileEventHandler, FolderEventObserver,
    NotificationSource, ReloadAction, ReloadWatcherBuilder, WatchError, WatchEvent,
};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Notification source that records registrations instead of touching the OS.
#[derive(Clone, Default)]
pub struct RecordingSource {
    pub watched: Arc<Mutex<Vec<PathBuf>>>,
    pub closed: Arc<AtomicBool>,
}

impl NotificationSource for RecordingSource {
    fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        self.watched.lock().push(path.to_path_buf());
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Handler that records every event it receives.
pub struct RecordingHandler {
    name: String,
    extensions: Vec<String>,
    main_input: PathBuf,
    unobserved: Vec<String>,
    fail: bool,
    rewrite: Option<String>,
    pub seen: Arc<Mutex<Vec<(PathBuf, EventKind)>>>,
}

impl RecordingHandler {
    pub fn new(name: &str, extensions: &[&str], main_input: &str) -> Self {
        Self {
            name: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            main_input: PathBuf::from(main_input),
            unobserved: Vec::new(),
            fail: false,
            rewrite: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    /// Overwrite the changed file with `content`, like a formatter would.
    pub fn rewrites(mut self, content: &str) -> Self {
        self.rewrite = Some(content.to_string());
        self
    }

    pub fn unobserved(mut self, names: &[&str]) -> Self {
        self.unobserved = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn log(&self) -> Arc<Mutex<Vec<(PathBuf, EventKind)>>> {
        self.seen.clone()
    }
}

#[async_trait]
impl FileEventHandler for RecordingHandler {
    fn name(&self) -> &str {
        &self.name
    }

    fn supported_extensions(&self) -> &[String] {
        &self.extensions
    }

    fn main_input_path(&self) -> &Path {
        &self.main_input
    }

    fn unobserved_files(&self) -> Vec<String> {
        self.unobserved.clone()
    }

    async fn on_file_event(&self, event: &FileEvent) -> Result<(), WatchError> {
        self.seen.lock().push((event.path.clone(), event.kind));
        if let Some(content) = &self.rewrite {
            std::fs::write(&event.path, content).map_err(|e| WatchError::HandlerFailed {
                handler: self.name.clone(),
                path: event.path.clone(),
                reason: e.to_string(),
            })?;
        }
        if self.fail {
            return Err(WatchError::HandlerFailed {
                handler: self.name.clone(),
                path: event.path.clone(),
                reason: "build failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Folder observer that records (name, kind) pairs.
#[derive(Default)]
pub struct RecordingObserver {
    pub seen: Mutex<Vec<(String, EventKind)>>,
}

impl FolderEventObserver for RecordingObserver {
    fn on_folder_event(&self, name: &str, _path: &Path, kind: EventKind) -> Result<(), WatchError> {
        self.seen.lock().push((name.to_string(), kind));
        Ok(())
    }
}

/// Reload action counting how often it fired.
pub fn counting_reload() -> (Arc<AtomicUsize>, Arc<dyn ReloadAction>) {
    let count = Arc::new(AtomicUsize::new(0));
    let inner = count.clone();
    let action = move || -> Result<(), WatchError> {
        inner.fetch_add(1, Ordering::SeqCst);
        Ok(())
    };
    (count, Arc::new(action))
}

/// A watcher running on a background task, fed by hand.
pub struct Harness {
    pub sender: EventSender,
    pub source: RecordingSource,
    pub exit: CancellationToken,
    pub task: JoinHandle<Result<(), WatchError>>,
}

impl Harness {
    /// Build and start the watcher; returns once the root is registered.
    pub async fn start(builder: ReloadWatcherBuilder) -> Self {
        let source = RecordingSource::default();
        let (sender, stream) = EventStream::channel(64);
        let watcher = builder
            .build_with_source(Box::new(source.clone()), stream)
            .unwrap();

        let exit = CancellationToken::new();
        let task = tokio::spawn(watcher.watch(exit.clone()));

        let watched = source.watched.clone();
        assert!(
            eventually(Duration::from_secs(2), || !watched.lock().is_empty()).await,
            "root was never registered"
        );

        Self {
            sender,
            source,
            exit,
            task,
        }
    }

    pub async fn send(&self, path: impl Into<PathBuf>, kind: EventKind) {
        self.sender
            .events
            .send(WatchEvent::new(path, kind))
            .await
            .unwrap();
    }

    /// Cancel and wait for the loop to finish.
    pub async fn stop(self) -> Result<(), WatchError> {
        self.exit.cancel();
        self.task.await.unwrap()
    }
}

/// Poll `condition` until it holds or `timeout` elapses.
pub async fn eventually(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Let queued events drain through the loop.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(150)).await;
}
