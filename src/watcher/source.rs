//! Notification sources feeding the event loop.
//!
//! A source exposes two streams (events and errors) plus the ability to add
//! directories to observation. [`NotifySource`] backs this with
//! `notify::RecommendedWatcher`; tests substitute their own implementation.

use std::path::Path;

use notify::event::ModifyKind;
use notify::{Event, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::WatchError;
use super::event::{EventKind, WatchEvent};

/// Something that can be told which directories to observe.
pub trait NotificationSource: Send {
    /// Add a directory to observation. Registering the same path twice
    /// must be harmless.
    fn watch(&mut self, path: &Path) -> Result<(), WatchError>;

    /// Stop observing. Event and error streams close once the source is gone.
    fn close(&mut self);
}

/// Receiving halves of a notification source.
#[derive(Debug)]
pub struct EventStream {
    pub events: mpsc::Receiver<WatchEvent>,
    pub errors: mpsc::Receiver<WatchError>,
}

impl EventStream {
    /// Create a stream with its sending halves.
    pub fn channel(buffer: usize) -> (EventSender, Self) {
        let (event_tx, events) = mpsc::channel(buffer);
        let (error_tx, errors) = mpsc::channel(buffer);
        (
            EventSender {
                events: event_tx,
                errors: error_tx,
            },
            Self { events, errors },
        )
    }
}

/// Sending halves of an [`EventStream`].
#[derive(Debug, Clone)]
pub struct EventSender {
    pub events: mpsc::Sender<WatchEvent>,
    pub errors: mpsc::Sender<WatchError>,
}

impl EventSender {
    /// Forward a raw notify result, splitting multi-path events.
    ///
    /// Runs on notify's callback thread and must never block: on inotify,
    /// `watch()` from the event loop waits for that same thread. A full
    /// queue drops the event and reports an overflow instead.
    fn forward(&self, res: notify::Result<Event>) {
        match res {
            Ok(event) => {
                let Some(kind) = map_kind(&event.kind) else {
                    return;
                };
                for path in event.paths {
                    match self.events.try_send(WatchEvent::new(path, kind)) {
                        Ok(()) => {}
                        Err(TrySendError::Full(dropped)) => self.report(WatchError::EventError {
                            details: format!(
                                "event queue overflow, dropped {} {}",
                                dropped.kind,
                                dropped.path.display()
                            ),
                        }),
                        // Receiver gone means the loop already stopped.
                        Err(TrySendError::Closed(_)) => return,
                    }
                }
            }
            Err(e) => self.report(WatchError::EventError {
                details: e.to_string(),
            }),
        }
    }

    fn report(&self, error: WatchError) {
        // A full error queue already tells the loop it is behind.
        let _ = self.errors.try_send(error);
    }
}

/// Map notify's event taxonomy onto create/write/remove/rename.
fn map_kind(kind: &notify::EventKind) -> Option<EventKind> {
    match kind {
        notify::EventKind::Create(_) => Some(EventKind::Create),
        notify::EventKind::Modify(ModifyKind::Name(_)) => Some(EventKind::Rename),
        notify::EventKind::Modify(ModifyKind::Metadata(_)) => None,
        notify::EventKind::Modify(_) => Some(EventKind::Write),
        notify::EventKind::Remove(_) => Some(EventKind::Remove),
        _ => None,
    }
}

/// OS-backed source using `notify::RecommendedWatcher` in non-recursive mode.
pub struct NotifySource {
    watcher: Option<notify::RecommendedWatcher>,
}

impl NotifySource {
    /// Create the OS watcher and its event stream.
    pub fn new(buffer: usize) -> Result<(Self, EventStream), WatchError> {
        let (sender, stream) = EventStream::channel(buffer);

        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            sender.forward(res);
        })?;

        Ok((
            Self {
                watcher: Some(watcher),
            },
            stream,
        ))
    }
}

impl NotificationSource for NotifySource {
    fn watch(&mut self, path: &Path) -> Result<(), WatchError> {
        let watcher = self.watcher.as_mut().ok_or(WatchError::ChannelClosed)?;
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }

    fn close(&mut self) {
        // Dropping the watcher drops the sender inside its callback.
        self.watcher.take();
    }
}
