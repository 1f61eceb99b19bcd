//! End-to-end tests of the event loop: filtering, debouncing, dispatch and
//! reload coalescing, driven through a hand-fed notification source.

mod common;

use std::fs;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use common::{Harness, RecordingHandler, RecordingObserver, counting_reload, eventually, settle};
use reloadwatch::watcher::{EventKind, EventStream, ReloadWatcher, WatchError};
use tempfile::TempDir;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_duplicate_notification_within_window_is_dropped() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.go");
    fs::write(&file, "package main").unwrap();

    let handler = RecordingHandler::new("server", &[".go"], "main.go");
    let seen = handler.log();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .debounce(Duration::from_secs(10)),
    )
    .await;

    harness.send(&file, EventKind::Write).await;
    harness.send(&file, EventKind::Write).await;
    settle().await;

    assert_eq!(seen.lock().len(), 1);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_changed_content_within_window_is_processed() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.go");
    fs::write(&file, "package main").unwrap();

    let handler = RecordingHandler::new("server", &[".go"], "main.go");
    let seen = handler.log();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .debounce(Duration::from_secs(10)),
    )
    .await;

    harness.send(&file, EventKind::Write).await;
    let first = seen.clone();
    assert!(eventually(Duration::from_secs(2), || first.lock().len() == 1).await);

    fs::write(&file, "package main\n\nfunc main() {}\n").unwrap();
    harness.send(&file, EventKind::Write).await;
    settle().await;

    assert_eq!(seen.lock().len(), 2);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_handler_rewrite_does_not_retrigger_within_window() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.go");
    fs::write(&file, "package main").unwrap();

    let handler =
        RecordingHandler::new("fmt", &[".go"], "main.go").rewrites("package main\n\nfunc main() {}\n");
    let seen = handler.log();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .debounce(Duration::from_secs(10)),
    )
    .await;

    harness.send(&file, EventKind::Write).await;
    let first = seen.clone();
    assert!(eventually(Duration::from_secs(2), || first.lock().len() == 1).await);

    // The notification caused by the handler's own write.
    harness.send(&file, EventKind::Write).await;
    settle().await;

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(
        fs::read_to_string(&file).unwrap(),
        "package main\n\nfunc main() {}\n"
    );
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_identical_content_outside_window_is_processed() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.go");
    fs::write(&file, "package main").unwrap();

    let handler = RecordingHandler::new("server", &[".go"], "main.go");
    let seen = handler.log();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .debounce(Duration::from_millis(30)),
    )
    .await;

    harness.send(&file, EventKind::Write).await;
    sleep(Duration::from_millis(200)).await;
    harness.send(&file, EventKind::Write).await;
    settle().await;

    assert_eq!(seen.lock().len(), 2);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_new_directory_tree_is_registered() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::start(ReloadWatcher::builder().root(temp.path())).await;
    assert_eq!(harness.source.watched.lock().len(), 1);

    let new_dir = temp.path().join("a");
    fs::create_dir_all(new_dir.join("b/c")).unwrap();
    fs::create_dir_all(new_dir.join(".cache")).unwrap();
    harness.send(&new_dir, EventKind::Create).await;

    let watched = harness.source.watched.clone();
    assert!(eventually(Duration::from_secs(2), || watched.lock().len() == 4).await);
    {
        let watched = watched.lock();
        assert!(watched.contains(&new_dir));
        assert!(watched.contains(&new_dir.join("b")));
        assert!(watched.contains(&new_dir.join("b/c")));
        assert!(!watched.contains(&new_dir.join(".cache")));
    }

    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_folder_observer_sees_directory_events() {
    let temp = TempDir::new().unwrap();
    let observer = Arc::new(RecordingObserver::default());
    let handler = RecordingHandler::new("server", &[".go"], "main.go");
    let seen = handler.log();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .folder_observer(observer.clone()),
    )
    .await;

    let dir = temp.path().join("handlers");
    fs::create_dir(&dir).unwrap();
    harness.send(&dir, EventKind::Create).await;
    settle().await;

    assert_eq!(
        observer.seen.lock().as_slice(),
        &[("handlers".to_string(), EventKind::Create)]
    );
    // Directories never reach file handlers.
    assert!(seen.lock().is_empty());
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_excluded_paths_are_never_dispatched() {
    let temp = TempDir::new().unwrap();
    for dir in ["node_modules/lib", ".git", "web"] {
        fs::create_dir_all(temp.path().join(dir)).unwrap();
    }
    let files = [
        temp.path().join("node_modules/lib/index.js"),
        temp.path().join(".git/config.js"),
        temp.path().join("web/main.wasm"),
    ];
    for file in &files {
        fs::write(file, "x").unwrap();
    }

    let handler = RecordingHandler::new("wasm", &[".js", ".wasm"], "web/main.go")
        .unobserved(&["main.wasm"]);
    let seen = handler.log();
    let (count, action) = counting_reload();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .exclude(["node_modules"])
            .handler(handler)
            .reload(action)
            .reload_delay(Duration::from_millis(20)),
    )
    .await;

    for file in &files {
        harness.send(file, EventKind::Write).await;
    }
    settle().await;

    assert!(seen.lock().is_empty());
    assert_eq!(count.load(Ordering::SeqCst), 0);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_vanished_path_is_discarded_but_remove_is_dispatched() {
    let temp = TempDir::new().unwrap();
    let gone = temp.path().join("gone.go");

    let handler = RecordingHandler::new("server", &[".go"], "main.go");
    let seen = handler.log();
    let harness = Harness::start(ReloadWatcher::builder().root(temp.path()).handler(handler)).await;

    harness.send(&gone, EventKind::Write).await;
    harness.send(&gone, EventKind::Remove).await;
    settle().await;

    assert_eq!(seen.lock().as_slice(), &[(gone, EventKind::Remove)]);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_burst_of_edits_fires_one_reload() {
    let temp = TempDir::new().unwrap();
    let handler = RecordingHandler::new("web", &[".js"], "web/main.js");
    let seen = handler.log();
    let (count, action) = counting_reload();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .reload(action)
            .reload_delay(Duration::from_millis(200)),
    )
    .await;

    for i in 0..5 {
        let file = temp.path().join(format!("part{i}.js"));
        fs::write(&file, format!("export const n = {i};")).unwrap();
        harness.send(&file, EventKind::Write).await;
        sleep(Duration::from_millis(20)).await;
    }

    let handled = seen.clone();
    assert!(eventually(Duration::from_secs(2), || handled.lock().len() == 5).await);
    assert_eq!(count.load(Ordering::SeqCst), 0, "reload must wait for the quiet period");

    sleep(Duration::from_millis(600)).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    harness.stop().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_spaced_edits_each_reload() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("app.css");
    let (count, action) = counting_reload();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(RecordingHandler::new("css", &[".css"], "web/main.css"))
            .reload(action)
            .debounce(Duration::from_millis(20))
            .reload_delay(Duration::from_millis(30)),
    )
    .await;

    for i in 0..3 {
        fs::write(&file, format!("body {{ margin: {i}px; }}")).unwrap();
        harness.send(&file, EventKind::Write).await;
        sleep(Duration::from_millis(300)).await;
    }

    assert_eq!(count.load(Ordering::SeqCst), 3);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_failed_handler_does_not_reload() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.js");
    fs::write(&file, "x").unwrap();

    let handler = RecordingHandler::new("web", &[".js"], "main.js").failing();
    let seen = handler.log();
    let (count, action) = counting_reload();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .reload(action)
            .reload_delay(Duration::from_millis(20)),
    )
    .await;

    harness.send(&file, EventKind::Write).await;
    settle().await;

    assert_eq!(seen.lock().len(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    harness.stop().await.unwrap();
}

#[tokio::test]
async fn test_exit_while_idle_does_not_reload() {
    let temp = TempDir::new().unwrap();
    let (count, action) = counting_reload();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .reload(action)
            .reload_delay(Duration::from_millis(20)),
    )
    .await;

    let closed = harness.source.closed.clone();
    harness.stop().await.unwrap();

    assert!(closed.load(Ordering::SeqCst));
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_exit_drops_reload_not_yet_due() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.js");
    fs::write(&file, "x").unwrap();

    let handler = RecordingHandler::new("web", &[".js"], "main.js");
    let seen = handler.log();
    let (count, action) = counting_reload();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .handler(handler)
            .reload(action)
            .reload_delay(Duration::from_secs(5)),
    )
    .await;

    harness.send(&file, EventKind::Write).await;
    let handled = seen.clone();
    assert!(eventually(Duration::from_secs(2), || handled.lock().len() == 1).await);

    harness.stop().await.unwrap();
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_closed_stream_ends_watch_with_error() {
    let temp = TempDir::new().unwrap();
    let (sender, stream) = EventStream::channel(8);
    let watcher = ReloadWatcher::builder()
        .root(temp.path())
        .build_with_source(Box::new(common::RecordingSource::default()), stream)
        .unwrap();

    drop(sender);
    let result = watcher.watch(CancellationToken::new()).await;
    assert!(matches!(result, Err(WatchError::ChannelClosed)));
}

#[tokio::test]
async fn test_source_errors_are_not_fatal() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("main.js");
    fs::write(&file, "x").unwrap();

    let handler = RecordingHandler::new("web", &[".js"], "main.js");
    let seen = handler.log();
    let harness = Harness::start(ReloadWatcher::builder().root(temp.path()).handler(handler)).await;

    harness
        .sender
        .errors
        .send(WatchError::EventError {
            details: "queue overflow".to_string(),
        })
        .await
        .unwrap();
    harness.send(&file, EventKind::Write).await;
    settle().await;

    assert_eq!(seen.lock().len(), 1);
    harness.stop().await.unwrap();
}

struct FailingObserver;

impl reloadwatch::watcher::FolderEventObserver for FailingObserver {
    fn on_folder_event(
        &self,
        _name: &str,
        path: &std::path::Path,
        _kind: EventKind,
    ) -> Result<(), WatchError> {
        Err(WatchError::FolderEventFailed {
            path: path.to_path_buf(),
            reason: "observer offline".to_string(),
        })
    }
}

#[tokio::test]
async fn test_failing_folder_observer_still_registers_directory() {
    let temp = TempDir::new().unwrap();
    let harness = Harness::start(
        ReloadWatcher::builder()
            .root(temp.path())
            .folder_observer(Arc::new(FailingObserver)),
    )
    .await;

    let dir = temp.path().join("pkg");
    fs::create_dir(&dir).unwrap();
    harness.send(&dir, EventKind::Create).await;

    let watched = harness.source.watched.clone();
    let expected = dir.clone();
    assert!(eventually(Duration::from_secs(2), || watched.lock().contains(&expected)).await);
    harness.stop().await.unwrap();
}
