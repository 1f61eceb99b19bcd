//! Content-aware debouncing of file events.
//!
//! Operating systems frequently report a single save as several
//! notifications. A second event for the same path inside the debounce
//! window is dropped only when the file's bytes are unchanged; rapid real
//! edits still get through. Hashing happens only inside the window.

use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use sha2::{Digest, Sha256};

/// Fingerprint of a file's full content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fingerprint {
    /// File could not be opened or read.
    Unreadable,
    Sha256([u8; 32]),
}

impl Fingerprint {
    /// Hash the file at `path`. Any I/O failure yields `Unreadable`.
    pub fn of_file(path: &Path) -> Self {
        match hash_file(path) {
            Ok(digest) => Fingerprint::Sha256(digest),
            Err(_) => Fingerprint::Unreadable,
        }
    }

    /// Same content. `Unreadable` never matches anything, itself included.
    pub fn same_content(&self, other: &Fingerprint) -> bool {
        match (self, other) {
            (Fingerprint::Sha256(a), Fingerprint::Sha256(b)) => a == b,
            _ => false,
        }
    }
}

fn hash_file(path: &Path) -> io::Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;

    let mut digest = [0u8; 32];
    digest.copy_from_slice(&hasher.finalize());
    Ok(digest)
}

/// Last processed state of a path.
#[derive(Debug, Clone, Copy)]
pub struct DebounceRecord {
    pub observed_at: Instant,
    pub fingerprint: Fingerprint,
}

/// Per-path debounce state.
///
/// Lives for the whole session; bounded by the number of distinct files
/// edited.
#[derive(Debug)]
pub struct DebounceTracker {
    records: HashMap<PathBuf, DebounceRecord>,
    window: Duration,
}

impl DebounceTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            records: HashMap::new(),
            window,
        }
    }

    /// Decide whether an event for `path` arriving at `now` is new work.
    pub fn should_process(&self, path: &Path, now: Instant) -> bool {
        let Some(record) = self.records.get(path) else {
            return true;
        };

        if now.saturating_duration_since(record.observed_at) > self.window {
            return true;
        }

        let current = Fingerprint::of_file(path);
        !current.same_content(&record.fingerprint)
    }

    /// Store the post-dispatch state of `path`.
    ///
    /// Call only after every handler has run: handlers may rewrite the file.
    pub fn record(&mut self, path: &Path, now: Instant) {
        let record = DebounceRecord {
            observed_at: now,
            fingerprint: Fingerprint::of_file(path),
        };
        self.records.insert(path.to_path_buf(), record);
    }

    pub fn get(&self, path: &Path) -> Option<&DebounceRecord> {
        self.records.get(path)
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn tracked_count(&self) -> usize {
        self.records.len()
    }
}
