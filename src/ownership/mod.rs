//! Ownership resolution for compiled source files.
//!
//! Answers "does the build target rooted at this main input currently
//! depend on this file?" so that a change only rebuilds affected targets.

mod go;

use std::path::Path;

use crate::watcher::{EventKind, WatchError};

pub use go::GoImportOracle;

/// Decides whether a changed file belongs to a handler's build target.
pub trait OwnershipOracle: Send + Sync {
    /// `main_input` is relative to the project root; `file` is the path the
    /// event was reported for.
    fn is_owned(&self, main_input: &Path, file: &Path, kind: EventKind) -> Result<bool, WatchError>;
}
