//! Handler implementations for the reload watcher.

mod command;

pub use command::{CommandHandler, CommandReload};
