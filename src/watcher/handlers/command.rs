//! Handler that runs an external command for matching file events.
//!
//! Used for build steps such as `go build` or an asset bundler. The command
//! runs in the project root; a zero exit status counts as success.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::process::Command;

use crate::watcher::{FileEvent, FileEventHandler, ReloadAction, WatchError};

/// Handler backed by an argv.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    name: String,
    extensions: Vec<String>,
    main_input: PathBuf,
    command: Vec<String>,
    unobserved: Vec<String>,
    workdir: PathBuf,
}

impl CommandHandler {
    pub fn new(
        name: impl Into<String>,
        extensions: Vec<String>,
        main_input: impl Into<PathBuf>,
        command: Vec<String>,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            extensions: extensions.into_iter().map(normalize_extension).collect(),
            main_input: main_input.into(),
            command,
            unobserved: Vec::new(),
            workdir: workdir.into(),
        }
    }

    /// File names this handler produces and must not be notified about.
    pub fn with_unobserved(mut self, names: Vec<String>) -> Self {
        self.unobserved = names;
        self
    }
}

#[async_trait]
impl FileEventHandler for CommandHandler {
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
        run(&self.command, &self.workdir, Some(event))
            .await
            .map_err(|reason| WatchError::HandlerFailed {
                handler: self.name.clone(),
                path: event.path.clone(),
                reason,
            })
    }
}

/// Reload action that runs a command, e.g. a browser refresh hook.
#[derive(Debug, Clone)]
pub struct CommandReload {
    command: Vec<String>,
    workdir: PathBuf,
}

impl CommandReload {
    pub fn new(command: Vec<String>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            command,
            workdir: workdir.into(),
        }
    }
}

#[async_trait]
impl ReloadAction for CommandReload {
    async fn reload(&self) -> Result<(), WatchError> {
        run(&self.command, &self.workdir, None)
            .await
            .map_err(|reason| WatchError::ReloadFailed { reason })
    }
}

/// Run `argv` to completion. The triggering event, if any, is exposed to the
/// child as `RELOADWATCH_FILE` and `RELOADWATCH_EVENT`.
async fn run(argv: &[String], workdir: &Path, event: Option<&FileEvent>) -> Result<(), String> {
    let Some((program, args)) = argv.split_first() else {
        return Err("empty command".to_string());
    };

    let mut command = Command::new(program);
    command.args(args).current_dir(workdir).kill_on_drop(true);
    if let Some(event) = event {
        command
            .env("RELOADWATCH_FILE", &event.path)
            .env("RELOADWATCH_EVENT", event.kind.as_str());
    }

    let output = command
        .output()
        .await
        .map_err(|e| format!("failed to spawn '{program}': {e}"))?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(format!("'{program}' exited with {}: {}", output.status, stderr.trim()))
}

/// `go` -> `.go`; `.go` unchanged.
fn normalize_extension(ext: String) -> String {
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
