//! Watch command - run the reload pipeline until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::ownership::GoImportOracle;
use crate::watcher::handlers::{CommandHandler, CommandReload};
use crate::watcher::{ReloadWatcher, ReloadWatcherBuilder};

/// CLI overrides applied on top of the loaded settings.
#[derive(Debug, Default, Clone)]
pub struct WatchOverrides {
    pub root: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub reload_delay_ms: Option<u64>,
    pub exclude: Vec<String>,
}

impl WatchOverrides {
    pub fn apply(self, settings: &mut Settings) {
        if let Some(root) = self.root {
            settings.root = Some(root);
        }
        if let Some(ms) = self.debounce_ms {
            settings.watch.debounce_ms = ms;
        }
        if let Some(ms) = self.reload_delay_ms {
            settings.watch.reload_delay_ms = ms;
        }
        settings.watch.excluded.extend(self.exclude);
    }
}

/// Assemble a watcher builder from settings. Handler order follows the
/// `[[handlers]]` order of the settings file.
pub fn builder_from_settings(settings: &Settings) -> anyhow::Result<ReloadWatcherBuilder> {
    let root = settings.project_root();
    let watch = &settings.watch;

    let mut builder = ReloadWatcher::builder()
        .root(root.clone())
        .exclude(watch.excluded.iter().cloned())
        .debounce(Duration::from_millis(watch.debounce_ms))
        .reload_delay(Duration::from_millis(watch.reload_delay_ms))
        .compiled_extension(watch.compiled_extension.clone())
        .event_buffer(watch.event_buffer);

    for handler in &settings.handlers {
        builder = builder.handler(
            CommandHandler::new(
                handler.name.clone(),
                handler.extensions.clone(),
                handler.main_input.clone(),
                handler.command.clone(),
                root.clone(),
            )
            .with_unobserved(handler.unobserved.clone()),
        );
    }

    // Ownership only matters for Go modules; elsewhere every handler owns every file.
    if root.join("go.mod").is_file() {
        let oracle = GoImportOracle::new(root.clone()).context("Failed to create Go import oracle")?;
        builder = builder.oracle(Arc::new(oracle));
    }

    if let Some(command) = &settings.reload.command {
        builder = builder.reload(Arc::new(CommandReload::new(command.clone(), root.clone())));
    }

    Ok(builder)
}

/// Run watch command.
pub async fn run_watch(mut settings: Settings, overrides: WatchOverrides) -> anyhow::Result<()> {
    overrides.apply(&mut settings);

    if settings.handlers.is_empty() {
        tracing::warn!("[watcher] no handlers configured; changes will only be logged");
    }

    let watcher = builder_from_settings(&settings)?
        .build()
        .context("Failed to start watcher")?;

    eprintln!(
        "Watching {} (debounce: {}ms, reload delay: {}ms)",
        watcher.root().display(),
        settings.watch.debounce_ms,
        settings.watch.reload_delay_ms
    );

    let exit = CancellationToken::new();
    let signal_exit = exit.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => eprintln!("Received shutdown signal"),
            Err(e) => tracing::error!("[watcher] failed to listen for ctrl+c: {e}"),
        }
        signal_exit.cancel();
    });

    watcher.watch(exit).await.context("Watcher stopped")?;
    Ok(())
}
