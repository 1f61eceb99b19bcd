//! reloadwatch CLI entry point.

use std::path::Path;

use clap::Parser;
use reloadwatch::cli::commands::{init, watch};
use reloadwatch::cli::{Cli, Commands};
use reloadwatch::{Settings, logging};

/// Load settings from `--config` or the workspace, then start logging.
fn load_settings(config: Option<&Path>) -> anyhow::Result<Settings> {
    let settings = match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;

    logging::init_with_config(&settings.logging);
    Ok(settings)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { force } => init::run_init(force)?,
        Commands::Config => {
            let settings = load_settings(cli.config.as_deref())?;
            init::run_config(&settings)?;
        }
        Commands::Watch {
            root,
            debounce_ms,
            reload_delay_ms,
            exclude,
        } => {
            let settings = load_settings(cli.config.as_deref())?;
            let overrides = watch::WatchOverrides {
                root,
                debounce_ms,
                reload_delay_ms,
                exclude,
            };
            watch::run_watch(settings, overrides).await?;
        }
    }

    Ok(())
}
