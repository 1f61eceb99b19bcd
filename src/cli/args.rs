//! CLI argument parsing using clap.
//!
//! Contains the Cli struct and the Commands enum.

use clap::{
    Parser, Subcommand,
    builder::styling::{AnsiColor, Effects, Styles},
};
use std::path::PathBuf;

fn clap_cargo_style() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Green.on_default())
}

/// Development-time change watcher with debounced reload
#[derive(Parser, Debug)]
#[command(
    name = "reloadwatch",
    version = env!("CARGO_PKG_VERSION"),
    about = "Rebuild on change, reload once per burst",
    long_about = "Watch a project tree, run the handlers that own each changed file, \
                  and fire one debounced reload per burst of edits.",
    next_line_help = true,
    styles = clap_cargo_style(),
)]
pub struct Cli {
    /// Path to custom settings.toml file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Set up .reloadwatch directory with a default settings file
    Init {
        /// Force overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Watch the project and reload on change
    #[command(
        after_help = "Examples:\n  reloadwatch watch\n  reloadwatch watch --root ./app --debounce-ms 80\n  reloadwatch watch --exclude vendor --exclude dist"
    )]
    Watch {
        /// Project root (overrides config)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Content-debounce window in milliseconds (overrides config)
        #[arg(long)]
        debounce_ms: Option<u64>,

        /// Quiet period before a reload fires, in milliseconds (overrides config)
        #[arg(long)]
        reload_delay_ms: Option<u64>,

        /// Additional path segment to exclude (repeatable)
        #[arg(short, long = "exclude", value_name = "NAME")]
        exclude: Vec<String>,
    },

    /// Display active settings
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_watch_overrides_parse() {
        let cli = Cli::try_parse_from([
            "reloadwatch",
            "watch",
            "--root",
            "/srv/app",
            "--debounce-ms",
            "80",
            "--exclude",
            "vendor",
            "--exclude",
            "dist",
        ])
        .unwrap();

        match cli.command {
            Commands::Watch {
                root,
                debounce_ms,
                reload_delay_ms,
                exclude,
            } => {
                assert_eq!(root, Some(PathBuf::from("/srv/app")));
                assert_eq!(debounce_ms, Some(80));
                assert_eq!(reload_delay_ms, None);
                assert_eq!(exclude, vec!["vendor", "dist"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["reloadwatch", "init", "--force", "-c", "alt.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("alt.toml")));
        assert!(matches!(cli.command, Commands::Init { force: true }));
    }
}
