//! Configuration module for the reload watcher.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides (applied by the caller)
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `RW_` and use double underscores
//! to separate nested levels:
//! - `RW_WATCH__DEBOUNCE_MS=80` sets `watch.debounce_ms`
//! - `RW_WATCH__RELOAD_DELAY_MS=120` sets `watch.reload_delay_ms`
//! - `RW_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::watcher::{DEFAULT_COMPILED_EXTENSION, DEFAULT_DEBOUNCE_MS, DEFAULT_EVENT_BUFFER};

/// Directory holding the settings file.
pub const CONFIG_DIR: &str = ".reloadwatch";

/// Settings file name inside [`CONFIG_DIR`].
pub const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Project root directory (defaults to the workspace root)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    /// Watch pipeline settings
    #[serde(default)]
    pub watch: WatchConfig,

    /// Reload action settings
    #[serde(default)]
    pub reload: ReloadConfig,

    /// Ordered file event handlers
    #[serde(default)]
    pub handlers: Vec<HandlerConfig>,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Window inside which a repeated notification with unchanged content is dropped
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Quiet period after the last qualifying event before reloading
    #[serde(default = "default_debounce_ms")]
    pub reload_delay_ms: u64,

    /// Path segment names that are never observed
    #[serde(default = "default_excluded")]
    pub excluded: Vec<String>,

    /// Extension whose handlers are filtered by build-target ownership
    #[serde(default = "default_compiled_extension")]
    pub compiled_extension: String,

    /// Capacity of the notification channel
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ReloadConfig {
    /// Command run when a reload fires; logging only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HandlerConfig {
    /// Name used in logs
    pub name: String,

    /// Supported extensions (e.g. [".go"] or [".js", ".css"])
    pub extensions: Vec<String>,

    /// Entry-point file relative to the root (e.g. "cmd/server/main.go")
    pub main_input: PathBuf,

    /// Command run for each matching event
    pub command: Vec<String>,

    /// File names this handler writes and that must not be observed
    #[serde(default)]
    pub unobserved: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides (e.g. `reloadwatch::watcher = "debug"`)
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_debounce_ms() -> u64 {
    DEFAULT_DEBOUNCE_MS
}
fn default_excluded() -> Vec<String> {
    vec![
        ".git".to_string(),
        "node_modules".to_string(),
        "target".to_string(),
    ]
}
fn default_compiled_extension() -> String {
    DEFAULT_COMPILED_EXTENSION.to_string()
}
fn default_event_buffer() -> usize {
    DEFAULT_EVENT_BUFFER
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            root: None,
            watch: WatchConfig::default(),
            reload: ReloadConfig::default(),
            handlers: Vec::new(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            reload_delay_ms: default_debounce_ms(),
            excluded: default_excluded(),
            compiled_extension: default_compiled_extension(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::load_from(config_path).map(|mut settings| {
            if settings.root.is_none() {
                settings.root = Self::workspace_root();
            }
            settings
        })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nesting; single underscores stay in field names
            .merge(Env::prefixed("RW_").split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// Find the settings file by looking for a `.reloadwatch` directory
    /// from the current directory up to the filesystem root.
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where `.reloadwatch` is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Resolved project root: configured, else workspace root, else cwd.
    pub fn project_root(&self) -> PathBuf {
        self.root
            .clone()
            .or_else(Self::workspace_root)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        settings.handlers.push(HandlerConfig {
            name: "server".to_string(),
            extensions: vec![".go".to_string()],
            main_input: PathBuf::from("cmd/server/main.go"),
            command: vec![
                "go".to_string(),
                "build".to_string(),
                "-o".to_string(),
                "bin/server".to_string(),
                "./cmd/server".to_string(),
            ],
            unobserved: vec!["bin".to_string()],
        });

        settings.save(&config_path)?;
        Ok(config_path)
    }
}
