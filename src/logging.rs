//! Tracing setup and the `[component] event: detail` log macros.
//!
//! Levels come from the `[logging]` table; a set `RUST_LOG` replaces them
//! entirely:
//!
//! ```toml
//! [logging]
//! default = "warn"
//!
//! [logging.modules]
//! "reloadwatch::watcher" = "debug"
//! ```

use std::sync::Once;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Wall-clock `HH:MM:SS.mmm`.
struct ClockTime;

impl FormatTime for ClockTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// `default,module=level,...` from the `[logging]` table.
pub fn filter_directives(config: &LoggingConfig) -> String {
    config
        .modules
        .iter()
        .fold(config.default.clone(), |mut directives, (module, level)| {
            directives.push_str(&format!(",{module}={level}"));
            directives
        })
}

/// Directives actually applied: `RUST_LOG` when set, else the config.
fn effective_directives(config: &LoggingConfig, rust_log: Option<String>) -> String {
    rust_log.unwrap_or_else(|| filter_directives(config))
}

/// Install the global subscriber. Later calls are no-ops.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let directives = effective_directives(config, std::env::var("RUST_LOG").ok());
        let filter = EnvFilter::try_new(&directives)
            .unwrap_or_else(|_| EnvFilter::new(filter_directives(&LoggingConfig::default())));

        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_timer(ClockTime)
            .with_filter(filter);

        tracing_subscriber::registry().with(layer).init();
    });
}

/// `info!` as `[component] event` or `[component] event: detail`.
///
/// ```ignore
/// log_event!("reload", "fired");
/// log_event!("dispatch", "handled", "{} by {}", path.display(), name);
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Same shape as [`log_event!`] at debug level.
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}
