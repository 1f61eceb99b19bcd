//! Routes surviving file events to the handlers that apply.

use std::sync::Arc;

use super::event::FileEvent;
use super::handler::FileEventHandler;
use crate::ownership::OwnershipOracle;

/// Extension whose handlers are filtered by build-target ownership.
pub const DEFAULT_COMPILED_EXTENSION: &str = ".go";

/// Result of dispatching one event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Handlers that were invoked.
    pub invoked: usize,
    /// At least one invoked handler succeeded.
    pub any_succeeded: bool,
    /// At least one owning handler succeeded for a compiled-source event.
    pub any_compiled_succeeded: bool,
    /// The event concerned the compiled-source extension.
    pub compiled: bool,
}

impl DispatchOutcome {
    /// Whether this outcome warrants scheduling a reload.
    pub fn warrants_reload(&self) -> bool {
        if self.compiled {
            self.any_compiled_succeeded
        } else {
            self.any_succeeded
        }
    }
}

/// Extension match plus ownership filtering over an ordered handler list.
pub struct EventClassifier {
    handlers: Vec<Arc<dyn FileEventHandler>>,
    oracle: Option<Arc<dyn OwnershipOracle>>,
    compiled_extension: String,
}

impl EventClassifier {
    pub fn new(
        handlers: Vec<Arc<dyn FileEventHandler>>,
        oracle: Option<Arc<dyn OwnershipOracle>>,
        compiled_extension: impl Into<String>,
    ) -> Self {
        Self {
            handlers,
            oracle,
            compiled_extension: compiled_extension.into(),
        }
    }

    pub fn handlers(&self) -> &[Arc<dyn FileEventHandler>] {
        &self.handlers
    }

    /// Invoke every applicable handler. Never stops early on success or
    /// failure; handler errors are logged.
    pub async fn dispatch(&self, event: &FileEvent) -> DispatchOutcome {
        let compiled = event.extension == self.compiled_extension;
        let mut outcome = DispatchOutcome {
            compiled,
            ..DispatchOutcome::default()
        };

        for handler in &self.handlers {
            if !handler.supports(&event.extension) {
                continue;
            }

            if compiled && !event.kind.is_remove() && !self.owns(handler.as_ref(), event) {
                continue;
            }

            outcome.invoked += 1;
            match handler.on_file_event(event).await {
                Ok(()) => {
                    crate::log_event!(handler.name(), event.kind, "{}", event.file_name);
                    outcome.any_succeeded = true;
                    if compiled {
                        outcome.any_compiled_succeeded = true;
                    }
                }
                Err(e) => {
                    tracing::error!("[{}] handler error: {e}", handler.name());
                }
            }
        }

        outcome
    }

    /// Ownership query; oracle errors mean "skip this handler".
    fn owns(&self, handler: &dyn FileEventHandler, event: &FileEvent) -> bool {
        let Some(oracle) = &self.oracle else {
            return true;
        };

        match oracle.is_owned(handler.main_input_path(), &event.path, event.kind) {
            Ok(true) => true,
            Ok(false) => {
                crate::debug_event!(
                    handler.name(),
                    "not owner",
                    "{}",
                    event.path.display()
                );
                false
            }
            Err(e) => {
                crate::debug_event!(handler.name(), "ownership unknown", "{e}");
                false
            }
        }
    }
}
