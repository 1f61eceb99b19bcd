//! Debounced reload trigger.
//!
//! Any number of qualifying events within the delay produce one reload,
//! fired `delay` after the last of them. Arming happens on the event loop;
//! a separate consumer task waits for the deadline and runs the action.
//!
//! ```text
//!   idle --schedule--> armed --schedule--> armed (deadline reset)
//!                        |
//!                        +--deadline--> idle + reload()
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::WatchError;

/// Action run when a reload fires.
#[async_trait]
pub trait ReloadAction: Send + Sync {
    async fn reload(&self) -> Result<(), WatchError>;
}

#[async_trait]
impl<F> ReloadAction for F
where
    F: Fn() -> Result<(), WatchError> + Send + Sync,
{
    async fn reload(&self) -> Result<(), WatchError> {
        (self)()
    }
}

struct Shared {
    /// `Some` while armed. Only held for arm/claim/drain, never across `reload()`.
    deadline: Mutex<Option<Instant>>,
    rearmed: Notify,
    delay: Duration,
    action: Option<Arc<dyn ReloadAction>>,
}

impl Shared {
    /// Move armed -> idle if `deadline` is still the current one.
    fn claim(&self, deadline: Instant) -> bool {
        let mut current = self.deadline.lock();
        if *current == Some(deadline) {
            *current = None;
            true
        } else {
            false
        }
    }

    async fn fire(&self) {
        crate::log_event!("reload", "triggered");
        let Some(action) = &self.action else {
            return;
        };
        if let Err(e) = action.reload().await {
            tracing::error!("[reload] {e}");
        }
    }
}

/// Single coalescing reload timer.
pub struct ReloadScheduler {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    consumer: Option<JoinHandle<()>>,
}

impl ReloadScheduler {
    /// Create the scheduler and spawn its consumer task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(delay: Duration, action: Option<Arc<dyn ReloadAction>>) -> Self {
        let mut scheduler = Self::idle(delay, action);
        let shared = scheduler.shared.clone();
        let cancel = scheduler.cancel.clone();
        scheduler.consumer = Some(tokio::spawn(consume(shared, cancel)));
        scheduler
    }

    /// Scheduler without a consumer: deadlines elapse but nothing fires
    /// until [`shutdown`](Self::shutdown) drains them.
    pub(crate) fn idle(delay: Duration, action: Option<Arc<dyn ReloadAction>>) -> Self {
        Self {
            shared: Arc::new(Shared {
                deadline: Mutex::new(None),
                rearmed: Notify::new(),
                delay,
                action,
            }),
            cancel: CancellationToken::new(),
            consumer: None,
        }
    }

    /// Arm the timer, or push an armed deadline out to `now + delay`.
    pub fn schedule(&self) {
        let deadline = Instant::now() + self.shared.delay;
        *self.shared.deadline.lock() = Some(deadline);
        self.shared.rearmed.notify_one();
        crate::debug_event!("reload", "scheduled", "in {:?}", self.shared.delay);
    }

    pub fn is_armed(&self) -> bool {
        self.shared.deadline.lock().is_some()
    }

    pub fn delay(&self) -> Duration {
        self.shared.delay
    }

    /// Stop the scheduler.
    ///
    /// A deadline still in the future is dropped. A deadline that already
    /// elapsed but was not delivered fires exactly once before returning.
    /// Waits for an in-flight reload on the consumer to finish.
    pub async fn shutdown(&mut self) {
        let overdue = {
            let mut deadline = self.shared.deadline.lock();
            match deadline.take() {
                Some(at) if at <= Instant::now() => true,
                Some(_) => {
                    crate::debug_event!("reload", "dropped pending reload");
                    false
                }
                None => false,
            }
        };

        if overdue {
            self.shared.fire().await;
        }

        self.cancel.cancel();
        if let Some(consumer) = self.consumer.take() {
            if let Err(e) = consumer.await {
                tracing::warn!("[reload] consumer task ended abnormally: {e}");
            }
        }
    }
}

impl Drop for ReloadScheduler {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Consumer loop: the only place a reload fires outside of shutdown.
async fn consume(shared: Arc<Shared>, cancel: CancellationToken) {
    loop {
        let deadline = *shared.deadline.lock();

        match deadline {
            None => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = shared.rearmed.notified() => continue,
                }
            }
            Some(at) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return,
                    _ = shared.rearmed.notified() => continue,
                    _ = tokio::time::sleep_until(at.into()) => {
                        if shared.claim(at) {
                            shared.fire().await;
                        }
                    }
                }
            }
        }
    }
}
