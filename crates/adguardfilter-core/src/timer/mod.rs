//! Delayed one-shot actions keyed by id.
//!
//! A `Timer` waits on its own tokio task until it either expires, running its
//! callback, or is stopped. The `TimerRegistry` owns the id → timer map and
//! guarantees at most one timer per id.

pub mod error;
pub mod registry;

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use error::TimerError;
pub use registry::TimerRegistry;

/// Work run when a timer expires.
pub type TimerCallback = Box<dyn FnOnce() -> BoxFuture<'static, anyhow::Result<()>> + Send>;

/// Box an async closure as a `TimerCallback`.
pub fn callback<F, Fut>(f: F) -> TimerCallback
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Box::new(move || f().boxed())
}

/// How a timer left the active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerOutcome {
    Expired,
    Stopped,
}

#[derive(Debug)]
struct TimerState {
    active: bool,
    outcome: Option<TimerOutcome>,
}

#[derive(Debug)]
pub struct Timer {
    id: String,
    expire_at: DateTime<Utc>,
    state: Mutex<TimerState>,
    cancel: CancellationToken,
}

impl Timer {
    fn new(id: String, expire_at: DateTime<Utc>, cancel: CancellationToken) -> Self {
        Self {
            id,
            expire_at,
            state: Mutex::new(TimerState {
                active: true,
                outcome: None,
            }),
            cancel,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn expire_at(&self) -> DateTime<Utc> {
        self.expire_at
    }

    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// `None` while the timer is still pending
    pub fn outcome(&self) -> Option<TimerOutcome> {
        self.state.lock().outcome
    }

    /// Time left until expiry, clamped at zero
    pub fn time_remaining(&self) -> chrono::Duration {
        (self.expire_at - Utc::now()).max(chrono::Duration::zero())
    }

    /// Cancel the timer. Never blocks and never fails; stopping an inactive
    /// timer does nothing. The timer leaves the active state immediately, its
    /// task then unregisters it.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        if !state.active {
            debug!(timer_id = %self.id, "Timer is already inactive");
            return;
        }
        info!(timer_id = %self.id, "Stopping timer");
        state.active = false;
        state.outcome = Some(TimerOutcome::Stopped);
        self.cancel.cancel();
    }

    /// Decide the outcome once the wait is over. `stop` and this method take
    /// the same lock, so whichever runs first fixes the outcome.
    fn settle(&self, elapsed: bool) -> TimerOutcome {
        let mut state = self.state.lock();
        if let Some(outcome) = state.outcome {
            return outcome;
        }
        let outcome = if elapsed {
            TimerOutcome::Expired
        } else {
            TimerOutcome::Stopped
        };
        state.active = false;
        state.outcome = Some(outcome);
        outcome
    }
}

/// Run a callback, turning a panic or an error into a log line.
async fn guarded_call(timer_id: &str, callback: TimerCallback) {
    let result = AssertUnwindSafe(async move { callback().await })
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(())) => info!(timer_id = %timer_id, "Callback executed successfully"),
        Ok(Err(e)) => error!(timer_id = %timer_id, error = %format!("{:#}", e), "Callback failed"),
        Err(panic) => error!(
            timer_id = %timer_id,
            panic = %panic_message(&*panic),
            "Callback panicked"
        ),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
