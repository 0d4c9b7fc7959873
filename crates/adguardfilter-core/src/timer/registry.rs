use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{guarded_call, Timer, TimerCallback, TimerError, TimerOutcome};

type TimerMap = Arc<RwLock<HashMap<String, Arc<Timer>>>>;

/// Directory of live timers.
///
/// Lock order is always map then timer state. The map lock is never held
/// across an `.await` or while a callback runs.
#[derive(Clone)]
pub struct TimerRegistry {
    timers: TimerMap,
    shutdown: CancellationToken,
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::with_shutdown(CancellationToken::new())
    }

    /// Registry whose timers are all cancelled when `shutdown` fires.
    pub fn with_shutdown(shutdown: CancellationToken) -> Self {
        Self {
            timers: Arc::new(RwLock::new(HashMap::new())),
            shutdown,
        }
    }

    /// Schedule `callback` to run once `duration` has elapsed.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_with_duration(
        &self,
        id: impl Into<String>,
        duration: chrono::Duration,
        callback: TimerCallback,
    ) -> Result<Arc<Timer>, TimerError> {
        let id = id.into();
        if duration <= chrono::Duration::zero() {
            warn!(timer_id = %id, duration = %duration, "Duration must be greater than 0");
            return Err(TimerError::NonPositiveDuration);
        }

        let Some(expire_at) = Utc::now().checked_add_signed(duration) else {
            warn!(timer_id = %id, duration = %duration, "Duration is too long");
            return Err(TimerError::DurationTooLong);
        };
        info!(
            timer_id = %id,
            minutes = duration.num_minutes(),
            expire_at = %expire_at.to_rfc3339(),
            "Creating timer"
        );
        Ok(self.install(id, expire_at, callback))
    }

    /// Schedule `callback` to run at `deadline`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn create_with_deadline(
        &self,
        id: impl Into<String>,
        deadline: DateTime<Utc>,
        callback: TimerCallback,
    ) -> Result<Arc<Timer>, TimerError> {
        let id = id.into();
        if deadline <= Utc::now() {
            warn!(timer_id = %id, deadline = %deadline.to_rfc3339(), "Deadline must be in the future");
            return Err(TimerError::DeadlineInPast(deadline));
        }

        info!(timer_id = %id, deadline = %deadline.to_rfc3339(), "Creating timer with deadline");
        Ok(self.install(id, deadline, callback))
    }

    fn install(&self, id: String, expire_at: DateTime<Utc>, callback: TimerCallback) -> Arc<Timer> {
        let timer = Arc::new(Timer::new(id.clone(), expire_at, self.shutdown.child_token()));

        {
            let mut timers = self.timers.write();
            if let Some(existing) = timers.insert(id.clone(), Arc::clone(&timer)) {
                warn!(timer_id = %id, "Timer already exists, stopping existing timer");
                existing.stop();
            }
        }

        tokio::spawn(run(Arc::clone(&timer), Arc::clone(&self.timers), callback));
        info!(timer_id = %id, "Timer started");
        timer
    }

    /// Stop the timer registered under `id`.
    ///
    /// Unknown ids are an error; an id whose timer already fired or was
    /// stopped is not.
    pub fn stop(&self, id: &str) -> Result<(), TimerError> {
        let timer = self.timers.read().get(id).cloned();
        match timer {
            Some(timer) => {
                timer.stop();
                Ok(())
            }
            None => {
                warn!(timer_id = %id, "Timer not found");
                Err(TimerError::NotFound(id.to_string()))
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Arc<Timer>> {
        self.timers.read().get(id).cloned()
    }

    /// Ids of timers that are still pending, in no particular order
    pub fn active_ids(&self) -> Vec<String> {
        self.timers
            .read()
            .iter()
            .filter(|(_, timer)| timer.is_active())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Stop every timer present when the call starts. Timers created while
    /// the sweep runs may survive it. Returns how many were still active.
    pub fn stop_all(&self) -> usize {
        let snapshot: Vec<Arc<Timer>> = self.timers.read().values().cloned().collect();
        let active = snapshot.iter().filter(|t| t.is_active()).count();

        info!(count = active, "Stopping all active timers");
        for timer in snapshot {
            timer.stop();
        }
        active
    }

    /// Number of entries, including timers whose callback is still running
    pub fn len(&self) -> usize {
        self.timers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.timers.read().is_empty()
    }
}

/// Wait for expiry or cancellation, then run exactly one termination path.
async fn run(timer: Arc<Timer>, timers: TimerMap, callback: TimerCallback) {
    let wait = (timer.expire_at - Utc::now())
        .to_std()
        .unwrap_or_default();

    let elapsed = tokio::select! {
        biased;
        _ = timer.cancel.cancelled() => false,
        _ = tokio::time::sleep(wait) => true,
    };

    let outcome = {
        let mut map = timers.write();
        let outcome = timer.settle(elapsed);
        if outcome == TimerOutcome::Stopped {
            remove_if_current(&mut map, &timer);
        }
        outcome
    };

    match outcome {
        TimerOutcome::Stopped => {
            info!(timer_id = %timer.id, "Timer stopped manually");
        }
        TimerOutcome::Expired => {
            info!(timer_id = %timer.id, "Timer expired, executing callback");
            guarded_call(&timer.id, callback).await;
            remove_if_current(&mut timers.write(), &timer);
        }
    }
}

/// Remove `timer` from the map unless the id now belongs to a replacement.
fn remove_if_current(map: &mut HashMap<String, Arc<Timer>>, timer: &Arc<Timer>) {
    match map.get(&timer.id) {
        Some(current) if Arc::ptr_eq(current, timer) => {
            map.remove(&timer.id);
        }
        Some(_) => {
            debug!(timer_id = %timer.id, "Timer was replaced, leaving the new entry in place");
        }
        None => {}
    }
}
