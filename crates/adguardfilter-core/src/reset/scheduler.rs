use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;

use crate::api::{ApiClient, ApiError};
use crate::models::ServiceConfig;
use crate::timer::{self, Timer, TimerCallback, TimerError, TimerRegistry};

/// Every reset timer id starts with this.
pub const RESET_TIMER_PREFIX: &str = "reset-blocked-services";

/// Snapshot of the pending reset timer.
#[derive(Debug, Clone)]
pub struct TimerStatus {
    pub id: String,
    pub expire_at: DateTime<Utc>,
    pub remaining: chrono::Duration,
}

#[derive(Clone)]
pub struct ResetScheduler {
    client: ApiClient,
    registry: TimerRegistry,
    default_config: ServiceConfig,
}

impl ResetScheduler {
    pub fn new(client: ApiClient, registry: TimerRegistry, default_config: ServiceConfig) -> Self {
        Self {
            client,
            registry,
            default_config,
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn registry(&self) -> &TimerRegistry {
        &self.registry
    }

    pub fn default_config(&self) -> &ServiceConfig {
        &self.default_config
    }

    /// Push `config` to the appliance.
    pub async fn apply(&self, config: &ServiceConfig) -> Result<(), ApiError> {
        self.client.update_blocked_services(config).await
    }

    /// Restore the default configuration now.
    pub async fn reset(&self) -> Result<(), ApiError> {
        info!(
            count = self.default_config.ids.len(),
            "Resetting blocked services to default configuration"
        );
        self.client.update_blocked_services(&self.default_config).await
    }

    /// Check a minute count before anything is changed upstream.
    ///
    /// The count must be positive and its expiry must be representable.
    pub fn reset_delay(minutes: i64) -> Result<chrono::Duration, TimerError> {
        if minutes <= 0 {
            return Err(TimerError::NonPositiveDuration);
        }
        let delay = chrono::Duration::try_minutes(minutes).ok_or(TimerError::DurationTooLong)?;
        Utc::now()
            .checked_add_signed(delay)
            .ok_or(TimerError::DurationTooLong)?;
        Ok(delay)
    }

    /// Arm the reset timer to fire after `minutes`, replacing any pending one.
    /// A rejected count leaves the pending timer untouched.
    pub fn arm_after_minutes(&self, minutes: i64) -> Result<Arc<Timer>, TimerError> {
        let delay = Self::reset_delay(minutes)?;
        self.clear_pending();

        let id = format!("{}-{}", RESET_TIMER_PREFIX, minutes);
        self.registry
            .create_with_duration(id, delay, self.reset_callback("duration elapsed"))
    }

    /// Arm the reset timer to fire at `deadline`, replacing any pending one.
    pub fn arm_at(&self, deadline: DateTime<Utc>) -> Result<Arc<Timer>, TimerError> {
        if deadline <= Utc::now() {
            return Err(TimerError::DeadlineInPast(deadline));
        }
        self.clear_pending();

        let id = format!("{}-{}", RESET_TIMER_PREFIX, Utc::now().timestamp());
        self.registry
            .create_with_deadline(id, deadline, self.reset_callback("scheduled deadline reached"))
    }

    /// The pending reset timer, if any
    pub fn status(&self) -> Option<TimerStatus> {
        let mut ids = self.registry.active_ids();
        ids.sort();
        ids.into_iter().find_map(|id| {
            let timer = self.registry.get(&id).filter(|t| t.is_active())?;
            Some(TimerStatus {
                id,
                expire_at: timer.expire_at(),
                remaining: timer.time_remaining(),
            })
        })
    }

    /// Cancel pending timers and, if one was pending, restore the default
    /// configuration so a temporary change does not outlive the process.
    /// Returns whether a reset was sent.
    pub async fn shutdown(&self) -> Result<bool, ApiError> {
        let stopped = self.registry.stop_all();
        if stopped == 0 {
            info!("No active timers to stop");
            return Ok(false);
        }

        info!(count = stopped, "Stopped active timers, restoring defaults");
        self.reset().await?;
        Ok(true)
    }

    fn clear_pending(&self) {
        let active = self.registry.active_ids();
        if !active.is_empty() {
            info!(count = active.len(), "Stopping existing timer(s) before creating new one");
            self.registry.stop_all();
        }
    }

    fn reset_callback(&self, reason: &'static str) -> TimerCallback {
        let client = self.client.clone();
        let default_config = self.default_config.clone();
        timer::callback(move || async move {
            info!(reason = reason, "Resetting blocked services to default configuration");
            client
                .update_blocked_services(&default_config)
                .await
                .context("Failed to reset blocked services")
        })
    }
}
