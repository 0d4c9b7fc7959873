use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimerError {
    #[error("duration must be greater than 0")]
    NonPositiveDuration,

    #[error("duration is too long, expiry would be out of range")]
    DurationTooLong,

    #[error("deadline must be in the future (got {0})")]
    DeadlineInPast(DateTime<Utc>),

    #[error("invalid datetime format: {0:?}, use ISO 8601 (e.g. 2025-10-12T15:30:00Z)")]
    InvalidDeadline(String),

    #[error("timer not found: {0}")]
    NotFound(String),
}

impl TimerError {
    /// Rejected input, as opposed to a lookup miss
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TimerError::NonPositiveDuration
                | TimerError::DurationTooLong
                | TimerError::DeadlineInPast(_)
                | TimerError::InvalidDeadline(_)
        )
    }
}
