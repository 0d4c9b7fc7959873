//! Temporary blocked-services changes that revert on a timer.
//!
//! `ResetScheduler` applies a configuration upstream and arms a single
//! system-wide reset timer. The timer registry itself allows one timer per
//! id; the scheduler narrows that to one reset timer in total by stopping
//! every timer before arming a new one.

pub mod deadline;
pub mod scheduler;

pub use deadline::parse_deadline;
pub use scheduler::{ResetScheduler, TimerStatus, RESET_TIMER_PREFIX};
