//! Core library for adguardfilter.
//!
//! Talks to an AdGuard Home appliance through a self-renewing cookie session
//! and schedules the timers that revert temporary blocked-services changes.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod reset;
pub mod timer;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::Credentials;
pub use config::{Config, ConfigError};
pub use models::ServiceConfig;
pub use reset::{parse_deadline, ResetScheduler, TimerStatus};
pub use timer::{Timer, TimerCallback, TimerError, TimerOutcome, TimerRegistry};
