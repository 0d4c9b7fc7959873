//! HTTP server for adguardfilter.
//!
//! Exposes endpoints that change the blocked-services list on an AdGuard Home
//! appliance and arm a timer that restores the defaults later.

pub mod logging;
pub mod routes;
pub mod serve;

pub use routes::router;
pub use serve::serve;
