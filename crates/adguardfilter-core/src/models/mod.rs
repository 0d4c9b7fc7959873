//! Data models for the AdGuard Home blocked-services API.
//!
//! - `ServiceConfig`, `Schedule`: the blocked-services configuration as
//!   returned by `/control/blocked_services/get` and accepted by `/update`
//! - `BlockedService`: one entry of the appliance's service catalog
//! - `ResetAfterMinutesRequest`, `ResetAtRequest`: facade request bodies that
//!   pair a configuration with a reset timer

pub mod service;

pub use service::{
    AllBlockedServicesResponse, BlockedService, ResetAfterMinutesRequest, ResetAtRequest,
    Schedule, ServiceConfig,
};
