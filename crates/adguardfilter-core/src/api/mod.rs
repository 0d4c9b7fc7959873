//! REST API client module for AdGuard Home.
//!
//! This module provides the `ApiClient` for reading and replacing the
//! appliance's blocked-services configuration.
//!
//! The API uses cookie sessions obtained from `/control/login`; an expired
//! session is renewed transparently, once per request.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
