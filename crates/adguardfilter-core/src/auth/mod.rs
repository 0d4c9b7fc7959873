//! Session state for the AdGuard Home API.
//!
//! This module provides:
//! - `Credentials`: base URL, username and password kept for silent re-login
//! - `Session`: credentials plus the cookies issued by `/control/login`
//!
//! The session lives in memory only; a restart logs in again.

pub mod session;

pub use session::{Credentials, Session, SessionCookie};
