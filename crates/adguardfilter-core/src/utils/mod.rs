//! Utility functions for formatting timer values.

pub mod format;

pub use format::{format_remaining, format_timestamp};
