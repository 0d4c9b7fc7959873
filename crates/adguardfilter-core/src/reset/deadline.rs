use chrono::{DateTime, NaiveDateTime, Utc};

use crate::timer::TimerError;

/// Zone-less layouts sent by browsers and scripts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

/// Parse a reset deadline.
///
/// RFC 3339 with an offset is preferred; zone-less timestamps are taken as UTC.
pub fn parse_deadline(input: &str) -> Result<DateTime<Utc>, TimerError> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimerError::InvalidDeadline(input.to_string()))
}
