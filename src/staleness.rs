//! Reading age limits.
//!
//! Records keep no history, so a meter that goes out of range keeps its last
//! reading forever. A `Staleness` policy hides readings whose newest fragment
//! is older than a configured age.

use crate::reading::SensorReading;
use std::time::{Duration, SystemTime};

/// Freshness policy applied at output time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Staleness {
    max_age: Option<Duration>,
}

impl Staleness {
    /// Keep every reading regardless of age.
    pub fn unlimited() -> Self {
        Self { max_age: None }
    }

    pub fn max_age(max_age: Duration) -> Self {
        Self {
            max_age: Some(max_age),
        }
    }

    pub fn is_fresh(&self, reading: &SensorReading, now: SystemTime) -> bool {
        self.max_age.is_none_or(|limit| reading.age(now) <= limit)
    }
}

impl From<Option<Duration>> for Staleness {
    fn from(max_age: Option<Duration>) -> Self {
        Self { max_age }
    }
}

/// Parse a duration from a human-readable string.
///
/// Supports the following suffixes:
/// - `s` or no suffix: seconds
/// - `m`: minutes
/// - `h`: hours
/// - `ms`: milliseconds
///
/// # Examples
/// ```
/// use switchbot_listener::staleness::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be checked before "m" and "s".
    let (number, scale, unit) = if let Some(num) = src.strip_suffix("ms") {
        (num, 1, "milliseconds")
    } else if let Some(num) = src.strip_suffix('h') {
        (num, 3_600_000, "hours")
    } else if let Some(num) = src.strip_suffix('m') {
        (num, 60_000, "minutes")
    } else if let Some(num) = src.strip_suffix('s') {
        (num, 1_000, "seconds")
    } else {
        (src, 1_000, "seconds")
    };

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid {unit}: {number}"))?;
    value
        .checked_mul(scale)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration too large: {src}"))
}
