//! Period strings
//!
//! Durations are written as a count followed by a unit, e.g. `24h`, `7d`,
//! `30m`. Supported units: `s`, `m`, `h`, `d`, `w`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("period string is empty")]
    Empty,
    #[error("invalid period count in '{0}'")]
    InvalidCount(String),
    #[error("unknown period unit in '{0}' (expected s, m, h, d or w)")]
    UnknownUnit(String),
}

const UNITS: [(char, u64); 5] = [
    ('w', 7 * 24 * 60 * 60),
    ('d', 24 * 60 * 60),
    ('h', 60 * 60),
    ('m', 60),
    ('s', 1),
];

/// Parses a period string into a duration
pub fn parse_period(input: &str) -> Result<Duration, PeriodError> {
    let input = input.trim();
    let unit = input.chars().last().ok_or(PeriodError::Empty)?;
    let seconds_per_unit = UNITS
        .iter()
        .find(|(u, _)| *u == unit)
        .map(|(_, secs)| *secs)
        .ok_or_else(|| PeriodError::UnknownUnit(input.to_string()))?;

    let count: u64 = input[..input.len() - unit.len_utf8()]
        .parse()
        .map_err(|_| PeriodError::InvalidCount(input.to_string()))?;

    count
        .checked_mul(seconds_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| PeriodError::InvalidCount(input.to_string()))
}

/// Formats a duration using the largest unit that divides it evenly
///
/// Sub-second precision is dropped.
pub fn format_period(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        return "0s".to_string();
    }
    let (unit, per) = UNITS
        .iter()
        .find(|(_, per)| secs % per == 0)
        .copied()
        .unwrap_or(('s', 1));
    format!("{}{}", secs / per, unit)
}

/// Serde adapter storing a `Duration` as a period string
pub mod serde_period {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::format_period(*duration))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_period(&s).map_err(de::Error::custom)
    }
}
