//! Duration and power target conversion
//!
//! Workout catalogs describe steps as `MM:SS` durations and power as a
//! percentage of FTP. These helpers turn them into milliseconds and watts.
//!
//! Watts are rounded half-to-even on the exact decimal product, so `"52.5%"`
//! of 100 W is 52 W and `"53.5%"` of 100 W is 54 W.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;

use crate::error::ConversionError;

const MS_PER_SECOND: u64 = 1000;
const SECONDS_PER_MINUTE: u64 = 60;

/// Convert an `MM:SS` duration to milliseconds.
///
/// Exactly two non-negative integer fields are accepted. Seconds are not
/// capped at 59.
pub fn parse_duration(text: &str) -> Result<u64, ConversionError> {
    let invalid = || ConversionError::InvalidDuration {
        value: text.to_string(),
    };

    let mut fields = text.split(':');
    let (minutes, seconds) = match (fields.next(), fields.next(), fields.next()) {
        (Some(minutes), Some(seconds), None) => (minutes, seconds),
        _ => return Err(invalid()),
    };

    let minutes: u64 = minutes.trim().parse().map_err(|_| invalid())?;
    let seconds: u64 = seconds.trim().parse().map_err(|_| invalid())?;

    minutes
        .checked_mul(SECONDS_PER_MINUTE)
        .and_then(|m| m.checked_add(seconds))
        .and_then(|s| s.checked_mul(MS_PER_SECOND))
        .ok_or_else(invalid)
}

/// Convert a percentage of FTP such as `"110%"` to absolute watts.
///
/// A value without the trailing `%` is a [`ConversionError::MissingPercentSign`],
/// which callers must not treat as a skippable step.
pub fn percent_to_watts(text: &str, ftp: u16) -> Result<i64, ConversionError> {
    let number = text
        .strip_suffix('%')
        .ok_or_else(|| ConversionError::MissingPercentSign {
            value: text.to_string(),
        })?;

    let invalid = || ConversionError::InvalidPercentage {
        value: text.to_string(),
    };

    let percentage = Decimal::from_str(number.trim()).map_err(|_| invalid())?;
    let watts = percentage
        .checked_mul(Decimal::from(ftp))
        .and_then(|p| p.checked_div(Decimal::ONE_HUNDRED))
        .ok_or_else(invalid)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);

    watts.to_i64().ok_or_else(invalid)
}

/// Format milliseconds back to `MM:SS`
pub fn format_duration(duration_ms: u64) -> String {
    let total_seconds = duration_ms / MS_PER_SECOND;
    format!(
        "{:02}:{:02}",
        total_seconds / SECONDS_PER_MINUTE,
        total_seconds % SECONDS_PER_MINUTE
    )
}
