//! Delivery lag — how far behind the producers this consumer is running.
//!
//! Outcome timestamps arrive in a fixed fractional-seconds UTC format. A
//! record that does not carry a timestamp, or carries one that does not
//! parse, simply produces no lag sample — never an aborted pipeline.

use chrono::NaiveDateTime;

use outcomes_core::OutcomeError;

/// The producers' timestamp format, e.g. `2024-01-01T00:00:00.000000Z`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

/// Parse an outcome timestamp.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, OutcomeError> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).map_err(|e| {
        OutcomeError::InvalidTimestamp {
            value: value.to_string(),
            reason: e.to_string(),
        }
    })
}

/// Delivery lag in fractional seconds: `now − timestamp`.
///
/// `now` is a parameter rather than an ambient clock read so callers control
/// the reference point (and tests can pin it).
pub fn delivery_lag(timestamp: &str, now: NaiveDateTime) -> Result<f64, OutcomeError> {
    let emitted = parse_timestamp(timestamp)?;
    let delta = now.signed_duration_since(emitted);
    let seconds = match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        // Out of microsecond range — millisecond precision is plenty there.
        None => delta.num_milliseconds() as f64 / 1_000.0,
    };
    Ok(seconds)
}
