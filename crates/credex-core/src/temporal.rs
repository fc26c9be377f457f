//! # Temporal Types: UTC-Only Timestamps
//!
//! Defines `Timestamp`, a UTC-only timestamp truncated to seconds
//! precision, serialized as RFC 3339 with the `Z` suffix.
//!
//! Exchange event ordering and offer expiration checks both rely on
//! timestamps comparing consistently across processes. Local timezone
//! offsets and sub-second noise would make the canonical byte sequence of
//! hashed content non-deterministic, so both are normalized away at
//! construction.

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{codes, CredexError};

/// A UTC-only timestamp, truncated to seconds precision.
///
/// # Construction
///
/// - [`Timestamp::now()`] for the current UTC time, truncated.
/// - [`Timestamp::from_utc()`] from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`] from an RFC 3339 string, converting to UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any timezone
    /// offset and converting to UTC.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the string is not valid RFC 3339.
    pub fn parse(s: &str) -> Result<Self, CredexError> {
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| {
            CredexError::validation(
                codes::BAD_TIMESTAMP,
                format!("invalid RFC 3339 timestamp {s:?}: {e}"),
            )
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CredexError> {
        let dt = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
            CredexError::validation(codes::BAD_TIMESTAMP, format!("invalid Unix timestamp: {secs}"))
        })?;
        Ok(Self(dt))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Render as ISO 8601 with Z suffix (e.g. `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }

    /// Whether this timestamp lies strictly in the past.
    pub fn is_past(&self) -> bool {
        self.0 < Utc::now()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
