//! Time utilities for CountryFX.

use chrono::{DateTime, SubsecRound, Utc};

/// A timestamp with timezone (always UTC).
pub type Timestamp = DateTime<Utc>;

/// Get the current timestamp.
///
/// Truncated to microseconds, the finest precision PostgreSQL keeps, so a
/// stored timestamp reads back equal to the one written.
pub fn now() -> Timestamp {
    Utc::now().trunc_subsecs(6)
}

/// Render a timestamp for human-facing output such as the summary image.
pub fn display(timestamp: &Timestamp) -> String {
    timestamp.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
