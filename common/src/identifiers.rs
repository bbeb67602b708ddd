//! Identifier types for CountryFX entities.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Surrogate key of a persisted country record.
///
/// Assigned once at insert time and never reused, even after the record is
/// deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryId(i64);

impl CountryId {
    /// The id handed out when nothing has ever been persisted.
    pub const FIRST: CountryId = CountryId(1);

    /// Wrap a raw id.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The id that follows this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Allocate the id following the given high-water mark.
    pub fn after(high_water: Option<CountryId>) -> Self {
        high_water.map(|id| id.next()).unwrap_or(Self::FIRST)
    }

    /// Get the raw value.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for CountryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for CountryId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Case-folded country name used as the natural key.
///
/// Two names that differ only by case produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NameKey(String);

impl NameKey {
    /// Fold a display name into its key.
    pub fn from_name(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NameKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NameKey {
    fn from(name: &str) -> Self {
        Self::from_name(name)
    }
}

/// Identifier for a single refresh cycle, carried in log spans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RefreshId(Uuid);

impl RefreshId {
    /// Create a new refresh ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RefreshId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RefreshId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
