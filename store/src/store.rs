//! The country store abstraction.

use std::sync::Arc;

use async_trait::async_trait;
use countryfx_common::{CountryId, CountryRecord, Timestamp};

use crate::error::StoreResult;

/// Persisted collection of country records plus the refresh-state singleton.
///
/// Every record write replaces the whole record. Name lookups ignore case.
/// `list` returns records in insertion order.
#[async_trait]
pub trait CountryStore: Send + Sync {
    /// Find the record whose name matches `name` ignoring case.
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>>;

    /// All records in insertion order.
    async fn list(&self) -> StoreResult<Vec<CountryRecord>>;

    /// Insert a new record. Fails with `Duplicate` if the id or the
    /// case-folded name is already taken.
    async fn insert(&self, record: CountryRecord) -> StoreResult<()>;

    /// Overwrite the record with the same id.
    async fn update(&self, record: CountryRecord) -> StoreResult<()>;

    /// Delete the record whose name matches ignoring case.
    async fn delete_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>>;

    /// Number of records.
    async fn count(&self) -> StoreResult<u64>;

    /// Highest id ever persisted, including records since deleted.
    async fn max_id(&self) -> StoreResult<Option<CountryId>>;

    /// Time of the last successful refresh.
    async fn last_refreshed_at(&self) -> StoreResult<Option<Timestamp>>;

    /// Record a successful refresh.
    async fn set_last_refreshed_at(&self, at: Timestamp) -> StoreResult<()>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn CountryStore>;
