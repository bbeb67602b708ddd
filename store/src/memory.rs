//! In-memory country store.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use countryfx_common::{CountryId, CountryRecord, NameKey, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::store::CountryStore;

#[derive(Default)]
struct Inner {
    /// Records by id. Ids grow with every insert, so id order is insertion order.
    records: BTreeMap<CountryId, CountryRecord>,
    /// Case-folded name to id.
    by_name: HashMap<NameKey, CountryId>,
    /// Highest id ever inserted.
    high_water: Option<CountryId>,
    last_refreshed_at: Option<Timestamp>,
}

/// Country store held in process memory.
///
/// A single lock guards the records, the name index and the refresh state,
/// so each write is visible all at once.
#[derive(Default)]
pub struct InMemoryCountryStore {
    inner: RwLock<Inner>,
}

impl InMemoryCountryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CountryStore for InMemoryCountryStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
        let inner = self.inner.read();
        Ok(inner
            .by_name
            .get(&NameKey::from_name(name))
            .and_then(|id| inner.records.get(id))
            .cloned())
    }

    async fn list(&self) -> StoreResult<Vec<CountryRecord>> {
        Ok(self.inner.read().records.values().cloned().collect())
    }

    async fn insert(&self, record: CountryRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let key = record.name_key();

        if inner.records.contains_key(&record.id) {
            return Err(StoreError::Duplicate(format!("id {}", record.id)));
        }
        if inner.by_name.contains_key(&key) {
            return Err(StoreError::Duplicate(format!("name '{}'", record.name)));
        }

        debug!(id = %record.id, name = %record.name, "Inserting record");

        inner.high_water = inner.high_water.max(Some(record.id));
        inner.by_name.insert(key, record.id);
        inner.records.insert(record.id, record);
        Ok(())
    }

    async fn update(&self, record: CountryRecord) -> StoreResult<()> {
        let mut inner = self.inner.write();
        let key = record.name_key();

        let old_key = match inner.records.get(&record.id) {
            Some(existing) => existing.name_key(),
            None => return Err(StoreError::Missing(record.id)),
        };

        if old_key != key {
            if inner.by_name.contains_key(&key) {
                return Err(StoreError::Duplicate(format!("name '{}'", record.name)));
            }
            inner.by_name.remove(&old_key);
            inner.by_name.insert(key, record.id);
        }

        inner.records.insert(record.id, record);
        Ok(())
    }

    async fn delete_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
        let mut inner = self.inner.write();

        let removed = inner
            .by_name
            .remove(&NameKey::from_name(name))
            .and_then(|id| inner.records.remove(&id));

        Ok(removed)
    }

    async fn count(&self) -> StoreResult<u64> {
        Ok(self.inner.read().records.len() as u64)
    }

    async fn max_id(&self) -> StoreResult<Option<CountryId>> {
        Ok(self.inner.read().high_water)
    }

    async fn last_refreshed_at(&self) -> StoreResult<Option<Timestamp>> {
        Ok(self.inner.read().last_refreshed_at)
    }

    async fn set_last_refreshed_at(&self, at: Timestamp) -> StoreResult<()> {
        self.inner.write().last_refreshed_at = Some(at);
        Ok(())
    }
}
