//! Reconciliation of a refresh batch against the persisted collection.

use std::collections::HashMap;

use tracing::{debug, info, instrument, warn};

use countryfx_common::{CountryDraft, CountryId, NameKey, Result, Timestamp};
use countryfx_store::{SharedStore, StoreError};

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Records created by this batch.
    pub inserted: usize,
    /// Records overwritten by this batch (including repeat hits within it).
    pub updated: usize,
    /// Persisted record count after the batch.
    pub total_countries: u64,
}

/// Upserts drafts by case-insensitive name and maintains the refresh state.
pub struct ReconciliationEngine {
    store: SharedStore,
}

impl ReconciliationEngine {
    /// Create an engine over `store`.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Apply `drafts` in order, stamping every touched record with
    /// `refreshed_at`.
    ///
    /// Existing records keep their id. New names get the id after the store's
    /// current high-water mark, read at the moment of each insert. Records
    /// missing from the batch are left alone. Drafts whose names collide with
    /// each other resolve to one record; the last one applied wins. A record
    /// deleted while the batch runs is inserted again under a fresh id.
    ///
    /// The refresh timestamp is written only after every record write has
    /// succeeded, so a failure part-way leaves it unchanged.
    #[instrument(skip(self, drafts), fields(batch = drafts.len()))]
    pub async fn reconcile(
        &self,
        drafts: Vec<CountryDraft>,
        refreshed_at: Timestamp,
    ) -> Result<ReconcileReport> {
        let mut index: HashMap<NameKey, CountryId> = self
            .store
            .list()
            .await?
            .into_iter()
            .map(|record| (record.name_key(), record.id))
            .collect();

        let mut inserted = 0;
        let mut updated = 0;

        for draft in drafts {
            let key = draft.name_key();

            if let Some(id) = index.get(&key).copied() {
                debug!(id = %id, name = %draft.name, "Updating country");
                match self
                    .store
                    .update(draft.clone().into_record(id, refreshed_at))
                    .await
                {
                    Ok(()) => {
                        updated += 1;
                        continue;
                    }
                    // deleted since the index was read; insert it afresh
                    Err(StoreError::Missing(_)) => {
                        warn!(id = %id, name = %draft.name, "Country vanished during refresh");
                        index.remove(&key);
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            let id = CountryId::after(self.store.max_id().await?);
            debug!(id = %id, name = %draft.name, "Inserting country");
            self.store
                .insert(draft.into_record(id, refreshed_at))
                .await?;
            index.insert(key, id);
            inserted += 1;
        }

        self.store.set_last_refreshed_at(refreshed_at).await?;
        let total_countries = self.store.count().await?;

        info!(inserted, updated, total_countries, "Reconciled batch");

        Ok(ReconcileReport {
            inserted,
            updated,
            total_countries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use countryfx_common::{now, CountryFxError, CountryRecord};
    use countryfx_store::{CountryStore, InMemoryCountryStore, StoreError, StoreResult};

    fn draft(name: &str, population: u64) -> CountryDraft {
        CountryDraft {
            name: name.to_string(),
            capital: None,
            region: "Testregion".to_string(),
            population,
            currency_code: Some("TST".to_string()),
            exchange_rate: Some(10.0),
            estimated_gdp: Some(population as f64 * 150.0),
            flag_url: String::new(),
        }
    }

    fn engine() -> (ReconciliationEngine, Arc<InMemoryCountryStore>) {
        let store = Arc::new(InMemoryCountryStore::new());
        (ReconciliationEngine::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_inserts_with_sequential_ids() {
        let (engine, store) = engine();
        let at = now();

        let report = engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 2), draft("Gamma", 3)], at)
            .await
            .unwrap();

        assert_eq!(report.inserted, 3);
        assert_eq!(report.total_countries, 3);

        let ids: Vec<i64> = store
            .list()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id.value())
            .collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(store.last_refreshed_at().await.unwrap(), Some(at));
    }

    #[tokio::test]
    async fn test_second_pass_keeps_ids() {
        let (engine, store) = engine();
        engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 2)], now())
            .await
            .unwrap();

        let second = now();
        let report = engine
            .reconcile(vec![draft("Alpha", 10), draft("Beta", 20)], second)
            .await
            .unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.updated, 2);

        let beta = store.find_by_name("beta").await.unwrap().unwrap();
        assert_eq!(beta.id, CountryId::new(2));
        assert_eq!(beta.population, 20);
        assert_eq!(beta.last_refreshed_at, second);
    }

    #[tokio::test]
    async fn test_case_variant_updates_same_record() {
        let (engine, store) = engine();
        engine.reconcile(vec![draft("Testland", 1000)], now()).await.unwrap();

        engine
            .reconcile(vec![draft("Testland", 1000), draft("testland", 1200)], now())
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, CountryId::new(1));
        assert_eq!(records[0].name, "testland");
        assert_eq!(records[0].population, 1200);
    }

    #[tokio::test]
    async fn test_intra_batch_collision_last_wins() {
        let (engine, store) = engine();

        let report = engine
            .reconcile(vec![draft("Congo", 5), draft("CONGO", 6)], now())
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 1);
        let congo = store.find_by_name("congo").await.unwrap().unwrap();
        assert_eq!(congo.name, "CONGO");
        assert_eq!(congo.population, 6);
    }

    #[tokio::test]
    async fn test_absent_records_not_pruned() {
        let (engine, store) = engine();
        let first = now();
        engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 2)], first)
            .await
            .unwrap();

        engine.reconcile(vec![draft("Alpha", 1)], now()).await.unwrap();

        let beta = store.find_by_name("Beta").await.unwrap().unwrap();
        assert_eq!(beta.last_refreshed_at, first);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_deleted_top_id_not_reused() {
        let (engine, store) = engine();
        engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 2)], now())
            .await
            .unwrap();
        store.delete_by_name("beta").await.unwrap();

        engine.reconcile(vec![draft("Gamma", 3)], now()).await.unwrap();

        let gamma = store.find_by_name("gamma").await.unwrap().unwrap();
        assert_eq!(gamma.id, CountryId::new(3));
    }

    #[tokio::test]
    async fn test_ids_unique_after_mixed_operations() {
        let (engine, store) = engine();
        engine
            .reconcile(vec![draft("A", 1), draft("B", 1), draft("C", 1)], now())
            .await
            .unwrap();
        store.delete_by_name("a").await.unwrap();
        store.delete_by_name("c").await.unwrap();
        engine
            .reconcile(vec![draft("a", 1), draft("D", 1), draft("b", 1)], now())
            .await
            .unwrap();

        let records = store.list().await.unwrap();
        let ids: HashSet<CountryId> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), records.len());
        assert_eq!(records.len(), 3);
    }

    /// Store that fails the n-th write.
    struct FlakyStore {
        inner: InMemoryCountryStore,
        writes: AtomicUsize,
        fail_at: usize,
    }

    impl FlakyStore {
        fn check(&self) -> StoreResult<()> {
            if self.writes.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_at {
                return Err(StoreError::Database("connection reset".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl CountryStore for FlakyStore {
        async fn find_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
            self.inner.find_by_name(name).await
        }
        async fn list(&self) -> StoreResult<Vec<CountryRecord>> {
            self.inner.list().await
        }
        async fn insert(&self, record: CountryRecord) -> StoreResult<()> {
            self.check()?;
            self.inner.insert(record).await
        }
        async fn update(&self, record: CountryRecord) -> StoreResult<()> {
            self.check()?;
            self.inner.update(record).await
        }
        async fn delete_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
            self.inner.delete_by_name(name).await
        }
        async fn count(&self) -> StoreResult<u64> {
            self.inner.count().await
        }
        async fn max_id(&self) -> StoreResult<Option<CountryId>> {
            self.inner.max_id().await
        }
        async fn last_refreshed_at(&self) -> StoreResult<Option<Timestamp>> {
            self.inner.last_refreshed_at().await
        }
        async fn set_last_refreshed_at(&self, at: Timestamp) -> StoreResult<()> {
            self.inner.set_last_refreshed_at(at).await
        }
    }

    #[tokio::test]
    async fn test_failure_mid_batch_leaves_timestamp() {
        let store = Arc::new(FlakyStore {
            inner: InMemoryCountryStore::new(),
            writes: AtomicUsize::new(0),
            fail_at: 2,
        });
        let engine = ReconciliationEngine::new(store.clone());

        let result = engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 2)], now())
            .await;

        assert!(matches!(result, Err(CountryFxError::DatabaseError(_))));
        assert!(store.last_refreshed_at().await.unwrap().is_none());
    }

    /// Store that deletes one name right after handing out its listing.
    struct RacingDeleteStore {
        inner: InMemoryCountryStore,
        victim: &'static str,
        armed: AtomicBool,
    }

    #[async_trait]
    impl CountryStore for RacingDeleteStore {
        async fn find_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
            self.inner.find_by_name(name).await
        }
        async fn list(&self) -> StoreResult<Vec<CountryRecord>> {
            let records = self.inner.list().await?;
            if self.armed.swap(false, Ordering::SeqCst) {
                self.inner.delete_by_name(self.victim).await?;
            }
            Ok(records)
        }
        async fn insert(&self, record: CountryRecord) -> StoreResult<()> {
            self.inner.insert(record).await
        }
        async fn update(&self, record: CountryRecord) -> StoreResult<()> {
            self.inner.update(record).await
        }
        async fn delete_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
            self.inner.delete_by_name(name).await
        }
        async fn count(&self) -> StoreResult<u64> {
            self.inner.count().await
        }
        async fn max_id(&self) -> StoreResult<Option<CountryId>> {
            self.inner.max_id().await
        }
        async fn last_refreshed_at(&self) -> StoreResult<Option<Timestamp>> {
            self.inner.last_refreshed_at().await
        }
        async fn set_last_refreshed_at(&self, at: Timestamp) -> StoreResult<()> {
            self.inner.set_last_refreshed_at(at).await
        }
    }

    #[tokio::test]
    async fn test_record_deleted_mid_batch_is_reinserted() {
        let store = Arc::new(RacingDeleteStore {
            inner: InMemoryCountryStore::new(),
            victim: "beta",
            armed: AtomicBool::new(false),
        });
        let engine = ReconciliationEngine::new(store.clone());
        engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 2), draft("Gamma", 3)], now())
            .await
            .unwrap();

        store.armed.store(true, Ordering::SeqCst);
        let second = now();
        let report = engine
            .reconcile(vec![draft("Alpha", 1), draft("Beta", 20), draft("Gamma", 3)], second)
            .await
            .unwrap();

        assert_eq!(report.inserted, 1);
        assert_eq!(report.updated, 2);
        assert_eq!(report.total_countries, 3);

        let beta = store.find_by_name("beta").await.unwrap().unwrap();
        assert_eq!(beta.id, CountryId::new(4));
        assert_eq!(beta.population, 20);
        assert_eq!(store.last_refreshed_at().await.unwrap(), Some(second));
    }
}
