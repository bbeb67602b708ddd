//! PostgreSQL-backed country store.

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::{info, instrument};

use countryfx_common::{CountryId, CountryRecord, NameKey, Timestamp};

use crate::error::{StoreError, StoreResult};
use crate::store::CountryStore;

/// Maximum pooled connections.
const MAX_CONNECTIONS: u32 = 5;

const RECORD_COLUMNS: &str = "id, name, capital, region, population, currency_code, \
                              exchange_rate, estimated_gdp, flag_url, last_refreshed_at";

/// Country store persisted in a PostgreSQL schema.
///
/// Records live in `<schema>.countries` with a unique `name_key` column
/// holding the case-folded name. The refresh timestamp and the id
/// high-water mark live in the single row of `<schema>.metadata`.
pub struct PgCountryStore {
    pool: PgPool,
    schema: String,
}

impl PgCountryStore {
    /// Connect and make sure the schema exists.
    #[instrument(skip(database_url))]
    pub async fn connect(database_url: &str, schema: &str) -> StoreResult<Self> {
        if !is_valid_schema_name(schema) {
            return Err(StoreError::InvalidSchema(schema.to_string()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await?;

        let store = Self {
            pool,
            schema: schema.to_string(),
        };
        store.migrate().await?;

        info!(schema, "Connected to PostgreSQL store");
        Ok(store)
    }

    async fn migrate(&self) -> StoreResult<()> {
        let s = &self.schema;
        let statements = [
            format!("CREATE SCHEMA IF NOT EXISTS {s}"),
            format!(
                "CREATE TABLE IF NOT EXISTS {s}.countries (
                    id BIGINT PRIMARY KEY,
                    name TEXT NOT NULL,
                    name_key TEXT NOT NULL UNIQUE,
                    capital TEXT,
                    region TEXT NOT NULL,
                    population BIGINT NOT NULL CHECK (population >= 0),
                    currency_code TEXT,
                    exchange_rate DOUBLE PRECISION,
                    estimated_gdp DOUBLE PRECISION,
                    flag_url TEXT NOT NULL,
                    last_refreshed_at TIMESTAMPTZ NOT NULL
                )"
            ),
            format!(
                "CREATE TABLE IF NOT EXISTS {s}.metadata (
                    singleton BOOLEAN PRIMARY KEY DEFAULT TRUE CHECK (singleton),
                    last_refreshed_at TIMESTAMPTZ,
                    id_high_water BIGINT NOT NULL DEFAULT 0
                )"
            ),
            format!("INSERT INTO {s}.metadata (singleton) VALUES (TRUE) ON CONFLICT DO NOTHING"),
        ];

        for statement in &statements {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    fn table(&self) -> String {
        format!("{}.countries", self.schema)
    }

    fn metadata(&self) -> String {
        format!("{}.metadata", self.schema)
    }
}

/// Plain lower-case identifier usable as an unquoted schema name.
pub fn is_valid_schema_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

fn record_from_row(row: &PgRow) -> StoreResult<CountryRecord> {
    let population: i64 = row.try_get("population")?;

    Ok(CountryRecord {
        id: CountryId::new(row.try_get("id")?),
        name: row.try_get("name")?,
        capital: row.try_get("capital")?,
        region: row.try_get("region")?,
        population: u64::try_from(population)
            .map_err(|_| StoreError::Database(format!("negative population {population}")))?,
        currency_code: row.try_get("currency_code")?,
        exchange_rate: row.try_get("exchange_rate")?,
        estimated_gdp: row.try_get("estimated_gdp")?,
        flag_url: row.try_get("flag_url")?,
        last_refreshed_at: row.try_get("last_refreshed_at")?,
    })
}

fn population_param(record: &CountryRecord) -> StoreResult<i64> {
    i64::try_from(record.population)
        .map_err(|_| StoreError::Database(format!("population {} too large", record.population)))
}

#[async_trait]
impl CountryStore for PgCountryStore {
    async fn find_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE name_key = $1",
            self.table()
        );
        let row = sqlx::query(&sql)
            .bind(NameKey::from_name(name).as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn list(&self) -> StoreResult<Vec<CountryRecord>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM {} ORDER BY id", self.table());
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;

        rows.iter().map(record_from_row).collect()
    }

    async fn insert(&self, record: CountryRecord) -> StoreResult<()> {
        let population = population_param(&record)?;
        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO {} (id, name, name_key, capital, region, population, currency_code, \
             exchange_rate, estimated_gdp, flag_url, last_refreshed_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
            self.table()
        );
        sqlx::query(&sql)
            .bind(record.id.value())
            .bind(&record.name)
            .bind(record.name_key().as_str())
            .bind(&record.capital)
            .bind(&record.region)
            .bind(population)
            .bind(&record.currency_code)
            .bind(record.exchange_rate)
            .bind(record.estimated_gdp)
            .bind(&record.flag_url)
            .bind(record.last_refreshed_at)
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "UPDATE {} SET id_high_water = GREATEST(id_high_water, $1)",
            self.metadata()
        );
        sqlx::query(&sql)
            .bind(record.id.value())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn update(&self, record: CountryRecord) -> StoreResult<()> {
        let population = population_param(&record)?;
        let sql = format!(
            "UPDATE {} SET name = $2, name_key = $3, capital = $4, region = $5, population = $6, \
             currency_code = $7, exchange_rate = $8, estimated_gdp = $9, flag_url = $10, \
             last_refreshed_at = $11 WHERE id = $1",
            self.table()
        );
        let result = sqlx::query(&sql)
            .bind(record.id.value())
            .bind(&record.name)
            .bind(record.name_key().as_str())
            .bind(&record.capital)
            .bind(&record.region)
            .bind(population)
            .bind(&record.currency_code)
            .bind(record.exchange_rate)
            .bind(record.estimated_gdp)
            .bind(&record.flag_url)
            .bind(record.last_refreshed_at)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(record.id));
        }
        Ok(())
    }

    async fn delete_by_name(&self, name: &str) -> StoreResult<Option<CountryRecord>> {
        let sql = format!(
            "DELETE FROM {} WHERE name_key = $1 RETURNING {RECORD_COLUMNS}",
            self.table()
        );
        let row = sqlx::query(&sql)
            .bind(NameKey::from_name(name).as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(record_from_row).transpose()
    }

    async fn count(&self) -> StoreResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {}", self.table());
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count.max(0) as u64)
    }

    async fn max_id(&self) -> StoreResult<Option<CountryId>> {
        let sql = format!(
            "SELECT GREATEST(m.id_high_water, COALESCE((SELECT MAX(id) FROM {}), 0)) FROM {} m",
            self.table(),
            self.metadata()
        );
        let high_water: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok((high_water > 0).then(|| CountryId::new(high_water)))
    }

    async fn last_refreshed_at(&self) -> StoreResult<Option<Timestamp>> {
        let sql = format!("SELECT last_refreshed_at FROM {}", self.metadata());
        let at: Option<Timestamp> = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(at)
    }

    async fn set_last_refreshed_at(&self, at: Timestamp) -> StoreResult<()> {
        let sql = format!("UPDATE {} SET last_refreshed_at = $1", self.metadata());
        sqlx::query(&sql).bind(at).execute(&self.pool).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    use countryfx_common::now;

    #[test]
    fn test_schema_name_validation() {
        assert!(is_valid_schema_name("countries_db"));
        assert!(is_valid_schema_name("_private2"));
        assert!(!is_valid_schema_name(""));
        assert!(!is_valid_schema_name("2fast"));
        assert!(!is_valid_schema_name("Countries"));
        assert!(!is_valid_schema_name("drop table; --"));
        assert!(!is_valid_schema_name(&"a".repeat(64)));
    }

    #[tokio::test]
    async fn test_connect_rejects_bad_schema() {
        let result = PgCountryStore::connect("postgres://localhost/unused", "bad-name").await;
        assert!(matches!(result, Err(StoreError::InvalidSchema(_))));
    }

    // Tests below need a live server: DATABASE_URL=... cargo test -- --ignored

    static SCHEMA_SEQ: AtomicU32 = AtomicU32::new(0);

    /// A throwaway schema on the server named by `DATABASE_URL`.
    struct TestDb {
        url: String,
        schema: String,
    }

    impl TestDb {
        fn from_env() -> Option<Self> {
            let url = std::env::var("DATABASE_URL").ok()?;
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos();
            let seq = SCHEMA_SEQ.fetch_add(1, Ordering::SeqCst);
            Some(Self {
                url,
                schema: format!("countryfx_test_{nanos}_{seq}"),
            })
        }

        async fn open(&self) -> PgCountryStore {
            PgCountryStore::connect(&self.url, &self.schema).await.unwrap()
        }

        async fn drop_schema(&self, store: &PgCountryStore) {
            sqlx::query(&format!("DROP SCHEMA {} CASCADE", self.schema))
                .execute(&store.pool)
                .await
                .unwrap();
        }
    }

    fn record(id: i64, name: &str) -> CountryRecord {
        CountryRecord {
            id: CountryId::new(id),
            name: name.to_string(),
            capital: Some(format!("{name} City")),
            region: "Testregion".to_string(),
            population: 1000,
            currency_code: Some("TST".to_string()),
            exchange_rate: Some(10.0),
            estimated_gdp: Some(150_000.0),
            flag_url: format!("https://flags.example/{id}.svg"),
            last_refreshed_at: now(),
        }
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_insert_and_find_ignoring_case() {
        let Some(db) = TestDb::from_env() else { return };
        let store = db.open().await;

        let chad = record(1, "Chad");
        store.insert(chad.clone()).await.unwrap();

        assert_eq!(store.find_by_name("CHAD").await.unwrap(), Some(chad));
        assert_eq!(store.find_by_name("Niger").await.unwrap(), None);
        assert_eq!(store.count().await.unwrap(), 1);

        db.drop_schema(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_duplicate_name_rejected() {
        let Some(db) = TestDb::from_env() else { return };
        let store = db.open().await;

        store.insert(record(1, "Chad")).await.unwrap();
        let result = store.insert(record(2, "chad")).await;

        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(store.count().await.unwrap(), 1);

        db.drop_schema(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_update_overwrites_record() {
        let Some(db) = TestDb::from_env() else { return };
        let store = db.open().await;

        store.insert(record(1, "Chad")).await.unwrap();
        let mut changed = record(1, "CHAD");
        changed.population = 17_000_000;
        changed.exchange_rate = None;
        changed.estimated_gdp = None;
        store.update(changed.clone()).await.unwrap();

        assert_eq!(store.find_by_name("chad").await.unwrap(), Some(changed));
        assert!(matches!(
            store.update(record(9, "Nowhere")).await,
            Err(StoreError::Missing(_))
        ));

        db.drop_schema(&store).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_high_water_survives_delete_and_reconnect() {
        let Some(db) = TestDb::from_env() else { return };
        let store = db.open().await;

        store.insert(record(1, "Alpha")).await.unwrap();
        store.insert(record(2, "Beta")).await.unwrap();
        store.delete_by_name("beta").await.unwrap().unwrap();

        let reopened = db.open().await;
        assert_eq!(reopened.max_id().await.unwrap(), Some(CountryId::new(2)));
        assert_eq!(reopened.count().await.unwrap(), 1);

        db.drop_schema(&reopened).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_refresh_time_survives_reconnect() {
        let Some(db) = TestDb::from_env() else { return };
        let store = db.open().await;
        assert_eq!(store.last_refreshed_at().await.unwrap(), None);

        let at = now();
        store.set_last_refreshed_at(at).await.unwrap();

        let reopened = db.open().await;
        assert_eq!(reopened.last_refreshed_at().await.unwrap(), Some(at));

        db.drop_schema(&reopened).await;
    }

    #[tokio::test]
    #[ignore = "requires DATABASE_URL"]
    async fn test_pg_list_in_insertion_order() {
        let Some(db) = TestDb::from_env() else { return };
        let store = db.open().await;

        for (id, name) in [(1, "Gamma"), (2, "Alpha"), (3, "Beta")] {
            store.insert(record(id, name)).await.unwrap();
        }

        let names: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Gamma", "Alpha", "Beta"]);

        db.drop_schema(&store).await;
    }
}
