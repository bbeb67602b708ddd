//! Read access, deletion and status over the persisted collection.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info, instrument};

use countryfx_common::{CountryFxError, CountryRecord, RefreshState, Result};
use countryfx_store::SharedStore;

/// Ordering applied to a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    GdpDesc,
    GdpAsc,
    PopulationDesc,
    PopulationAsc,
}

impl SortOrder {
    fn key(&self, record: &CountryRecord) -> f64 {
        match self {
            SortOrder::GdpDesc | SortOrder::GdpAsc => {
                record.estimated_gdp.unwrap_or(f64::NEG_INFINITY)
            }
            SortOrder::PopulationDesc | SortOrder::PopulationAsc => record.population as f64,
        }
    }

    fn is_descending(&self) -> bool {
        matches!(self, SortOrder::GdpDesc | SortOrder::PopulationDesc)
    }

    /// Compare two records. Missing values rank below every present value.
    pub fn compare(&self, a: &CountryRecord, b: &CountryRecord) -> Ordering {
        let ordering = self.key(a).total_cmp(&self.key(b));
        if self.is_descending() {
            ordering.reverse()
        } else {
            ordering
        }
    }

    /// Query-string spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::GdpDesc => "gdp_desc",
            SortOrder::GdpAsc => "gdp_asc",
            SortOrder::PopulationDesc => "population_desc",
            SortOrder::PopulationAsc => "population_asc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = CountryFxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gdp_desc" => Ok(SortOrder::GdpDesc),
            "gdp_asc" => Ok(SortOrder::GdpAsc),
            "population_desc" => Ok(SortOrder::PopulationDesc),
            "population_asc" => Ok(SortOrder::PopulationAsc),
            other => Err(CountryFxError::invalid_field(
                "sort",
                format!(
                    "unknown sort '{}', expected one of gdp_desc, gdp_asc, population_desc, population_asc",
                    other
                ),
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw listing parameters as they arrive on the query string.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub region: Option<String>,
    pub currency: Option<String>,
    pub sort: Option<String>,
}

/// Validated listing query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountryQuery {
    /// Exact, case-sensitive region.
    pub region: Option<String>,
    /// Exact currency code.
    pub currency: Option<String>,
    /// Ordering; insertion order when unset.
    pub sort: Option<SortOrder>,
}

impl CountryQuery {
    /// Check whether a record passes the filters.
    pub fn matches(&self, record: &CountryRecord) -> bool {
        let region_ok = self
            .region
            .as_deref()
            .map_or(true, |region| record.region == region);
        let currency_ok = self
            .currency
            .as_deref()
            .map_or(true, |code| record.currency_code.as_deref() == Some(code));

        region_ok && currency_ok
    }

    /// Filter and order `records`.
    pub fn apply(&self, records: Vec<CountryRecord>) -> Vec<CountryRecord> {
        let mut selected: Vec<CountryRecord> =
            records.into_iter().filter(|r| self.matches(r)).collect();

        if let Some(order) = self.sort {
            // stable: ties keep insertion order
            selected.sort_by(|a, b| order.compare(a, b));
        }
        selected
    }
}

impl TryFrom<ListParams> for CountryQuery {
    type Error = CountryFxError;

    fn try_from(params: ListParams) -> Result<Self> {
        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        Ok(Self {
            region: non_empty(params.region),
            currency: non_empty(params.currency),
            sort: non_empty(params.sort)
                .map(|s| s.parse::<SortOrder>())
                .transpose()?,
        })
    }
}

/// Serves lookups, listings, deletions and status.
pub struct QueryEngine {
    store: SharedStore,
}

impl QueryEngine {
    /// Create an engine over `store`.
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Find a country by name, ignoring case.
    pub async fn get(&self, name: &str) -> Result<CountryRecord> {
        self.store
            .find_by_name(name)
            .await?
            .ok_or_else(|| CountryFxError::NotFound(name.to_string()))
    }

    /// List countries matching `query`.
    #[instrument(skip(self))]
    pub async fn list(&self, query: &CountryQuery) -> Result<Vec<CountryRecord>> {
        let records = self.store.list().await?;
        let selected = query.apply(records);

        debug!(returned = selected.len(), "Listed countries");
        Ok(selected)
    }

    /// Delete a country by name, ignoring case.
    pub async fn delete(&self, name: &str) -> Result<CountryRecord> {
        let removed = self
            .store
            .delete_by_name(name)
            .await?
            .ok_or_else(|| CountryFxError::NotFound(name.to_string()))?;

        info!(id = %removed.id, name = %removed.name, "Deleted country");
        Ok(removed)
    }

    /// Current record count and last refresh time.
    pub async fn status(&self) -> Result<RefreshState> {
        Ok(RefreshState {
            total_countries: self.store.count().await?,
            last_refreshed_at: self.store.last_refreshed_at().await?,
        })
    }

    /// The `n` records with the highest positive GDP.
    pub async fn top_by_gdp(&self, n: usize) -> Result<Vec<CountryRecord>> {
        let query = CountryQuery {
            sort: Some(SortOrder::GdpDesc),
            ..Default::default()
        };
        let mut top = query.apply(self.store.list().await?);
        top.retain(|r| r.estimated_gdp.is_some_and(|gdp| gdp > 0.0));
        top.truncate(n);
        Ok(top)
    }
}
