//! Country record types.

use serde::{Deserialize, Serialize};

use crate::{CountryId, NameKey, Timestamp};

/// A persisted country with its resolved currency and estimated GDP.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryRecord {
    /// Surrogate key.
    pub id: CountryId,
    /// Display name, unique ignoring case.
    pub name: String,
    /// Capital city.
    pub capital: Option<String>,
    /// Region as reported by the country provider (may be empty).
    pub region: String,
    /// Population count.
    pub population: u64,
    /// Resolved ISO 4217 currency code.
    pub currency_code: Option<String>,
    /// Units of `currency_code` per unit of the rate base currency.
    pub exchange_rate: Option<f64>,
    /// Estimated GDP in the rate base currency.
    pub estimated_gdp: Option<f64>,
    /// URL of the flag image.
    pub flag_url: String,
    /// Time of the refresh that last wrote this record.
    pub last_refreshed_at: Timestamp,
}

impl CountryRecord {
    /// Natural key of this record.
    pub fn name_key(&self) -> NameKey {
        NameKey::from_name(&self.name)
    }

    /// Check whether this record matches a name, ignoring case.
    pub fn matches_name(&self, name: &str) -> bool {
        self.name_key() == NameKey::from_name(name)
    }
}

/// A freshly computed country, not yet reconciled against the store.
///
/// Carries every record field except the surrogate id and the refresh
/// timestamp, which are assigned during reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct CountryDraft {
    pub name: String,
    pub capital: Option<String>,
    pub region: String,
    pub population: u64,
    pub currency_code: Option<String>,
    pub exchange_rate: Option<f64>,
    pub estimated_gdp: Option<f64>,
    pub flag_url: String,
}

impl CountryDraft {
    /// Natural key of this draft.
    pub fn name_key(&self) -> NameKey {
        NameKey::from_name(&self.name)
    }

    /// Turn the draft into a full record.
    pub fn into_record(self, id: CountryId, refreshed_at: Timestamp) -> CountryRecord {
        CountryRecord {
            id,
            name: self.name,
            capital: self.capital,
            region: self.region,
            population: self.population,
            currency_code: self.currency_code,
            exchange_rate: self.exchange_rate,
            estimated_gdp: self.estimated_gdp,
            flag_url: self.flag_url,
            last_refreshed_at: refreshed_at,
        }
    }
}

/// Process-wide refresh status.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefreshState {
    /// Number of persisted records.
    pub total_countries: u64,
    /// Time of the last successful refresh, if any.
    pub last_refreshed_at: Option<Timestamp>,
}
