//! Country data provider.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use countryfx_fx::{FxResult, HttpFetcher};

/// Default endpoint: every country with the fields the pipeline needs.
pub const REST_COUNTRIES_DEFAULT_URL: &str =
    "https://restcountries.com/v2/all?fields=name,capital,region,population,flag,currencies";

const REST_COUNTRIES_PROVIDER: &str = "restcountries.com";

/// One currency entry as declared by the provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCurrency {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub symbol: Option<String>,
}

/// One country as returned by the provider, before any resolution.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawCountry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub currencies: Option<Vec<RawCurrency>>,
}

impl RawCountry {
    /// Declared currency codes in source order, one per entry.
    ///
    /// An entry without a code yields an empty string. A null or absent
    /// currency list declares nothing.
    pub fn currency_codes(&self) -> impl Iterator<Item = &str> {
        self.currencies
            .iter()
            .flatten()
            .map(|c| c.code.as_deref().unwrap_or(""))
    }

    /// Trimmed name, if present and non-blank.
    pub fn usable_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Trait for country data providers.
#[async_trait]
pub trait CountryProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the full country list.
    async fn fetch_countries(&self) -> FxResult<Vec<RawCountry>>;
}

/// Country provider backed by the REST Countries v2 API.
pub struct RestCountriesProvider {
    http: HttpFetcher,
    url: String,
}

impl RestCountriesProvider {
    /// Create a provider for the given endpoint.
    pub fn new(http: HttpFetcher, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl CountryProvider for RestCountriesProvider {
    fn name(&self) -> &str {
        REST_COUNTRIES_PROVIDER
    }

    #[instrument(skip(self), fields(provider = REST_COUNTRIES_PROVIDER))]
    async fn fetch_countries(&self) -> FxResult<Vec<RawCountry>> {
        let countries: Vec<RawCountry> =
            self.http.get_json(REST_COUNTRIES_PROVIDER, &self.url).await?;

        debug!(count = countries.len(), "Fetched country list");
        Ok(countries)
    }
}

/// Mock country provider for testing.
#[cfg(test)]
pub struct MockCountryProvider {
    countries: parking_lot::RwLock<Vec<RawCountry>>,
    failure: parking_lot::RwLock<Option<String>>,
}

#[cfg(test)]
impl MockCountryProvider {
    /// Create a provider serving `countries`.
    pub fn new(countries: Vec<RawCountry>) -> Self {
        Self {
            countries: parking_lot::RwLock::new(countries),
            failure: parking_lot::RwLock::new(None),
        }
    }

    /// Replace the served country list.
    pub fn set_countries(&self, countries: Vec<RawCountry>) {
        *self.countries.write() = countries;
    }

    /// Make every subsequent fetch fail.
    pub fn fail_with(&self, details: impl Into<String>) {
        *self.failure.write() = Some(details.into());
    }
}

#[cfg(test)]
#[async_trait]
impl CountryProvider for MockCountryProvider {
    fn name(&self) -> &str {
        "mock-countries"
    }

    async fn fetch_countries(&self) -> FxResult<Vec<RawCountry>> {
        if let Some(details) = self.failure.read().clone() {
            return Err(countryfx_fx::FxError::unavailable("mock-countries", details));
        }
        Ok(self.countries.read().clone())
    }
}

/// Build a raw country for tests.
#[cfg(test)]
pub fn raw_country(name: &str, population: u64, codes: &[&str]) -> RawCountry {
    RawCountry {
        name: Some(name.to_string()),
        capital: Some(format!("{name} City")),
        region: Some("Testregion".to_string()),
        population: Some(population),
        flag: Some(format!("https://flags.example/{}.svg", name.to_lowercase())),
        currencies: Some(
            codes
                .iter()
                .map(|code| RawCurrency {
                    code: Some(code.to_string()),
                    ..Default::default()
                })
                .collect(),
        ),
    }
}
