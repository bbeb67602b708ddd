//! Rate provider traits and implementations.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{FxError, FxResult};
use crate::http::HttpFetcher;
use crate::rates::RateTable;

/// Trait for exchange rate providers.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Get the provider name.
    fn name(&self) -> &str;

    /// Fetch the full rate table against the provider's base currency.
    async fn fetch_rates(&self) -> FxResult<RateTable>;
}

/// Default endpoint: every rate against USD.
pub const ER_API_DEFAULT_URL: &str = "https://open.er-api.com/v6/latest/USD";

const ER_API_PROVIDER: &str = "open.er-api.com";

/// Response body of the ExchangeRate-API open endpoint.
#[derive(Debug, Deserialize)]
struct ErApiResponse {
    result: String,
    #[serde(default)]
    base_code: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(rename = "error-type", default)]
    error_type: Option<String>,
}

/// Rate provider backed by the ExchangeRate-API open endpoint.
pub struct ErApiRateProvider {
    http: HttpFetcher,
    url: String,
}

impl ErApiRateProvider {
    /// Create a provider for the given endpoint.
    pub fn new(http: HttpFetcher, url: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl RateProvider for ErApiRateProvider {
    fn name(&self) -> &str {
        ER_API_PROVIDER
    }

    #[instrument(skip(self), fields(provider = ER_API_PROVIDER))]
    async fn fetch_rates(&self) -> FxResult<RateTable> {
        let body: ErApiResponse = self.http.get_json(ER_API_PROVIDER, &self.url).await?;

        if body.result != "success" {
            return Err(FxError::unavailable(
                ER_API_PROVIDER,
                format!(
                    "provider reported {}",
                    body.error_type.as_deref().unwrap_or(&body.result)
                ),
            ));
        }

        let base = body.base_code.unwrap_or_else(|| "USD".to_string());
        debug!(base = %base, currencies = body.rates.len(), "Fetched rate table");

        Ok(RateTable::new(base, body.rates))
    }
}

/// Mock rate provider for testing.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateProvider {
    name: String,
    rates: dashmap::DashMap<String, f64>,
    failure: parking_lot::RwLock<Option<String>>,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateProvider {
    /// Create a new mock provider.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rates: dashmap::DashMap::new(),
            failure: parking_lot::RwLock::new(None),
        }
    }

    /// Set the rate for a currency.
    pub fn set_rate(&self, code: impl Into<String>, rate: f64) {
        self.rates.insert(code.into(), rate);
    }

    /// Make every subsequent fetch fail with the given details.
    pub fn fail_with(&self, details: impl Into<String>) {
        *self.failure.write() = Some(details.into());
    }

    /// Let fetches succeed again.
    pub fn recover(&self) {
        *self.failure.write() = None;
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateProvider for MockRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_rates(&self) -> FxResult<RateTable> {
        if let Some(details) = self.failure.read().clone() {
            return Err(FxError::unavailable(self.name.clone(), details));
        }

        Ok(self
            .rates
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect())
    }
}
