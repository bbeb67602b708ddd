//! Retrieval of both external datasets for a refresh cycle.

use std::sync::Arc;

use tracing::{info, warn};

use countryfx_common::Result;
use countryfx_fx::{RateProvider, RateTable};

use crate::country_provider::{CountryProvider, RawCountry};

/// Everything a refresh cycle needs from the outside world.
#[derive(Debug, Clone)]
pub struct FetchedSources {
    pub countries: Vec<RawCountry>,
    pub rates: RateTable,
}

/// Fetches the country list and the rate table.
pub struct ExternalFetcher {
    countries: Arc<dyn CountryProvider>,
    rates: Arc<dyn RateProvider>,
}

impl ExternalFetcher {
    /// Create a fetcher over the two providers.
    pub fn new(countries: Arc<dyn CountryProvider>, rates: Arc<dyn RateProvider>) -> Self {
        Self { countries, rates }
    }

    /// Fetch both datasets concurrently.
    ///
    /// Either failure aborts the whole fetch with
    /// `ExternalSourceUnavailable`; nothing partial is returned.
    pub async fn fetch_all(&self) -> Result<FetchedSources> {
        let (countries, rates) =
            tokio::join!(self.countries.fetch_countries(), self.rates.fetch_rates());

        let countries = countries.map_err(|e| {
            warn!(provider = self.countries.name(), error = %e, "Country fetch failed");
            e
        })?;
        let rates = rates.map_err(|e| {
            warn!(provider = self.rates.name(), error = %e, "Rate fetch failed");
            e
        })?;

        info!(
            countries = countries.len(),
            currencies = rates.len(),
            base = %rates.base,
            "Fetched external sources"
        );

        Ok(FetchedSources { countries, rates })
    }
}
