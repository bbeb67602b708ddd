//! Shared application state and its construction from configuration.

use std::sync::Arc;

use tracing::info;

use countryfx_fx::{
    ErApiRateProvider, GdpEstimator, GdpFactorSource, HttpFetcher, RandomFactor, SeededFactor,
};
use countryfx_store::{InMemoryCountryStore, PgCountryStore, SharedStore};

use crate::config::ServerConfig;
use crate::country_provider::RestCountriesProvider;
use crate::fetcher::ExternalFetcher;
use crate::metrics::{Metrics, SharedMetrics};
use crate::query::QueryEngine;
use crate::refresh::RefreshProcessor;
use crate::render::{SummaryImageCache, SvgSummaryRenderer};

/// State shared by every request handler.
pub struct AppState {
    pub queries: QueryEngine,
    pub refresher: Arc<RefreshProcessor>,
    pub metrics: SharedMetrics,
}

impl AppState {
    /// Assemble the state around an already-open store and fetcher.
    pub fn new(
        store: SharedStore,
        fetcher: ExternalFetcher,
        estimator: GdpEstimator,
        images: SummaryImageCache,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            queries: QueryEngine::new(store.clone()),
            refresher: Arc::new(RefreshProcessor::new(
                fetcher,
                estimator,
                store,
                Arc::new(SvgSummaryRenderer),
                images,
                metrics.clone(),
            )),
            metrics,
        }
    }
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<SharedStore> {
    match &config.storage.database_url {
        Some(url) => {
            let store = PgCountryStore::connect(url, &config.storage.database_name).await?;
            info!(schema = %config.storage.database_name, "Using PostgreSQL store");
            Ok(Arc::new(store))
        }
        None => {
            info!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(InMemoryCountryStore::new()))
        }
    }
}

fn factor_source(config: &ServerConfig) -> Arc<dyn GdpFactorSource> {
    match config.gdp_factor_seed {
        Some(seed) => {
            info!(seed, "Using seeded GDP factors");
            Arc::new(SeededFactor::new(seed))
        }
        None => Arc::new(RandomFactor),
    }
}

/// Build the application state described by `config`.
pub async fn build_state(config: &ServerConfig) -> anyhow::Result<Arc<AppState>> {
    let store = open_store(config).await?;

    let http = HttpFetcher::new(config.sources.request_timeout)?;
    let fetcher = ExternalFetcher::new(
        Arc::new(RestCountriesProvider::new(
            http.clone(),
            &config.sources.countries_url,
        )),
        Arc::new(ErApiRateProvider::new(http, &config.sources.rates_url)),
    );

    let metrics: SharedMetrics = Arc::new(Metrics::new());
    metrics.set_countries_stored(store.count().await?);

    Ok(Arc::new(AppState::new(
        store,
        fetcher,
        GdpEstimator::new(factor_source(config)),
        SummaryImageCache::new(&config.storage.cache_dir),
        metrics,
    )))
}
