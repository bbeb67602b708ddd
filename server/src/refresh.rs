//! Refresh cycle: fetch, resolve, estimate, reconcile, render.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;
use tracing::{info, instrument, warn, Instrument, Span};

use countryfx_common::{now, CountryDraft, CountryFxError, RefreshId, Result, Timestamp};
use countryfx_fx::{CurrencyResolver, GdpEstimator, RateTable};
use countryfx_store::SharedStore;

use crate::country_provider::RawCountry;
use crate::fetcher::ExternalFetcher;
use crate::metrics::SharedMetrics;
use crate::query::QueryEngine;
use crate::reconciliation::ReconciliationEngine;
use crate::render::{SummaryData, SummaryImageCache, SummaryRenderer, SUMMARY_TOP_N};

/// Result of a committed refresh cycle.
#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub refresh_id: RefreshId,
    pub inserted: usize,
    pub updated: usize,
    pub total_countries: u64,
    pub last_refreshed_at: Timestamp,
}

/// Derive reconciliation candidates from the fetched sources.
///
/// Entries without a usable name are dropped. Every other entry yields one
/// draft, with its currency resolved against `rates` and a GDP estimate
/// drawn from `estimator`.
pub fn build_drafts(
    countries: Vec<RawCountry>,
    rates: &RateTable,
    estimator: &GdpEstimator,
) -> Vec<CountryDraft> {
    let resolver = CurrencyResolver::new(rates);
    let mut skipped = 0usize;

    let drafts: Vec<CountryDraft> = countries
        .into_iter()
        .filter_map(|raw| {
            let Some(name) = raw.usable_name().map(str::to_string) else {
                skipped += 1;
                return None;
            };

            let resolved = resolver.resolve(raw.currency_codes());
            let population = raw.population.unwrap_or(0);

            Some(CountryDraft {
                name,
                capital: raw.capital,
                region: raw.region.unwrap_or_default(),
                population,
                currency_code: resolved.code().map(str::to_string),
                exchange_rate: resolved.rate(),
                estimated_gdp: estimator.estimate(population, &resolved),
                flag_url: raw.flag.unwrap_or_default(),
            })
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, "Skipped source countries without a name");
    }
    drafts
}

/// Runs refresh cycles, one at a time.
pub struct RefreshProcessor {
    fetcher: ExternalFetcher,
    estimator: GdpEstimator,
    reconciler: ReconciliationEngine,
    reader: QueryEngine,
    renderer: Arc<dyn SummaryRenderer>,
    images: SummaryImageCache,
    metrics: SharedMetrics,
    running: Arc<Mutex<()>>,
}

impl RefreshProcessor {
    pub fn new(
        fetcher: ExternalFetcher,
        estimator: GdpEstimator,
        store: SharedStore,
        renderer: Arc<dyn SummaryRenderer>,
        images: SummaryImageCache,
        metrics: SharedMetrics,
    ) -> Self {
        Self {
            fetcher,
            estimator,
            reconciler: ReconciliationEngine::new(store.clone()),
            reader: QueryEngine::new(store),
            renderer,
            images,
            metrics,
            running: Arc::new(Mutex::new(())),
        }
    }

    /// Run one refresh cycle.
    ///
    /// Fails with `RefreshInProgress` if another cycle holds the guard. An
    /// external source failure aborts before anything is written.
    ///
    /// The cycle runs on its own task and holds the guard until it ends, so
    /// dropping the returned future does not stop a batch part-way.
    #[instrument(skip(self), fields(refresh_id = tracing::field::Empty))]
    pub async fn refresh(self: &Arc<Self>) -> Result<RefreshSummary> {
        let Ok(guard) = self.running.clone().try_lock_owned() else {
            self.metrics.refresh_rejected();
            warn!("Refresh rejected, another cycle is running");
            return Err(CountryFxError::RefreshInProgress);
        };

        let refresh_id = RefreshId::new();
        Span::current().record("refresh_id", tracing::field::display(&refresh_id));

        let this = Arc::clone(self);
        let cycle = tokio::spawn(
            async move {
                let _guard = guard;
                this.run_cycle(refresh_id).await
            }
            .in_current_span(),
        );

        cycle
            .await
            .map_err(|e| CountryFxError::InternalError(format!("refresh task: {e}")))?
    }

    async fn run_cycle(&self, refresh_id: RefreshId) -> Result<RefreshSummary> {
        self.metrics.refresh_started();
        let started = Instant::now();
        let refreshed_at = now();

        let sources = match self.fetcher.fetch_all().await {
            Ok(sources) => sources,
            Err(e) => {
                self.metrics.refresh_failed();
                return Err(e);
            }
        };

        let drafts = build_drafts(sources.countries, &sources.rates, &self.estimator);
        let report = match self.reconciler.reconcile(drafts, refreshed_at).await {
            Ok(report) => report,
            Err(e) => {
                self.metrics.refresh_failed();
                return Err(e);
            }
        };

        // the refresh is committed; a missing image only degrades /countries/image
        if let Err(e) = self.render_summary(report.total_countries, refreshed_at).await {
            warn!(error = %e, "Summary image not updated");
        }

        let millis = started.elapsed().as_millis() as u64;
        self.metrics.refresh_succeeded(
            report.inserted as u64,
            report.updated as u64,
            report.total_countries,
            millis,
        );

        info!(
            inserted = report.inserted,
            updated = report.updated,
            total_countries = report.total_countries,
            millis,
            "Refresh complete"
        );

        Ok(RefreshSummary {
            refresh_id,
            inserted: report.inserted,
            updated: report.updated,
            total_countries: report.total_countries,
            last_refreshed_at: refreshed_at,
        })
    }

    async fn render_summary(&self, total_countries: u64, refreshed_at: Timestamp) -> Result<()> {
        let data = SummaryData {
            total_countries,
            top: self.reader.top_by_gdp(SUMMARY_TOP_N).await?,
            last_refreshed_at: refreshed_at,
        };
        let bytes = self.renderer.render(&data);
        self.images.store(&bytes).await
    }

    /// Cached summary image and its content type.
    pub async fn summary_image(&self) -> Result<Option<(&'static str, Vec<u8>)>> {
        Ok(self
            .images
            .load()
            .await?
            .map(|bytes| (self.renderer.content_type(), bytes)))
    }
}
