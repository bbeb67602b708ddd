//! CountryFX Server
//!
//! Refreshes a country collection from two public data sources, derives a
//! currency, exchange rate and GDP estimate per country, and serves the
//! result over HTTP.

pub mod api;
pub mod app;
pub mod config;
pub mod country_provider;
pub mod error;
pub mod fetcher;
pub mod metrics;
pub mod query;
pub mod reconciliation;
pub mod refresh;
pub mod render;

pub use api::app_router;
pub use app::{build_state, AppState};
pub use config::ServerConfig;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let registry = tracing_subscriber::registry().with(filter);

    if config.log_format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
