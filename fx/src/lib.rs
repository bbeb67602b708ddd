//! CountryFX FX Engine
//!
//! Exchange rate retrieval and the per-country derivations that depend on it.
//!
//! # Features
//!
//! - Rate table retrieval from an HTTP provider with a bounded timeout
//! - Currency resolution from a country's declared currency set
//! - GDP estimation with an injectable random factor source
//!
//! # Example
//!
//! ```rust,ignore
//! use countryfx_fx::{CurrencyResolver, GdpEstimator, RandomFactor};
//!
//! let table = provider.fetch_rates().await?;
//! let resolved = CurrencyResolver::new(&table).resolve(["NGN"]);
//! let gdp = GdpEstimator::new(Arc::new(RandomFactor)).estimate(206_139_589, &resolved);
//! ```

pub mod error;
pub mod gdp;
pub mod http;
pub mod provider;
pub mod rates;
pub mod resolver;

pub use error::{FxError, FxResult};
pub use gdp::{FixedFactor, GdpEstimator, GdpFactorSource, RandomFactor, SeededFactor};
pub use http::{HttpFetcher, DEFAULT_REQUEST_TIMEOUT};
pub use provider::{ErApiRateProvider, RateProvider};
pub use rates::RateTable;
pub use resolver::{CurrencyResolver, ResolvedCurrency};

#[cfg(any(test, feature = "test-utils"))]
pub use provider::MockRateProvider;
