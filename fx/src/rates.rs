//! Exchange rate table.

use std::collections::HashMap;

use countryfx_common::{now, Timestamp};

/// Rates of every quoted currency against a single base currency.
#[derive(Debug, Clone)]
pub struct RateTable {
    /// Base currency code (e.g. `USD`).
    pub base: String,
    /// Units of each currency per one unit of `base`.
    rates: HashMap<String, f64>,
    /// When the table was fetched.
    pub fetched_at: Timestamp,
}

impl RateTable {
    /// Create a table from raw provider rates.
    pub fn new(base: impl Into<String>, rates: HashMap<String, f64>) -> Self {
        Self {
            base: base.into(),
            rates,
            fetched_at: now(),
        }
    }

    /// Look up the rate for a currency.
    ///
    /// Zero, negative and non-finite rates are treated as missing.
    pub fn rate_for(&self, code: &str) -> Option<f64> {
        self.rates
            .get(code)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    /// Number of quoted currencies.
    pub fn len(&self) -> usize {
        self.rates.len()
    }

    /// Check if the table quotes nothing.
    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

impl FromIterator<(String, f64)> for RateTable {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self::new("USD", iter.into_iter().collect())
    }
}
