//! GDP estimation.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{FxError, FxResult};
use crate::resolver::ResolvedCurrency;

/// Lower bound of the GDP multiplier (inclusive).
pub const FACTOR_MIN: f64 = 1000.0;

/// Upper bound of the GDP multiplier (exclusive).
pub const FACTOR_MAX: f64 = 2000.0;

/// Source of per-country GDP multipliers in `[FACTOR_MIN, FACTOR_MAX)`.
pub trait GdpFactorSource: Send + Sync {
    /// Draw the factor for one country.
    fn next_factor(&self) -> f64;
}

/// Draws factors from the thread-local RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomFactor;

impl GdpFactorSource for RandomFactor {
    fn next_factor(&self) -> f64 {
        rand::thread_rng().gen_range(FACTOR_MIN..FACTOR_MAX)
    }
}

/// Draws factors from a seeded RNG so a run can be reproduced.
pub struct SeededFactor {
    rng: Mutex<StdRng>,
}

impl SeededFactor {
    /// Create a source seeded with `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl GdpFactorSource for SeededFactor {
    fn next_factor(&self) -> f64 {
        self.rng.lock().gen_range(FACTOR_MIN..FACTOR_MAX)
    }
}

/// Always returns the same factor.
#[derive(Debug, Clone, Copy)]
pub struct FixedFactor(f64);

impl FixedFactor {
    /// Pin the factor. It must lie in `[FACTOR_MIN, FACTOR_MAX)`.
    pub fn new(factor: f64) -> FxResult<Self> {
        if (FACTOR_MIN..FACTOR_MAX).contains(&factor) {
            Ok(Self(factor))
        } else {
            Err(FxError::FactorOutOfRange(factor))
        }
    }
}

impl GdpFactorSource for FixedFactor {
    fn next_factor(&self) -> f64 {
        self.0
    }
}

/// Computes `population * factor / exchange_rate` for a resolved currency.
#[derive(Clone)]
pub struct GdpEstimator {
    factors: Arc<dyn GdpFactorSource>,
}

impl GdpEstimator {
    /// Create an estimator drawing factors from `factors`.
    pub fn new(factors: Arc<dyn GdpFactorSource>) -> Self {
        Self { factors }
    }

    /// Estimate GDP for one country.
    ///
    /// No declared currency yields `Some(0.0)`. A declared currency without
    /// a code or a rate yields `None`. A factor is drawn only when a rate is
    /// present.
    pub fn estimate(&self, population: u64, currency: &ResolvedCurrency) -> Option<f64> {
        match currency {
            ResolvedCurrency::NoCurrency => Some(0.0),
            ResolvedCurrency::Uncoded | ResolvedCurrency::Unpriced { .. } => None,
            ResolvedCurrency::Priced { rate, .. } => {
                let factor = self.factors.next_factor();
                Some(population as f64 * factor / rate)
            }
        }
    }
}

impl Default for GdpEstimator {
    fn default() -> Self {
        Self::new(Arc::new(RandomFactor))
    }
}

impl std::fmt::Debug for GdpEstimator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GdpEstimator").finish_non_exhaustive()
    }
}
