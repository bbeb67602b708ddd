//! FX engine error types.

use countryfx_common::CountryFxError;
use thiserror::Error;

/// Errors that can occur in the FX engine.
#[derive(Debug, Error)]
pub enum FxError {
    /// Provider could not be reached, timed out, or answered with a failure.
    #[error("Provider {provider} unavailable: {details}")]
    ProviderUnavailable { provider: String, details: String },

    /// A pinned GDP factor lies outside the allowed range.
    #[error("GDP factor {0} outside [{min}, {max})", min = crate::gdp::FACTOR_MIN, max = crate::gdp::FACTOR_MAX)]
    FactorOutOfRange(f64),

    /// The HTTP client could not be constructed.
    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

impl FxError {
    /// Build a provider failure.
    pub fn unavailable(provider: impl Into<String>, details: impl Into<String>) -> Self {
        FxError::ProviderUnavailable {
            provider: provider.into(),
            details: details.into(),
        }
    }
}

impl From<FxError> for CountryFxError {
    fn from(err: FxError) -> Self {
        match err {
            FxError::ProviderUnavailable { provider, details } => {
                CountryFxError::ExternalSourceUnavailable { provider, details }
            }
            FxError::FactorOutOfRange(_) | FxError::Client(_) => {
                CountryFxError::ConfigurationError(err.to_string())
            }
        }
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
