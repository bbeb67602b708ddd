//! Error types for CountryFX operations.

use thiserror::Error;

/// Main error type for CountryFX operations.
#[derive(Error, Debug)]
pub enum CountryFxError {
    /// An external data provider could not be reached or answered badly.
    #[error("External data source unavailable: {provider}: {details}")]
    ExternalSourceUnavailable { provider: String, details: String },

    /// No record matches the given name.
    #[error("Country not found: {0}")]
    NotFound(String),

    /// Malformed input parameters.
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        field: Option<String>,
    },

    /// Another refresh cycle is already running.
    #[error("Refresh already in progress")]
    RefreshInProgress,

    /// Persistence failure.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Unexpected failure.
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl CountryFxError {
    /// Build an external-source failure.
    pub fn source_unavailable(provider: impl Into<String>, details: impl Into<String>) -> Self {
        CountryFxError::ExternalSourceUnavailable {
            provider: provider.into(),
            details: details.into(),
        }
    }

    /// Build a validation failure tied to a field.
    pub fn invalid_field(field: impl Into<String>, message: impl Into<String>) -> Self {
        CountryFxError::ValidationFailed {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CountryFxError::ExternalSourceUnavailable { .. }
                | CountryFxError::RefreshInProgress
                | CountryFxError::DatabaseError(_)
        )
    }

    /// Get error code for API responses and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            CountryFxError::ExternalSourceUnavailable { .. } => "EXTERNAL_SOURCE_UNAVAILABLE",
            CountryFxError::NotFound(_) => "NOT_FOUND",
            CountryFxError::ValidationFailed { .. } => "VALIDATION_FAILED",
            CountryFxError::RefreshInProgress => "REFRESH_IN_PROGRESS",
            CountryFxError::DatabaseError(_) => "DATABASE_ERROR",
            CountryFxError::InternalError(_) => "INTERNAL_ERROR",
            CountryFxError::ConfigurationError(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for CountryFX operations.
pub type Result<T> = std::result::Result<T, CountryFxError>;
