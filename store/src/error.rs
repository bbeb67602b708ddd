//! Store error types.

use countryfx_common::{CountryFxError, CountryId};
use thiserror::Error;

/// Errors raised by a country store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with the same id or name key already exists.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// The record to update does not exist.
    #[error("No record with id {0}")]
    Missing(CountryId),

    /// Schema name is not a plain identifier.
    #[error("Invalid schema name: {0}")]
    InvalidSchema(String),

    /// Backend failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let unique_violation = err
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code == "23505")
            .unwrap_or(false);

        if unique_violation {
            StoreError::Duplicate(err.to_string())
        } else {
            StoreError::Database(err.to_string())
        }
    }
}

impl From<StoreError> for CountryFxError {
    fn from(err: StoreError) -> Self {
        CountryFxError::DatabaseError(err.to_string())
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
