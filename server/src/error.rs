//! HTTP mapping of service errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use countryfx_common::CountryFxError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] CountryFxError),
    #[error("Summary image not found")]
    ImageNotFound,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    fn status_and_body(&self) -> (StatusCode, ErrorBody) {
        match self {
            ApiError::Service(e) => match e {
                CountryFxError::ExternalSourceUnavailable { provider, details } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorBody {
                        error: "External data source unavailable",
                        details: Some(format!("Could not fetch data from {provider}: {details}")),
                    },
                ),
                CountryFxError::NotFound(_) => (
                    StatusCode::NOT_FOUND,
                    ErrorBody {
                        error: "Country not found",
                        details: None,
                    },
                ),
                CountryFxError::ValidationFailed { message, field } => (
                    StatusCode::BAD_REQUEST,
                    ErrorBody {
                        error: "Validation failed",
                        details: Some(match field {
                            Some(field) => format!("{field}: {message}"),
                            None => message.clone(),
                        }),
                    },
                ),
                CountryFxError::RefreshInProgress => (
                    StatusCode::CONFLICT,
                    ErrorBody {
                        error: "Refresh already in progress",
                        details: None,
                    },
                ),
                CountryFxError::DatabaseError(_)
                | CountryFxError::InternalError(_)
                | CountryFxError::ConfigurationError(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorBody {
                        error: "Internal server error",
                        details: None,
                    },
                ),
            },
            ApiError::ImageNotFound => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: "Summary image not found",
                    details: None,
                },
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            if let ApiError::Service(e) = &self {
                error!(code = e.error_code(), error = %e, "Request failed");
            }
        }
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                CountryFxError::source_unavailable("open.er-api.com", "timed out"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (CountryFxError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (
                CountryFxError::invalid_field("sort", "bad"),
                StatusCode::BAD_REQUEST,
            ),
            (CountryFxError::RefreshInProgress, StatusCode::CONFLICT),
            (
                CountryFxError::DatabaseError("pool closed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_not_leaked() {
        let (_, body) =
            ApiError::from(CountryFxError::InternalError("disk on fire".into())).status_and_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json, serde_json::json!({ "error": "Internal server error" }));
    }

    #[test]
    fn test_unavailable_body_names_provider() {
        let (_, body) = ApiError::from(CountryFxError::source_unavailable(
            "restcountries.com",
            "HTTP 500",
        ))
        .status_and_body();
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["error"], "External data source unavailable");
        assert_eq!(json["details"], "Could not fetch data from restcountries.com: HTTP 500");
    }
}
