//! Shared HTTP plumbing for external data providers.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{FxError, FxResult};

/// Default HTTP request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-over-HTTP client with a bounded request timeout.
///
/// Every failure mode (connect error, timeout, non-2xx status, undecodable
/// body) is reported as [`FxError::ProviderUnavailable`].
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher with the given request timeout.
    ///
    /// Fails with [`FxError::Client`] if the TLS backend cannot be set up.
    pub fn new(timeout: Duration) -> FxResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FxError::Client(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    /// Configured request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// GET `url` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, provider: &str, url: &str) -> FxResult<T> {
        debug!(provider, url, "Fetching from provider");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FxError::unavailable(provider, self.describe(&e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FxError::unavailable(provider, format!("HTTP {}", status)));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| FxError::unavailable(provider, format!("invalid response body: {}", e)))
    }

    fn describe(&self, err: &reqwest::Error) -> String {
        if err.is_timeout() {
            format!("request timed out after {}s", self.timeout.as_secs())
        } else if err.is_connect() {
            format!("connection failed: {}", err)
        } else {
            err.to_string()
        }
    }
}
