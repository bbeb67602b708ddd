//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use countryfx_fx::provider::ER_API_DEFAULT_URL;
use countryfx_fx::DEFAULT_REQUEST_TIMEOUT;
use countryfx_store::postgres::is_valid_schema_name;

use crate::country_provider::REST_COUNTRIES_DEFAULT_URL;

/// External data provider configuration.
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Country list endpoint.
    pub countries_url: String,
    /// Exchange rate endpoint.
    pub rates_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            countries_url: REST_COUNTRIES_DEFAULT_URL.to_string(),
            rates_url: ER_API_DEFAULT_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Database schema holding the collection.
    pub database_name: String,
    /// Directory for the rendered summary image.
    pub cache_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            database_name: "countries_db".to_string(),
            cache_dir: PathBuf::from("cache"),
        }
    }
}

/// Main server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub port: u16,
    /// External providers.
    pub sources: SourceConfig,
    /// Storage.
    pub storage: StorageConfig,
    /// Seed for the GDP factor RNG; random when unset.
    pub gdp_factor_seed: Option<u64>,
    /// Log level.
    pub log_level: String,
    /// Log format, `text` or `json`.
    pub log_format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".to_string(),
            port: 8000,
            sources: SourceConfig::default(),
            storage: StorageConfig::default(),
            gdp_factor_seed: None,
            log_level: "info".to_string(),
            log_format: "text".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("LISTEN_ADDR") {
            config.listen_addr = addr;
        }

        if let Some(port) = lookup("PORT").and_then(|p| p.parse().ok()) {
            config.port = port;
        }

        if let Some(url) = lookup("DATABASE_URL").filter(|u| !u.is_empty()) {
            config.storage.database_url = Some(url);
        }

        if let Some(name) = lookup("DB_NAME") {
            config.storage.database_name = name;
        }

        if let Some(dir) = lookup("CACHE_DIR") {
            config.storage.cache_dir = PathBuf::from(dir);
        }

        if let Some(url) = lookup("COUNTRIES_API_URL") {
            config.sources.countries_url = url;
        }

        if let Some(url) = lookup("RATES_API_URL") {
            config.sources.rates_url = url;
        }

        if let Some(secs) = lookup("FETCH_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            config.sources.request_timeout = Duration::from_secs(secs);
        }

        if let Some(seed) = lookup("GDP_FACTOR_SEED").and_then(|s| s.parse().ok()) {
            config.gdp_factor_seed = Some(seed);
        }

        if let Some(level) = lookup("LOG_LEVEL") {
            config.log_level = level;
        }

        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = format;
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }

        if self.sources.countries_url.is_empty() || self.sources.rates_url.is_empty() {
            return Err("Provider URLs cannot be empty".to_string());
        }

        if self.sources.request_timeout.is_zero() {
            return Err("Fetch timeout cannot be zero".to_string());
        }

        if self.storage.database_url.is_some()
            && !is_valid_schema_name(&self.storage.database_name)
        {
            return Err(format!(
                "Database name '{}' must be a lower-case identifier",
                self.storage.database_name
            ));
        }

        if !matches!(self.log_format.as_str(), "text" | "json") {
            return Err(format!("Unknown log format '{}'", self.log_format));
        }

        Ok(())
    }

    /// Socket address string to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.listen_addr, self.port)
    }
}
