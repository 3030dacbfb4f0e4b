//! API configuration

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use domain_calculation::{RateCatalog, RateEntry};

/// Which store backs the services
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Process-local store, lost on restart
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// HS256 secret bearer tokens are signed with
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL, used when `storage` is `postgres`
    pub database_url: String,
    /// Log level
    pub log_level: String,
    pub log_format: LogFormat,
    pub storage: StorageKind,
    /// TOML or JSON file with the estimator's rate table
    pub rates_file: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/fees".to_string(),
            log_level: "info".to_string(),
            log_format: LogFormat::default(),
            storage: StorageKind::default(),
            rates_file: None,
        }
    }
}

impl ApiConfig {
    /// Loads configuration from `API_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(config::Environment::with_prefix("API"))
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Rate catalog from `rates_file`, or an empty one when unset
    pub fn rate_catalog(&self) -> Result<RateCatalog, RatesError> {
        match &self.rates_file {
            Some(path) => load_rates(path),
            None => Ok(RateCatalog::new()),
        }
    }
}

/// Failure reading the rate table
#[derive(Debug, Error)]
pub enum RatesError {
    #[error("Cannot read rates file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON rates file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid TOML rates file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported rates file extension: {0}")]
    UnsupportedFormat(String),
}

#[derive(Debug, Deserialize)]
struct RateFile {
    #[serde(default)]
    rates: Vec<RateEntry>,
}

/// Reads a `rates = [{ productGroup, rate, recyclingNorm }]` table
///
/// `.json` and `.toml` files are accepted.
pub fn load_rates(path: impl AsRef<Path>) -> Result<RateCatalog, RatesError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default().to_ascii_lowercase();

    let file: RateFile = match extension.as_str() {
        "json" => serde_json::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        other => return Err(RatesError::UnsupportedFormat(other.to_string())),
    };
    Ok(RateCatalog::from_entries(file.rates))
}
