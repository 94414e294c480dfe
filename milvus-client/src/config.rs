use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Address used when neither the command line, the environment nor a
/// configuration file provide one.
pub const DEFAULT_ADDRESS: &str = "localhost:19530";

/// Milvus connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MilvusConfig {
    /// Server address, either `host:port` or a full `http(s)://` URL.
    #[serde(default = "default_address")]
    pub address: String,

    /// Bearer token (`user:password` or an API key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Database the collections live in.
    #[serde(default = "default_database")]
    pub database: String,

    /// Timeout for the connectivity check at startup (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Per-request timeout for scrape-time calls (seconds). Unset means
    /// calls wait for as long as the service takes to answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_database() -> String {
    "default".to_string()
}

fn default_connect_timeout() -> u64 {
    2
}

impl Default for MilvusConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            token: None,
            database: default_database(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: None,
        }
    }
}

impl MilvusConfig {
    /// Create a configuration for the given address with default settings.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    /// Base URL of the RESTful API.
    ///
    /// Bare `host:port` addresses are served over plain HTTP.
    pub fn base_url(&self) -> Result<reqwest::Url> {
        let address = self.address.trim();
        if address.is_empty() {
            return Err(Error::Config("Milvus address is empty".to_string()));
        }

        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{}", address)
        };

        let url = reqwest::Url::parse(&with_scheme)
            .map_err(|e| Error::Config(format!("Invalid Milvus address '{}': {}", address, e)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::Config(format!(
                "Unsupported scheme '{}' in Milvus address '{}'",
                other, address
            ))),
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format (default).
    #[default]
    Text,
    /// Structured JSON format.
    Json,
}

/// Common logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log output format: "text" or "json".
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
