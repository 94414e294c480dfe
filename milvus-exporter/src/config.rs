//! Configuration for the Milvus exporter.

use milvus_client::{DEFAULT_ADDRESS, LoggingConfig, MilvusConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::filter::CollectionFilter;
use crate::mapping::{is_valid_label_name, is_valid_metric_name};

/// Address the scrape endpoint listens on.
pub const LISTEN_ADDR: &str = "0.0.0.0:8080";

/// Path of the scrape endpoint.
pub const METRICS_PATH: &str = "/metrics";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] json5::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Complete exporter configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExporterConfig {
    /// Milvus connection settings.
    #[serde(default)]
    pub milvus: MilvusConfig,

    /// Exposition settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,

    /// Collection filtering settings.
    #[serde(default)]
    pub filters: FilterConfig,

    /// What to do when a scrape hits a remote error.
    #[serde(default)]
    pub on_scrape_error: ScrapeErrorPolicy,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Exposition format settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrometheusConfig {
    /// Metric name prefix (default: none).
    #[serde(default)]
    pub prefix: String,

    /// Default labels to add to all metrics.
    #[serde(default)]
    pub default_labels: HashMap<String, String>,
}

/// Collection filtering configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Glob patterns for collections to include (empty = all).
    #[serde(default)]
    pub include_collections: Vec<String>,

    /// Glob patterns for collections to exclude.
    #[serde(default)]
    pub exclude_collections: Vec<String>,
}

/// Reaction to a failed scrape.
///
/// The response is a 500 either way.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeErrorPolicy {
    /// Shut the process down with a non-zero status.
    #[default]
    Exit,
    /// Keep serving.
    FailRequest,
}

/// Where the Milvus address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressSource {
    /// `--server` flag or `MDB_SERVER`.
    CommandLine,
    /// Configuration file.
    ConfigFile,
    /// Nothing supplied one, [`DEFAULT_ADDRESS`] is used.
    Default,
}

impl ExporterConfig {
    /// Load configuration from a JSON5 file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Apply the command line server address, which wins over the file.
    pub fn resolve_address(&mut self, server: Option<String>) -> AddressSource {
        match server {
            Some(server) => {
                self.milvus.address = server;
                AddressSource::CommandLine
            }
            None if self.milvus.address == DEFAULT_ADDRESS => AddressSource::Default,
            None => AddressSource::ConfigFile,
        }
    }

    /// Parse configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: ExporterConfig = json5::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.milvus.connect_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "connect_timeout_secs must be > 0".to_string(),
            ));
        }

        if self.milvus.request_timeout_secs == Some(0) {
            return Err(ConfigError::Validation(
                "request_timeout_secs must be > 0".to_string(),
            ));
        }

        self.milvus
            .base_url()
            .map_err(|e| ConfigError::Validation(e.to_string()))?;

        if !self.prometheus.prefix.is_empty() && !is_valid_metric_name(&self.prometheus.prefix) {
            return Err(ConfigError::Validation(format!(
                "Invalid metric prefix: {}",
                self.prometheus.prefix
            )));
        }

        if let Some(name) = self
            .prometheus
            .default_labels
            .keys()
            .find(|k| !is_valid_label_name(k))
        {
            return Err(ConfigError::Validation(format!(
                "Invalid default label name: {}",
                name
            )));
        }

        CollectionFilter::new(&self.filters)
            .map_err(|e| ConfigError::Validation(format!("Invalid collection pattern: {}", e)))?;

        Ok(())
    }
}
