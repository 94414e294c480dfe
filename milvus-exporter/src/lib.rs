//! Prometheus metrics exporter for Milvus.
//!
//! Every scrape of the `/metrics` endpoint queries Milvus for collection,
//! index and load status and renders the result as gauges.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │  Milvus (REST)  │<────│    Collector    │<────│   HTTP Server   │
//! │  MilvusClient   │     │   (producers)   │     │   (/metrics)    │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! milvus-exporter --server milvus.internal:19530
//! ```
//!
//! # Configuration
//!
//! See [`config::ExporterConfig`] for configuration options.

pub mod collector;
pub mod config;
pub mod error;
pub mod filter;
pub mod http;
pub mod mapping;
pub mod producers;

use std::sync::Arc;

use milvus_client::SharedClient;

pub use collector::{CollectorConfig, MilvusCollector, SharedCollector};
pub use config::{
    AddressSource, ConfigError, ExporterConfig, FilterConfig, PrometheusConfig,
    ScrapeErrorPolicy,
};
pub use error::ScrapeError;
pub use filter::{CollectionFilter, FilteredClient};
pub use http::HttpServer;
pub use mapping::{MetricDescriptor, Sample};
pub use producers::{MetricProducer, default_producers};

/// Build the collector for a client, applying the collection filters.
pub fn build_collector(
    client: SharedClient,
    filters: &FilterConfig,
) -> Result<SharedCollector, ConfigError> {
    let filter = CollectionFilter::new(filters)
        .map_err(|e| ConfigError::Validation(format!("Invalid collection pattern: {}", e)))?;

    let client: SharedClient = if filter.is_empty() {
        client
    } else {
        Arc::new(FilteredClient::new(client, filter))
    };

    Ok(Arc::new(MilvusCollector::with_defaults(client)))
}
