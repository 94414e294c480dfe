//! Milvus client library
//!
//! This crate provides the small slice of Milvus the exporter needs:
//!
//! - [`client`] - The `MilvusClient` trait (list collections, index statistics, load progress)
//! - [`types`] - Data returned by the service (`CollectionInfo`, `IndexDescription`, `LoadingProgress`)
//! - [`rest`] - `RestClient`, an implementation over the Milvus RESTful API
//! - [`session`] - Startup connection with a connectivity check
//! - [`config`] - Connection and logging configuration
//! - [`mock`] - In-memory client for tests
//! - [`error`] - Error types

pub mod client;
pub mod config;
pub mod error;
pub mod mock;
pub mod rest;
pub mod session;
pub mod types;

// Re-export commonly used types at the crate root
pub use client::{MilvusClient, Operation, SharedClient};
pub use config::{DEFAULT_ADDRESS, LogFormat, LoggingConfig, MilvusConfig};
pub use error::{Error, Result};
pub use mock::MockClient;
pub use rest::RestClient;
pub use session::connect;
pub use types::{
    CollectionInfo, INDEX_TYPE_KEY, IndexDescription, IndexParam, LoadingProgress, METRIC_TYPE_KEY,
};

/// Initialize tracing with the given configuration.
///
/// `RUST_LOG` takes precedence over the configured level, which otherwise
/// applies to the Milvus crates only (see [`crate_filter`]). Supports two
/// output formats:
/// - `LogFormat::Text` (default): Human-readable text format
/// - `LogFormat::Json`: Structured JSON format for log aggregation systems
///
/// # Example
///
/// ```ignore
/// use milvus_client::{LoggingConfig, LogFormat, init_tracing};
///
/// let config = LoggingConfig {
///     level: "info".to_string(),
///     format: LogFormat::Json,
/// };
/// init_tracing(&config)?;
/// ```
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => crate_filter(&config.level)?,
    };

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(fmt::layer())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(fmt::layer().json())
                .with(filter)
                .try_init()
                .map_err(|e| Error::Config(format!("Failed to initialize tracing: {}", e)))?;
        }
    }

    Ok(())
}

/// Filter logging the exporter crates at `level` and everything else at warn.
pub fn crate_filter(level: &str) -> Result<tracing_subscriber::EnvFilter> {
    use tracing::Level;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::filter::Directive;

    let level: Level = level
        .parse()
        .map_err(|_| Error::Config(format!("Invalid log level: {}", level)))?;

    let mut filter = EnvFilter::new(Level::WARN.to_string());
    for krate in ["milvus_exporter", "milvus_client"] {
        let directive: Directive = format!("{}={}", krate, level)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid log directive: {}", e)))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
