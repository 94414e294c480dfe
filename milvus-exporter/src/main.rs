//! Prometheus exporter for Milvus.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use milvus_client::{DEFAULT_ADDRESS, connect, init_tracing};
use milvus_exporter::config::{LISTEN_ADDR, METRICS_PATH};
use milvus_exporter::{AddressSource, ExporterConfig, HttpServer, build_collector};

/// Prometheus exporter for Milvus.
#[derive(Parser, Debug)]
#[command(name = "milvus-exporter")]
#[command(about = "Export Milvus collection, index and load status as Prometheus metrics")]
#[command(version)]
struct Args {
    /// Milvus server address, host:port or URL (overrides config).
    #[arg(short, long, env = "MDB_SERVER")]
    server: Option<String>,

    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => ExporterConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ExporterConfig::default(),
    };

    // Command line and environment take precedence over the file
    let address_source = config.resolve_address(args.server);
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    config.validate()?;

    init_tracing(&config.logging)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting Milvus exporter");
    if address_source == AddressSource::Default {
        info!(address = DEFAULT_ADDRESS, "No Milvus address given, using default");
    }

    let client = connect(&config.milvus)
        .await
        .context("Failed to connect to Milvus")?;

    let collector = build_collector(Arc::new(client), &config.filters)?;
    let listen_addr: SocketAddr = LISTEN_ADDR.parse()?;

    // Create shutdown and fatal error channels
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();

    let http_server = HttpServer::new(collector, listen_addr, METRICS_PATH.to_string())
        .with_prometheus(config.prometheus.clone())
        .with_error_policy(config.on_scrape_error, fatal_tx);
    let mut http_task = tokio::spawn(http_server.run(shutdown_rx));
    let mut http_finished = false;

    let outcome = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down...");
            Ok(())
        }
        _ = terminate() => {
            info!("Received SIGTERM, shutting down...");
            Ok(())
        }
        Some(e) = fatal_rx.recv() => {
            error!(error = %e, "Scrape failed, shutting down");
            Err(anyhow::Error::new(e).context("Scrape failed"))
        }
        result = &mut http_task => {
            http_finished = true;
            match result {
                Ok(Ok(())) => Err(anyhow::anyhow!("HTTP server exited unexpectedly")),
                Ok(Err(e)) => Err(e),
                Err(e) => Err(anyhow::Error::new(e).context("HTTP server task failed")),
            }
        }
    };

    // Signal shutdown
    let _ = shutdown_tx.send(true);

    if !http_finished
        && tokio::time::timeout(Duration::from_secs(5), http_task)
            .await
            .is_err()
    {
        warn!("HTTP server did not stop within 5s");
    }

    info!("Exporter stopped");
    outcome
}

/// Resolve when SIGTERM is received.
async fn terminate() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        std::future::pending::<()>().await;
    }
}
