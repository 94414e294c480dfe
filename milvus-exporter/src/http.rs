//! HTTP server for the Prometheus scrape endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use milvus_client::MilvusClient;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::collector::SharedCollector;
use crate::config::{PrometheusConfig, ScrapeErrorPolicy};
use crate::error::ScrapeError;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Channel receiving scrape failures that should stop the process.
pub type FatalSender = mpsc::UnboundedSender<ScrapeError>;

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
    prometheus: Arc<PrometheusConfig>,
    policy: ScrapeErrorPolicy,
    fatal: Option<FatalSender>,
}

/// Create the HTTP router.
fn create_router(state: AppState, metrics_path: &str) -> Router {
    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint. Every request runs one collect cycle.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match state.collector.scrape(&state.prometheus).await {
        Ok(body) => (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response(),
        Err(e) => {
            error!(error = %e, "Scrape failed");
            let body = format!("scrape failed: {}\n", e);

            if state.policy == ScrapeErrorPolicy::Exit {
                match &state.fatal {
                    Some(tx) => {
                        if tx.send(e).is_err() {
                            warn!("Fatal error channel closed");
                        }
                    }
                    None => warn!("No fatal error channel configured"),
                }
            }

            (StatusCode::INTERNAL_SERVER_ERROR, body).into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint. Ready while Milvus answers.
async fn ready_handler(State(state): State<AppState>) -> Response {
    match state.collector.client().list_collections().await {
        Ok(_) => (StatusCode::OK, "ready\n").into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("not ready - {}\n", e),
        )
            .into_response(),
    }
}

/// HTTP server configuration.
pub struct HttpServer {
    collector: SharedCollector,
    listen_addr: SocketAddr,
    metrics_path: String,
    prometheus: PrometheusConfig,
    policy: ScrapeErrorPolicy,
    fatal: Option<FatalSender>,
}

impl HttpServer {
    /// Create a new HTTP server with default exposition settings.
    ///
    /// Scrape failures only fail the request until a fatal channel is set
    /// with [`HttpServer::with_error_policy`].
    pub fn new(collector: SharedCollector, listen_addr: SocketAddr, metrics_path: String) -> Self {
        Self {
            collector,
            listen_addr,
            metrics_path,
            prometheus: PrometheusConfig::default(),
            policy: ScrapeErrorPolicy::FailRequest,
            fatal: None,
        }
    }

    /// Set the exposition settings (prefix, default labels).
    pub fn with_prometheus(mut self, prometheus: PrometheusConfig) -> Self {
        self.prometheus = prometheus;
        self
    }

    /// Set the scrape failure policy.
    ///
    /// Under [`ScrapeErrorPolicy::Exit`] failures are also sent to `fatal`.
    pub fn with_error_policy(mut self, policy: ScrapeErrorPolicy, fatal: FatalSender) -> Self {
        self.policy = policy;
        self.fatal = Some(fatal);
        self
    }

    fn into_router(self) -> (Router, String) {
        let state = AppState {
            collector: self.collector,
            prometheus: Arc::new(self.prometheus),
            policy: self.policy,
            fatal: self.fatal,
        };
        (create_router(state, &self.metrics_path), self.metrics_path)
    }

    /// Bind the configured address and serve until the shutdown signal.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
        info!(addr = %self.listen_addr, "Starting HTTP server");

        let listener = TcpListener::bind(self.listen_addr)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", self.listen_addr, e))?;

        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until the shutdown signal.
    pub async fn serve(
        self,
        listener: TcpListener,
        mut shutdown: watch::Receiver<bool>,
    ) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        let (router, metrics_path) = self.into_router();

        info!(addr = %addr, path = %metrics_path, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))?;

        info!("HTTP server stopped");
        Ok(())
    }
}
