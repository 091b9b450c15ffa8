//! HTTP surface for Beian-Exporter
//!
//! Thin pass-throughs onto the scheduler and metrics:
//! - `GET /metrics`: Prometheus text exposition
//! - `POST /api/check`: start a background sweep
//! - `GET /api/check/:domain`: check one domain now
//! - `GET /api/config`: effective configuration
//! - `GET /api/stats`: rate limiter usage and sweep state
//! - `GET /api/status`: last exported state per domain
//! - `GET /health`: liveness

mod handlers;

use crate::config::Config;
use crate::lookup::Scheduler;
use crate::metrics::{MetricsSink, PrometheusRegistry};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub scheduler: Arc<Scheduler>,
    pub metrics: Arc<MetricsSink>,
    pub registry: Arc<PrometheusRegistry>,
    pub config: Arc<Config>,
}

/// Builds the router for all exporter endpoints
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(handlers::metrics))
        .route("/api/check", post(handlers::trigger_sweep))
        .route("/api/check/:domain", get(handlers::check_domain))
        .route("/api/config", get(handlers::config))
        .route("/api/stats", get(handlers::stats))
        .route("/api/status", get(handlers::status))
        .route("/health", get(handlers::health))
        .with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{}", addr);
        tracing::info!("Metrics: http://{}/metrics", addr);
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
