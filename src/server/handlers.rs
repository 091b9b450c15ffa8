use super::AppState;
use crate::config::validate_domain;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;

pub(super) async fn metrics(State(state): State<AppState>) -> Response {
    match state.registry.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, state.registry.content_type())],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to render metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub(super) async fn trigger_sweep(State(state): State<AppState>) -> Response {
    let started = state.scheduler.trigger_sweep();
    let message = if started {
        "Sweep started"
    } else {
        "A sweep is already running"
    };

    Json(json!({
        "message": message,
        "started": started,
        "domains": state.scheduler.domains().len(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

pub(super) async fn check_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Response {
    let domain = domain.trim().to_lowercase();
    if let Err(e) = validate_domain(&domain) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": e.to_string() })),
        )
            .into_response();
    }

    let result = state.scheduler.check_domain(&domain).await;
    Json(json!({
        "domain": domain,
        "result": result,
        "timestamp": Utc::now().to_rfc3339(),
    }))
    .into_response()
}

pub(super) async fn config(State(state): State<AppState>) -> Response {
    Json(state.config.as_ref().clone()).into_response()
}

pub(super) async fn stats(State(state): State<AppState>) -> Response {
    Json(json!({
        "rate_limiter": state.scheduler.rate_limiter_stats(),
        "running": state.scheduler.is_running(),
        "domains": state.scheduler.domains().len(),
    }))
    .into_response()
}

pub(super) async fn status(State(state): State<AppState>) -> Response {
    Json(state.metrics.snapshots()).into_response()
}

pub(super) async fn health() -> &'static str {
    "ok"
}
