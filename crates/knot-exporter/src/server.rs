//! axum routes.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use knot_collector::{KnotCollector, render_prometheus};
use tracing::{debug, error, warn};

pub const METRICS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Shared state for handlers.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<KnotCollector>,
}

/// Build the exporter router.
pub fn build_router(collector: Arc<KnotCollector>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/metrics", get(metrics))
        .route("/health", get(health))
        .with_state(AppState { collector })
}

/// GET /metrics
pub async fn metrics(State(state): State<AppState>) -> Response {
    let collector = Arc::clone(&state.collector);
    match tokio::task::spawn_blocking(move || collector.scrape()).await {
        Ok(buffer) => {
            debug!(samples = buffer.len(), "scrape complete");
            let body = render_prometheus(buffer.samples());
            (StatusCode::OK, [("content-type", METRICS_CONTENT_TYPE)], body).into_response()
        }
        Err(e) => {
            error!(error = %e, "collection task failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "collection failed\n").into_response()
        }
    }
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    let collector = Arc::clone(&state.collector);
    let probe = tokio::task::spawn_blocking(move || collector.probe()).await;
    match probe {
        Ok(Ok(())) => (StatusCode::OK, "OK").into_response(),
        Ok(Err(e)) => {
            warn!(error = %e, "health probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, format!("knot unreachable: {e}")).into_response()
        }
        Err(e) => {
            error!(error = %e, "health probe task failed");
            (StatusCode::SERVICE_UNAVAILABLE, "probe failed").into_response()
        }
    }
}

/// GET /
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let build = state.collector.build_info();
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Knot DNS Exporter</title></head>
<body>
<h1>Knot DNS Exporter</h1>
<p>Version {version} ({commit})</p>
<ul>
<li><a href="/metrics">Metrics</a></li>
<li><a href="/health">Health</a></li>
</ul>
</body>
</html>
"#,
        version = build.version,
        commit = build.git_commit,
    ))
}
