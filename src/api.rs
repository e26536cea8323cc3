use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;

use crate::watch::query::{self, SourceLatest, StatusReport};
use crate::watch::WatchState;

pub const LIVENESS_BODY: &str = "Bot is running ✅";

#[derive(Clone)]
pub struct AppState {
    pub watch: Arc<WatchState>,
    /// Set when the binary installed a Prometheus recorder.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    pub fn new(watch: Arc<WatchState>) -> Self {
        Self {
            watch,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { LIVENESS_BODY }))
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(status))
        .route("/latest", get(latest))
        .route("/metrics", get(metrics))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(query::status(&state.watch))
}

async fn latest(State(state): State<AppState>) -> Json<Vec<SourceLatest>> {
    Json(query::latest(&state.watch))
}

async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (StatusCode::OK, handle.render()),
        None => (StatusCode::NOT_FOUND, "metrics recorder not installed".to_string()),
    }
}
