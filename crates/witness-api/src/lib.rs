//! # witness-api: HTTP Gateway for the Witness Registry
//!
//! ## API Surface
//!
//! | Route | Module | Purpose |
//! |-------|--------|---------|
//! | `POST /v1/reports`, `POST /upload-report` | [`routes::reports`] | Submit a report |
//! | `GET /v1/reports/{id}`, `GET /get-report` | [`routes::reports`] | Read a report |
//! | `GET /v1/reports/by-token/{token}` | [`routes::reports`] | Resolve a submission token |
//! | `GET /v1/content/{contentId}` | [`routes::content`] | Read an attachment |
//! | `GET /health/liveness`, `/health/readiness` | here | Probes |
//! | `GET /metrics` | here | Prometheus scrape, when enabled |
//!
//! ## Middleware
//!
//! ```text
//! TraceLayer → DefaultBodyLimit → Handler
//! ```

pub mod config;
pub mod error;
pub mod multipart;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;
use witness_registry::RegistryClient as _;
use witness_store::ContentStore as _;

use crate::state::AppState;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::reports::router())
        .merge(routes::content::router())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes));

    let mut probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness));
    if state.metrics.is_some() {
        probes = probes.route("/metrics", get(prometheus_metrics));
    }

    Router::new()
        .merge(probes)
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: checks the content store and the registry.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    if let Err(e) = state.pipeline.store().check().await {
        tracing::warn!(error = %e, "content store not ready");
        return (StatusCode::SERVICE_UNAVAILABLE, "content store unavailable").into_response();
    }
    if let Err(e) = state.pipeline.registry().check().await {
        tracing::warn!(error = %e, "registry not ready");
        return (StatusCode::SERVICE_UNAVAILABLE, "registry unavailable").into_response();
    }
    (StatusCode::OK, "ready").into_response()
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
