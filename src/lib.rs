pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::middleware::rate_limit::ScanRateLimiter;
use crate::services::executor::ToolRunner;
use crate::services::insights::InsightsClient;
use crate::services::store::ScanStore;

/// Shared application state passed to all Axum handlers. Holds the
/// constructed collaborators only; configuration is consumed at startup.
#[derive(Clone)]
pub struct AppState {
    pub store: ScanStore,
    pub insights: Arc<InsightsClient>,
    pub runner: Arc<dyn ToolRunner>,
    pub rate_limiter: Arc<ScanRateLimiter>,
}

/// Build the full application router. Shared by `main` and the
/// integration tests so both serve the same surface.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/run-scans", post(routes::scans::run_scans))
        .route("/upload-scan", post(routes::scans::upload_scan))
        .route("/scans", get(routes::scans::history))
        .route("/scans/{id}", get(routes::scans::details))
        .route("/scans/{id}/report", get(routes::report::download))
        .route("/scans/{id}/patches", get(routes::patches::recommend))
        .route("/dashboard", get(routes::dashboard::summary));

    Router::new()
        .route("/health/live", get(routes::health::live))
        .nest("/api", api)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
