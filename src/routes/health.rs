//! Liveness probe.

/// GET /health/live — process is up and serving requests.
pub async fn live() -> &'static str {
    "OK"
}
