//! Dashboard route: aggregated statistics for the overview page.

use axum::{extract::State, Json};

use crate::services::dashboard::{self, DashboardSummary};
use crate::AppState;

/// GET /api/dashboard — aggregated scan statistics.
pub async fn summary(State(state): State<AppState>) -> Json<DashboardSummary> {
    Json(dashboard::summary(&state.store).await)
}
