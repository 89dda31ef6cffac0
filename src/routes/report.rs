//! Report download route.

use axum::{
    extract::{Path, State},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::IntoResponse,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::report;
use crate::AppState;

/// GET /api/scans/:id/report — plain-text report as a file download.
pub async fn download(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let scan = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Scan not found.".to_string()))?;

    let body = report::render(&scan);
    let headers = [
        (CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
        (
            CONTENT_DISPOSITION,
            format!("attachment; filename=\"pentest_report_{id}.txt\""),
        ),
    ];

    Ok((headers, body))
}
