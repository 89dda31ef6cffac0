//! Scan routes: live scans, uploaded output analysis, history, and details.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, Multipart, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::rate_limit;
use crate::models::scan::{ScanContext, ScanInsights, Vulnerability};
use crate::services::{orchestrator, validator};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RunScansRequest {
    #[serde(rename = "targetUrl", default)]
    pub target_url: String,
    #[serde(rename = "selectedTools", default)]
    pub selected_tools: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub message: String,
    #[serde(rename = "rawOutput")]
    pub raw_output: String,
    pub vulnerabilities: Vec<Vulnerability>,
    pub summary: String,
    #[serde(rename = "keyPoints")]
    pub key_points: Vec<String>,
    #[serde(rename = "scanId")]
    pub scan_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

/// POST /api/run-scans — validate the target, run the selected tools, and
/// persist the merged result.
pub async fn run_scans(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(request): Json<RunScansRequest>,
) -> Result<Json<ScanResponse>, AppError> {
    rate_limit::check(&state.rate_limiter, addr.ip())?;

    if request.target_url.trim().is_empty() || request.selected_tools.is_empty() {
        return Err(AppError::Validation(
            "Target URL and at least one tool are required".to_string(),
        ));
    }

    let target = validator::validate_target(&request.target_url)?;
    let ctx = ScanContext::new("api");

    info!(
        target = %target.hostname,
        tools = request.selected_tools.len(),
        client = %addr.ip(),
        "Starting scan run"
    );

    let merged = orchestrator::run_scan(
        &ctx,
        state.runner.as_ref(),
        &state.insights,
        &target,
        &request.selected_tools,
    )
    .await?;

    let saved = state
        .store
        .save(
            &ctx,
            target.url.as_str(),
            &merged.combined_raw_output,
            &merged.insights,
            &merged.errors,
        )
        .await;

    let message = if merged.errors.is_empty() {
        format!("Scans completed successfully for {}!", target.url)
    } else {
        format!("Scans completed with some errors for {}", target.url)
    };

    Ok(Json(ScanResponse {
        message,
        raw_output: merged.combined_raw_output,
        vulnerabilities: merged.insights.vulnerabilities,
        summary: merged.insights.summary,
        key_points: merged.insights.key_points,
        scan_id: saved.id,
        timestamp: saved.created_at,
        errors: merged.errors,
    }))
}

/// POST /api/upload-scan — analyze pre-captured tool output from a file
/// upload (multipart field `scanFile`).
pub async fn upload_scan(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    mut multipart: Multipart,
) -> Result<Json<ScanResponse>, AppError> {
    rate_limit::check(&state.rate_limiter, addr.ip())?;

    let mut file_text: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() == Some("scanFile") {
            file_text = Some(
                field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read file: {e}")))?,
            );
        }
    }

    let raw_output = file_text
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No scan file uploaded".to_string()))?;

    let ctx = ScanContext::new("api");
    let insights = orchestrator::analyze_upload(&state.insights, &raw_output).await;

    let saved = state
        .store
        .save(&ctx, "File Upload", &raw_output, &insights, &[])
        .await;

    Ok(Json(ScanResponse {
        message: "File processed successfully!".to_string(),
        raw_output,
        vulnerabilities: insights.vulnerabilities,
        summary: insights.summary,
        key_points: insights.key_points,
        scan_id: saved.id,
        timestamp: saved.created_at,
        errors: Vec::new(),
    }))
}

#[derive(Debug, Serialize)]
pub struct ScanSummary {
    pub id: Uuid,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub vulnerabilities: usize,
    pub status: &'static str,
}

/// GET /api/scans — scan history, newest first. An unreachable store
/// yields an empty list, not an error.
pub async fn history(State(state): State<AppState>) -> Json<Vec<ScanSummary>> {
    let summaries = state
        .store
        .list()
        .await
        .into_iter()
        .map(|scan| ScanSummary {
            id: scan.id,
            target_url: scan.target_url.clone(),
            timestamp: scan.created_at,
            vulnerabilities: scan.insights.0.vulnerabilities.len(),
            status: scan.status(),
        })
        .collect();
    Json(summaries)
}

#[derive(Debug, Serialize)]
pub struct ScanDetails {
    pub id: Uuid,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "rawOutput")]
    pub raw_output: String,
    pub insights: ScanInsights,
    pub errors: Vec<String>,
    pub status: &'static str,
    #[serde(rename = "requestedBy", skip_serializing_if = "Option::is_none")]
    pub requested_by: Option<String>,
}

/// GET /api/scans/:id — full details of one persisted scan.
pub async fn details(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ScanDetails>, AppError> {
    let scan = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Scan not found.".to_string()))?;

    Ok(Json(ScanDetails {
        id: scan.id,
        target_url: scan.target_url.clone(),
        timestamp: scan.created_at,
        status: scan.status(),
        raw_output: scan.scan_output,
        insights: scan.insights.0,
        errors: scan.errors.0,
        requested_by: scan.requested_by,
    }))
}
