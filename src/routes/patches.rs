//! Patch recommendation route.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::patch::PatchRecommendation;
use crate::services::patches::{self, EffortEstimate, SuggestedAction};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PatchResponse {
    #[serde(rename = "scanId")]
    pub scan_id: Uuid,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub recommendations: Vec<PatchRecommendation>,
    #[serde(rename = "suggestedActions")]
    pub suggested_actions: Vec<SuggestedAction>,
    #[serde(rename = "priorityLevel")]
    pub priority_level: &'static str,
    #[serde(rename = "estimatedEffort")]
    pub estimated_effort: EffortEstimate,
}

/// GET /api/scans/:id/patches — generate patch recommendations for one
/// persisted scan's findings.
pub async fn recommend(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PatchResponse>, AppError> {
    let scan = state
        .store
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound("Scan not found.".to_string()))?;

    let insights = &scan.insights.0;
    let plan = state
        .insights
        .recommend_patches(&insights.vulnerabilities, &scan.scan_output)
        .await;

    let priority_level = patches::priority_level(&insights.vulnerabilities);
    let suggested_actions = patches::suggested_actions(&plan.patches);
    let estimated_effort = patches::total_effort(&plan.patches);

    Ok(Json(PatchResponse {
        scan_id: scan.id,
        target_url: scan.target_url,
        timestamp: scan.created_at,
        recommendations: plan.patches,
        suggested_actions,
        priority_level,
        estimated_effort,
    }))
}
