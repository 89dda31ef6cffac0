//! Patch prioritization and effort estimation over normalized findings.

use serde::Serialize;

use crate::models::patch::PatchRecommendation;
use crate::models::scan::Vulnerability;

/// Overall priority tier for a set of findings, from the average of their
/// risk scores (Critical=5, High=4, Medium=3, Low=2, Informational=1).
pub fn priority_level(vulnerabilities: &[Vulnerability]) -> &'static str {
    if vulnerabilities.is_empty() {
        return "Low Priority";
    }

    let total: u32 = vulnerabilities.iter().map(|v| v.risk_level.score()).sum();
    let average = f64::from(total) / vulnerabilities.len() as f64;

    if average >= 4.0 {
        "Immediate"
    } else if average >= 3.0 {
        "High Priority"
    } else if average >= 2.0 {
        "Medium Priority"
    } else {
        "Low Priority"
    }
}

/// Effort class for a single patch, from complexity, dependency count,
/// testing needs, and system criticality.
pub fn patch_effort(patch: &PatchRecommendation) -> &'static str {
    let complexity = match patch.complexity.as_deref() {
        Some("High") => 5.0,
        Some("Low") => 1.0,
        _ => 3.0,
    };
    let dependencies = patch.dependencies.len() as f64 * 0.5;
    let testing = if patch.testing_required { 2.0 } else { 0.0 };
    let impact = if patch.critical_system { 3.0 } else { 1.0 };

    let total = complexity + dependencies + testing + impact;
    if total >= 10.0 {
        "Major Effort"
    } else if total >= 6.0 {
        "Moderate Effort"
    } else {
        "Minor Effort"
    }
}

/// Total effort estimate across a patch set.
#[derive(Debug, Serialize, PartialEq)]
pub struct EffortEstimate {
    #[serde(rename = "totalPatchCount")]
    pub total_patch_count: usize,
    #[serde(rename = "estimatedHours")]
    pub estimated_hours: u32,
    #[serde(rename = "recommendedTeamSize")]
    pub recommended_team_size: u32,
    pub complexity: &'static str,
}

pub fn total_effort(patches: &[PatchRecommendation]) -> EffortEstimate {
    let total: u32 = patches
        .iter()
        .map(|patch| match patch_effort(patch) {
            "Major Effort" => 3,
            "Moderate Effort" => 2,
            _ => 1,
        })
        .sum();

    EffortEstimate {
        total_patch_count: patches.len(),
        estimated_hours: total * 2,
        recommended_team_size: if total > 10 {
            3
        } else if total > 5 {
            2
        } else {
            1
        },
        complexity: if total > 15 {
            "High"
        } else if total > 8 {
            "Medium"
        } else {
            "Low"
        },
    }
}

/// Actionable summary of one patch for the recommendations response.
#[derive(Debug, Serialize)]
pub struct SuggestedAction {
    pub vulnerability: String,
    pub priority: String,
    #[serde(rename = "suggestedFix")]
    pub suggested_fix: String,
    #[serde(rename = "estimatedEffort")]
    pub estimated_effort: &'static str,
    pub dependencies: Vec<String>,
    pub impact: String,
    #[serde(rename = "testingRequired")]
    pub testing_required: bool,
}

pub fn suggested_actions(patches: &[PatchRecommendation]) -> Vec<SuggestedAction> {
    patches
        .iter()
        .map(|patch| SuggestedAction {
            vulnerability: patch.vulnerability.clone(),
            priority: patch.severity.clone(),
            suggested_fix: patch.remediation.clone(),
            estimated_effort: patch_effort(patch),
            dependencies: patch.dependencies.clone(),
            impact: patch
                .impact
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            testing_required: patch.testing_required,
        })
        .collect()
}
