//! Patch recommendation schema for the normalizer's second mode.
//!
//! Field names are snake_case on the wire, matching the JSON structure the
//! collaborator is instructed to produce.

use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// One recommended patch for a vulnerability.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchRecommendation {
    pub vulnerability: String,
    pub severity: String,
    pub remediation: String,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default = "default_true")]
    pub testing_required: bool,
    #[serde(default)]
    pub critical_system: bool,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub rollback_plan: Option<String>,
    #[serde(default)]
    pub verification_steps: Vec<String>,
    #[serde(default)]
    pub estimated_time: Option<String>,
}

/// Full patch plan returned by the normalizer's patch mode.
///
/// `patches` is required when deserializing the collaborator's response;
/// the degraded form carries an empty list and an explanatory `error`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PatchPlan {
    pub patches: Vec<PatchRecommendation>,
    #[serde(default)]
    pub deployment_strategy: Option<String>,
    #[serde(default)]
    pub testing_requirements: Vec<String>,
    #[serde(default)]
    pub estimated_timeline: Option<String>,
    #[serde(default)]
    pub risk_assessment: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PatchPlan {
    /// Diagnostic plan for a failed or unavailable patch generation.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            patches: Vec::new(),
            deployment_strategy: Some("Error generating patch recommendations".into()),
            testing_requirements: vec!["Failed to generate due to LLM error".into()],
            estimated_timeline: Some("Unknown due to error".into()),
            risk_assessment: None,
            error: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn testing_required_defaults_to_true() {
        let patch: PatchRecommendation = serde_json::from_value(serde_json::json!({
            "vulnerability": "Outdated Apache",
            "severity": "High",
            "remediation": "Upgrade Apache"
        }))
        .unwrap();
        assert!(patch.testing_required);
        assert!(!patch.critical_system);
        assert!(patch.dependencies.is_empty());
    }

    #[test]
    fn plan_requires_patches_array() {
        let result: Result<PatchPlan, _> = serde_json::from_value(serde_json::json!({
            "deployment_strategy": "rolling"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn degraded_plan_is_empty_but_explained() {
        let plan = PatchPlan::degraded("GEMINI_API_KEY is not set");
        assert!(plan.patches.is_empty());
        assert_eq!(plan.error.as_deref(), Some("GEMINI_API_KEY is not set"));
    }
}
