//! Core scan models: validated targets, tool outcomes, normalized
//! insights, and the persisted scan record.
//!
//! Wire field names (`riskLevel`, `keyPoints`, ...) match the JSON the
//! insight collaborator is instructed to emit, so the same structs act as
//! both schema validator and API payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use url::Url;
use uuid::Uuid;

/// A target that passed validation. Immutable once constructed; every
/// command builder works from these fields only, never from raw user input.
#[derive(Debug, Clone)]
pub struct ScanTarget {
    pub url: Url,
    pub hostname: String,
    pub domain: String,
}

/// Request-scoped context: who asked and when the run started.
///
/// Passed explicitly into the orchestrator and store so nothing reads
/// ambient global state.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub requested_by: String,
    pub started_at: DateTime<Utc>,
}

impl ScanContext {
    pub fn new(requested_by: impl Into<String>) -> Self {
        Self {
            requested_by: requested_by.into(),
            started_at: Utc::now(),
        }
    }
}

/// Severity assigned to a vulnerability by the insight collaborator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Severity {
    High,
    Medium,
    Low,
    Informational,
}

/// Risk level, one tier wider than severity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
    Informational,
}

impl RiskLevel {
    /// Numeric score used by patch priority averaging.
    pub fn score(self) -> u32 {
        match self {
            Self::Critical => 5,
            Self::High => 4,
            Self::Medium => 3,
            Self::Low => 2,
            Self::Informational => 1,
        }
    }
}

/// A single structured finding. Produced only by the insight normalizer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vulnerability {
    #[serde(rename = "vulnerability")]
    pub name: String,
    pub severity: Severity,
    #[serde(rename = "riskLevel")]
    pub risk_level: RiskLevel,
    pub occurrence: String,
    pub cause: String,
    pub remediation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cve: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

/// Normalized insights for one block of raw tool output.
///
/// `summary` is always a string (possibly explaining a failure) and both
/// lists are always present; the normalizer never hands its caller a
/// malformed shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScanInsights {
    pub summary: String,
    #[serde(rename = "keyPoints")]
    pub key_points: Vec<String>,
    pub vulnerabilities: Vec<Vulnerability>,
}

impl ScanInsights {
    /// Diagnostic insights for a failed or unavailable normalization.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            summary: reason.into(),
            key_points: Vec::new(),
            vulnerabilities: Vec::new(),
        }
    }
}

/// Outcome of one tool within a scan. Created once, never mutated.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub tool: String,
    pub raw_output: String,
    pub succeeded: bool,
    pub error_message: Option<String>,
}

impl ToolExecutionResult {
    pub fn success(tool: impl Into<String>, raw_output: String) -> Self {
        Self {
            tool: tool.into(),
            raw_output,
            succeeded: true,
            error_message: None,
        }
    }

    pub fn failure(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            raw_output: String::new(),
            succeeded: false,
            error_message: Some(message.into()),
        }
    }
}

/// Persisted scan row in the `scans` table.
#[derive(Debug, Clone, FromRow)]
pub struct ScanRecord {
    pub id: Uuid,
    pub target_url: String,
    pub scan_output: String,
    pub insights: Json<ScanInsights>,
    pub errors: Json<Vec<String>>,
    pub requested_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ScanRecord {
    /// Derived status: failed scans are never persisted, so a stored scan
    /// either completed cleanly or completed with per-tool errors.
    pub fn status(&self) -> &'static str {
        if self.errors.0.is_empty() {
            "completed"
        } else {
            "completed_with_errors"
        }
    }
}
