//! Dashboard statistics computed over the persisted scan history.
//!
//! Aggregation happens in memory: insights live in a JSONB column, so the
//! per-severity unpacking is simpler here than in SQL.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::scan::{RiskLevel, ScanRecord};
use crate::services::store::ScanStore;

/// Aggregated dashboard statistics for the overview page.
#[derive(Debug, Serialize)]
pub struct DashboardSummary {
    pub statistics: Statistics,
    #[serde(rename = "recentScans")]
    pub recent_scans: Vec<RecentScan>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct Statistics {
    #[serde(rename = "totalScans")]
    pub total_scans: usize,
    #[serde(rename = "vulnerabilitiesByRisk")]
    pub vulnerabilities_by_risk: RiskCounts,
    #[serde(rename = "recentActivity")]
    pub recent_activity: Vec<ActivityEntry>,
    #[serde(rename = "scansByStatus")]
    pub scans_by_status: StatusCounts,
}

/// Vulnerability counts grouped by risk level across all persisted scans.
#[derive(Debug, Default, Serialize, PartialEq)]
pub struct RiskCounts {
    #[serde(rename = "Critical")]
    pub critical: usize,
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
    #[serde(rename = "Informational")]
    pub informational: usize,
}

/// Scan counts grouped by derived status. Failed scans are never
/// persisted, so only the two completed states appear.
#[derive(Debug, Serialize)]
pub struct StatusCounts {
    pub completed: usize,
    #[serde(rename = "completedWithErrors")]
    pub completed_with_errors: usize,
}

#[derive(Debug, Serialize)]
pub struct ActivityEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: &'static str,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub status: &'static str,
    #[serde(rename = "vulnerabilityCount")]
    pub vulnerability_count: usize,
}

#[derive(Debug, Serialize)]
pub struct RecentScan {
    pub id: Uuid,
    #[serde(rename = "targetUrl")]
    pub target_url: String,
    pub timestamp: DateTime<Utc>,
    pub vulnerabilities: usize,
    pub status: &'static str,
    #[serde(rename = "criticalCount")]
    pub critical_count: usize,
}

/// Build the full dashboard summary from the persisted history.
pub async fn summary(store: &ScanStore) -> DashboardSummary {
    let history = store.list().await;
    summarize(&history)
}

fn summarize(history: &[ScanRecord]) -> DashboardSummary {
    let mut by_risk = RiskCounts::default();
    let mut completed = 0;
    let mut completed_with_errors = 0;

    for scan in history {
        for vuln in &scan.insights.0.vulnerabilities {
            match vuln.risk_level {
                RiskLevel::Critical => by_risk.critical += 1,
                RiskLevel::High => by_risk.high += 1,
                RiskLevel::Medium => by_risk.medium += 1,
                RiskLevel::Low => by_risk.low += 1,
                RiskLevel::Informational => by_risk.informational += 1,
            }
        }
        match scan.status() {
            "completed" => completed += 1,
            _ => completed_with_errors += 1,
        }
    }

    // The store returns history newest first.
    let recent_activity = history
        .iter()
        .take(10)
        .map(|scan| ActivityEntry {
            id: scan.id,
            kind: "scan",
            target_url: scan.target_url.clone(),
            timestamp: scan.created_at,
            status: scan.status(),
            vulnerability_count: scan.insights.0.vulnerabilities.len(),
        })
        .collect();

    let recent_scans = history
        .iter()
        .take(5)
        .map(|scan| RecentScan {
            id: scan.id,
            target_url: scan.target_url.clone(),
            timestamp: scan.created_at,
            vulnerabilities: scan.insights.0.vulnerabilities.len(),
            status: scan.status(),
            critical_count: scan
                .insights
                .0
                .vulnerabilities
                .iter()
                .filter(|v| matches!(v.risk_level, RiskLevel::Critical | RiskLevel::High))
                .count(),
        })
        .collect();

    DashboardSummary {
        statistics: Statistics {
            total_scans: history.len(),
            vulnerabilities_by_risk: by_risk,
            recent_activity,
            scans_by_status: StatusCounts {
                completed,
                completed_with_errors,
            },
        },
        recent_scans,
        last_updated: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::{ScanInsights, Severity, Vulnerability};
    use sqlx::types::Json;

    fn vuln(risk: RiskLevel) -> Vulnerability {
        Vulnerability {
            name: "finding".into(),
            severity: Severity::High,
            risk_level: risk,
            occurrence: "o".into(),
            cause: "c".into(),
            remediation: "r".into(),
            cve: None,
            references: None,
            mitigation: None,
        }
    }

    fn record(vulns: Vec<Vulnerability>, errors: Vec<String>) -> ScanRecord {
        ScanRecord {
            id: Uuid::now_v7(),
            target_url: "https://example.com/".into(),
            scan_output: String::new(),
            insights: Json(ScanInsights {
                summary: "s".into(),
                key_points: vec![],
                vulnerabilities: vulns,
            }),
            errors: Json(errors),
            requested_by: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn counts_vulnerabilities_by_risk() {
        let history = vec![
            record(vec![vuln(RiskLevel::Critical), vuln(RiskLevel::High)], vec![]),
            record(vec![vuln(RiskLevel::Low)], vec!["nikto: timed out".into()]),
        ];
        let summary = summarize(&history);

        assert_eq!(summary.statistics.total_scans, 2);
        assert_eq!(summary.statistics.vulnerabilities_by_risk.critical, 1);
        assert_eq!(summary.statistics.vulnerabilities_by_risk.high, 1);
        assert_eq!(summary.statistics.vulnerabilities_by_risk.low, 1);
        assert_eq!(summary.statistics.scans_by_status.completed, 1);
        assert_eq!(summary.statistics.scans_by_status.completed_with_errors, 1);
    }

    #[test]
    fn recent_lists_are_capped() {
        let history: Vec<ScanRecord> = (0..12).map(|_| record(vec![], vec![])).collect();
        let summary = summarize(&history);
        assert_eq!(summary.statistics.recent_activity.len(), 10);
        assert_eq!(summary.recent_scans.len(), 5);
    }

    #[test]
    fn critical_count_includes_high_risk() {
        let history = vec![record(
            vec![
                vuln(RiskLevel::Critical),
                vuln(RiskLevel::High),
                vuln(RiskLevel::Medium),
            ],
            vec![],
        )];
        let summary = summarize(&history);
        assert_eq!(summary.recent_scans[0].critical_count, 2);
        assert_eq!(summary.recent_scans[0].vulnerabilities, 3);
    }

    #[tokio::test]
    async fn empty_store_yields_empty_summary() {
        let summary = summary(&ScanStore::Ephemeral).await;
        assert_eq!(summary.statistics.total_scans, 0);
        assert_eq!(summary.statistics.vulnerabilities_by_risk, RiskCounts::default());
    }
}
