//! Plain-text report rendering for a persisted scan.

use crate::models::scan::ScanRecord;

const BANNER: &str =
    "================================================================================";
const DIVIDER: &str =
    "--------------------------------------------------------------------------------";

/// Render the downloadable report document: executive summary, key
/// findings, detailed vulnerabilities, and the raw combined output.
pub fn render(record: &ScanRecord) -> String {
    let insights = &record.insights.0;
    let generated_at = record.created_at.format("%Y-%m-%d %H:%M:%S UTC");
    let generated_by = record.requested_by.as_deref().unwrap_or("unknown");

    let mut report = format!(
        "Pentest Report\n\
         Generated at: {generated_at}\n\
         Scan ID: {}\n\
         Target: {}\n\
         Generated by: {generated_by}\n\n\
         {BANNER}\n\
         1. Executive Summary\n\
         {BANNER}\n",
        record.id, record.target_url
    );

    if insights.summary.trim().is_empty() {
        report.push_str("No summary available.\n");
    } else {
        report.push_str(&insights.summary);
        report.push('\n');
    }

    report.push_str(&format!(
        "\n{BANNER}\n2. Key Findings / Highlights\n{BANNER}\n"
    ));
    if insights.key_points.is_empty() {
        report.push_str("No key points identified.\n");
    } else {
        for point in &insights.key_points {
            report.push_str(&format!("- {point}\n"));
        }
    }

    report.push_str(&format!(
        "\n{BANNER}\n3. Detailed Vulnerabilities\n{BANNER}\n"
    ));
    if insights.vulnerabilities.is_empty() {
        report.push_str("No detailed vulnerabilities identified.\n");
    } else {
        for (index, vuln) in insights.vulnerabilities.iter().enumerate() {
            let references = match &vuln.references {
                Some(refs) if !refs.is_empty() => refs.join(", "),
                _ => "N/A".to_string(),
            };
            report.push_str(&format!(
                "\n{DIVIDER}\n\
                 Vulnerability {}: {}\n\
                 {DIVIDER}\n\
                 Risk Level: {:?} (Severity: {:?})\n\
                 Occurrence: {}\n\
                 Cause: {}\n\
                 CVE ID(s): {}\n\
                 References: {}\n\n\
                 Remediation:\n{}\n",
                index + 1,
                vuln.name,
                vuln.risk_level,
                vuln.severity,
                vuln.occurrence,
                vuln.cause,
                vuln.cve.as_deref().unwrap_or("N/A"),
                references,
                vuln.remediation,
            ));
            if let Some(mitigation) = &vuln.mitigation {
                report.push_str(&format!("\nMitigation: {mitigation}\n"));
            }
        }
    }

    report.push_str(&format!(
        "\n{BANNER}\n4. Raw Scan Output\n{BANNER}\n{}\n\n\
         {BANNER}\n\
         End of Report\n\
         Generated at: {generated_at}\n\
         Generated by: {generated_by}\n\
         {BANNER}\n",
        record.scan_output
    ));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::{RiskLevel, ScanInsights, Severity, Vulnerability};
    use chrono::Utc;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn record() -> ScanRecord {
        ScanRecord {
            id: Uuid::now_v7(),
            target_url: "https://example.com/".into(),
            scan_output: "+ Server: nginx".into(),
            insights: Json(ScanInsights {
                summary: "One outdated service detected.".into(),
                key_points: vec!["nginx 1.14 is end of life".into()],
                vulnerabilities: vec![Vulnerability {
                    name: "Outdated nginx".into(),
                    severity: Severity::Medium,
                    risk_level: RiskLevel::High,
                    occurrence: "Server header".into(),
                    cause: "Unpatched server".into(),
                    remediation: "Upgrade nginx".into(),
                    cve: Some("CVE-2019-9511".into()),
                    references: Some(vec!["https://nginx.org/en/security_advisories.html".into()]),
                    mitigation: Some("Place a WAF in front".into()),
                }],
            }),
            errors: Json(vec![]),
            requested_by: Some("tester".into()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn report_contains_all_sections() {
        let report = render(&record());
        assert!(report.contains("1. Executive Summary"));
        assert!(report.contains("2. Key Findings / Highlights"));
        assert!(report.contains("3. Detailed Vulnerabilities"));
        assert!(report.contains("4. Raw Scan Output"));
        assert!(report.contains("End of Report"));
    }

    #[test]
    fn report_details_each_vulnerability() {
        let report = render(&record());
        assert!(report.contains("Vulnerability 1: Outdated nginx"));
        assert!(report.contains("Risk Level: High (Severity: Medium)"));
        assert!(report.contains("CVE ID(s): CVE-2019-9511"));
        assert!(report.contains("Mitigation: Place a WAF in front"));
        assert!(report.contains("+ Server: nginx"));
    }

    #[test]
    fn empty_insights_fall_back_to_placeholders() {
        let mut record = record();
        record.insights = Json(ScanInsights::degraded(""));
        let report = render(&record);
        assert!(report.contains("No summary available."));
        assert!(report.contains("No key points identified."));
        assert!(report.contains("No detailed vulnerabilities identified."));
    }
}
