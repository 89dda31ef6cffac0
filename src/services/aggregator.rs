//! Result aggregation: a pure merge of per-tool outcomes into one
//! combined scan result. Deterministic for a given ordered input.

use chrono::{DateTime, Utc};

use crate::models::scan::{ScanInsights, ToolExecutionResult};

/// One tool's execution outcome plus its normalized insights (present
/// only for successful runs).
#[derive(Debug, Clone)]
pub struct ToolReport {
    pub result: ToolExecutionResult,
    pub insights: Option<ScanInsights>,
}

/// Merged output of a whole scan, ready for persistence.
#[derive(Debug, Clone)]
pub struct AggregatedScan {
    pub combined_raw_output: String,
    pub insights: ScanInsights,
    pub errors: Vec<String>,
}

/// Merge per-tool reports: headered raw output in request order,
/// concatenated vulnerabilities and key points, summaries joined with
/// newlines, and one error entry per failed tool.
pub fn aggregate(target: &str, timestamp: DateTime<Utc>, reports: &[ToolReport]) -> AggregatedScan {
    let stamp = timestamp.format("%Y-%m-%d %H:%M:%S");
    let mut combined_raw_output = String::new();
    let mut summaries: Vec<String> = Vec::new();
    let mut key_points: Vec<String> = Vec::new();
    let mut vulnerabilities = Vec::new();
    let mut errors: Vec<String> = Vec::new();

    for report in reports {
        let tool = &report.result.tool;
        if report.result.succeeded {
            combined_raw_output.push_str(&format!(
                "\n--- Output from {tool} for {target} at {stamp} ---\n{}\n",
                report.result.raw_output
            ));
        } else {
            let message = report
                .result
                .error_message
                .as_deref()
                .unwrap_or("unknown error");
            combined_raw_output.push_str(&format!(
                "\n--- Error from {tool} for {target} at {stamp} ---\n{message}\n"
            ));
            errors.push(format!("{tool}: {message}"));
        }

        if let Some(insights) = &report.insights {
            if !insights.summary.trim().is_empty() {
                summaries.push(insights.summary.trim().to_string());
            }
            key_points.extend(insights.key_points.iter().cloned());
            vulnerabilities.extend(insights.vulnerabilities.iter().cloned());
        }
    }

    AggregatedScan {
        combined_raw_output,
        insights: ScanInsights {
            summary: summaries.join("\n"),
            key_points,
            vulnerabilities,
        },
        errors,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 29, 12, 0, 0).unwrap()
    }

    #[test]
    fn success_output_is_headered_with_tool_and_target() {
        let reports = vec![ToolReport {
            result: ToolExecutionResult::success("nikto", "+ Server: nginx".into()),
            insights: Some(ScanInsights::degraded("no credential")),
        }];

        let merged = aggregate("https://example.com", at(), &reports);
        assert!(merged
            .combined_raw_output
            .contains("--- Output from nikto for https://example.com at 2026-08-29 12:00:00 ---"));
        assert!(merged.combined_raw_output.contains("+ Server: nginx"));
        assert!(merged.errors.is_empty());
    }

    #[test]
    fn failures_are_recorded_in_errors_and_raw_stream() {
        let reports = vec![
            ToolReport {
                result: ToolExecutionResult::success("nikto", "+ Server: nginx".into()),
                insights: Some(ScanInsights {
                    summary: "nginx detected".into(),
                    key_points: vec!["nginx 1.14".into()],
                    vulnerabilities: vec![],
                }),
            },
            ToolReport {
                result: ToolExecutionResult::failure(
                    "nuclei",
                    "Scan timed out after 600 seconds",
                ),
                insights: None,
            },
        ];

        let merged = aggregate("https://example.com", at(), &reports);
        assert_eq!(merged.errors.len(), 1);
        assert_eq!(merged.errors[0], "nuclei: Scan timed out after 600 seconds");
        assert!(merged.combined_raw_output.contains("--- Error from nuclei"));
        assert_eq!(merged.insights.summary, "nginx detected");
        assert_eq!(merged.insights.key_points, vec!["nginx 1.14".to_string()]);
    }

    #[test]
    fn summaries_join_and_lists_concatenate_in_order() {
        let reports = vec![
            ToolReport {
                result: ToolExecutionResult::success("nikto", "a".into()),
                insights: Some(ScanInsights {
                    summary: "first".into(),
                    key_points: vec!["p1".into()],
                    vulnerabilities: vec![],
                }),
            },
            ToolReport {
                result: ToolExecutionResult::success("whatweb", "b".into()),
                insights: Some(ScanInsights {
                    summary: "second".into(),
                    key_points: vec!["p2".into()],
                    vulnerabilities: vec![],
                }),
            },
        ];

        let merged = aggregate("https://example.com", at(), &reports);
        assert_eq!(merged.insights.summary, "first\nsecond");
        assert_eq!(
            merged.insights.key_points,
            vec!["p1".to_string(), "p2".to_string()]
        );
    }

    #[test]
    fn deterministic_for_the_same_input() {
        let reports = vec![ToolReport {
            result: ToolExecutionResult::success("dnsx", "A 93.184.216.34".into()),
            insights: None,
        }];
        let a = aggregate("https://example.com", at(), &reports);
        let b = aggregate("https://example.com", at(), &reports);
        assert_eq!(a.combined_raw_output, b.combined_raw_output);
        assert_eq!(a.insights, b.insights);
    }
}
