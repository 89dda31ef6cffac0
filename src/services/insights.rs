//! Insight normalizer: turns raw tool output into structured findings via
//! the Gemini text-generation collaborator.
//!
//! The collaborator is unreliable by contract — its response is free text
//! that may or may not contain a fenced JSON block, and the JSON may not
//! match the schema. Every failure mode degrades to a diagnostic result;
//! this module never returns an error to its callers.

use std::sync::LazyLock;
use std::time::Duration;

use anyhow::{anyhow, Context};
use regex::Regex;
use tracing::warn;

use crate::config::AppConfig;
use crate::models::patch::PatchPlan;
use crate::models::scan::{ScanInsights, Vulnerability};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

static FENCED_JSON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

/// Client for the text-generation collaborator.
pub struct InsightsClient {
    http: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl InsightsClient {
    pub fn new(config: &AppConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_default();

        Self {
            http,
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Normalize raw tool output into [`ScanInsights`]. Never fails
    /// outward: missing credential, transport errors, and schema
    /// violations all produce a degraded result with an explanatory
    /// summary and empty lists.
    pub async fn normalize(&self, raw_output: &str) -> ScanInsights {
        let Some(api_key) = self.api_key.as_deref() else {
            return ScanInsights::degraded(
                "LLM insights disabled due to missing GEMINI_API_KEY. \
                 Please set it in your environment.",
            );
        };

        match self.analyze(api_key, raw_output).await {
            Ok(insights) => insights,
            Err(e) => {
                warn!(error = %e, "Insight generation failed; returning degraded insights");
                ScanInsights::degraded(format!(
                    "Error generating LLM insights: {e}. \
                     Please ensure GEMINI_API_KEY is correct and try again."
                ))
            }
        }
    }

    async fn analyze(&self, api_key: &str, raw_output: &str) -> anyhow::Result<ScanInsights> {
        let text = self.generate(api_key, &analysis_prompt(raw_output)).await?;
        parse_insights(&text)
    }

    /// Patch-recommendation mode: same collaborator, different schema,
    /// same degrade contract.
    pub async fn recommend_patches(
        &self,
        vulnerabilities: &[Vulnerability],
        raw_output: &str,
    ) -> PatchPlan {
        let Some(api_key) = self.api_key.as_deref() else {
            return PatchPlan::degraded(
                "LLM patch recommendations disabled due to missing GEMINI_API_KEY.",
            );
        };

        let prompt = patch_prompt(vulnerabilities, raw_output);
        let result: anyhow::Result<PatchPlan> = async {
            let text = self.generate(api_key, &prompt).await?;
            parse_patch_plan(&text)
        }
        .await;

        match result {
            Ok(plan) => plan,
            Err(e) => {
                warn!(error = %e, "Patch generation failed; returning degraded plan");
                PatchPlan::degraded(e.to_string())
            }
        }
    }

    /// One generateContent round-trip, returning the response text.
    async fn generate(&self, api_key: &str, prompt: &str) -> anyhow::Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let response = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&body)
            .send()
            .await
            .context("request to the text-generation service failed")?
            .error_for_status()
            .context("text-generation service returned an error status")?;

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("text-generation response was not valid JSON")?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| anyhow!("text-generation response contained no candidates"))
    }
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidatePart {
    text: String,
}

/// Extract the JSON payload from a free-text response: fenced ```json
/// block if present, else the whole body.
fn extract_json(text: &str) -> anyhow::Result<serde_json::Value> {
    let payload = match FENCED_JSON.captures(text) {
        Some(caps) => caps[1].trim().to_string(),
        None => text.trim().to_string(),
    };
    serde_json::from_str(&payload).context("response contained no parseable JSON")
}

/// Parse and schema-validate an analysis response.
fn parse_insights(text: &str) -> anyhow::Result<ScanInsights> {
    let value = extract_json(text)?;
    serde_json::from_value(value)
        .context("response JSON is missing summary, keyPoints, or vulnerabilities")
}

/// Parse and schema-validate a patch-recommendation response.
fn parse_patch_plan(text: &str) -> anyhow::Result<PatchPlan> {
    let value = extract_json(text)?;
    serde_json::from_value(value).context("response JSON is missing the patches array")
}

fn analysis_prompt(raw_output: &str) -> String {
    format!(
        r#"Analyze the following network scan output for vulnerabilities.
Extract key vulnerabilities, their severity (High, Medium, Low, Informational), how they occurred, what causes them, specific remediation steps, and if applicable, CVE IDs and relevant references (URLs). Also provide a concise overall summary of the findings and a list of key takeaways/points.
Assign a risk level (Critical, High, Medium, Low, Informational) to each vulnerability.

Format the output as a JSON object with the following keys:
- "summary": (string) A concise overall summary of the findings.
- "keyPoints": (array of strings) A list of important takeaways or highlights.
- "vulnerabilities": (array of objects) Each object should have:
  - "vulnerability": (string) Name or description of the vulnerability.
  - "severity": (string) High, Medium, Low, Informational.
  - "riskLevel": (string) Critical, High, Medium, Low, Informational.
  - "occurrence": (string) How this vulnerability was observed or occurred in the scan.
  - "cause": (string) The underlying cause of this vulnerability.
  - "remediation": (string) Detailed steps to fix this vulnerability.
  - "cve": (string, optional) Relevant CVE ID (e.g., CVE-2023-1234). If multiple, list them comma-separated.
  - "references": (array of strings, optional) URLs to external resources for more information.
  - "mitigation": (string, optional) Steps to reduce the impact if immediate remediation is not possible.

Example JSON structure:
{{
  "summary": "The scan identified several critical and high-severity vulnerabilities, primarily related to outdated software and exposed administrative interfaces.",
  "keyPoints": ["Outdated Apache version detected.", "Missing security headers."],
  "vulnerabilities": [
    {{
      "vulnerability": "Outdated Apache HTTP Server Version",
      "severity": "High",
      "riskLevel": "High",
      "occurrence": "Nmap scan revealed Apache/2.4.41 (Ubuntu) which is known to have multiple vulnerabilities.",
      "cause": "The web server software is not updated to the latest stable version.",
      "remediation": "Upgrade Apache HTTP Server to the latest stable version and apply all security patches.",
      "cve": "CVE-2021-40438, CVE-2021-44790",
      "references": ["https://httpd.apache.org/security/vulnerabilities_24.html"],
      "mitigation": "Implement a Web Application Firewall (WAF) to filter malicious requests."
    }}
  ]
}}

Scan Output:
{raw_output}"#
    )
}

fn patch_prompt(vulnerabilities: &[Vulnerability], raw_output: &str) -> String {
    let vulns_json =
        serde_json::to_string_pretty(vulnerabilities).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"Generate detailed patch recommendations for the following vulnerabilities found during a security scan.
Consider dependencies, testing requirements, and potential impacts when suggesting fixes.

Vulnerabilities to analyze:
{vulns_json}

Format the output as a JSON object with the following structure:
{{
  "patches": [
    {{
      "vulnerability": "Name of the vulnerability",
      "severity": "Critical/High/Medium/Low",
      "remediation": "Detailed step-by-step instructions to fix the vulnerability",
      "complexity": "High/Medium/Low",
      "dependencies": ["List of required dependencies or prerequisites"],
      "testing_required": true,
      "critical_system": false,
      "impact": "Description of potential impact during/after patching",
      "rollback_plan": "Steps to reverse the changes if needed",
      "verification_steps": ["List of steps to verify the fix"],
      "estimated_time": "Estimated time to implement in hours"
    }}
  ],
  "deployment_strategy": "Overall strategy for deploying these patches",
  "testing_requirements": ["List of specific testing requirements"],
  "estimated_timeline": "Total estimated time for all patches",
  "risk_assessment": {{
    "pre_patch_risk": "Risk level before patching",
    "post_patch_risk": "Expected risk level after patching",
    "implementation_risk": "Risk level during implementation"
  }}
}}

Consider the following in your recommendations:
1. Priority order based on severity
2. Dependencies between patches
3. System downtime requirements
4. Testing needs
5. Rollback procedures
6. Verification steps

Original scan output for context:
{raw_output}"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scan::{RiskLevel, Severity};

    fn config_without_key() -> AppConfig {
        AppConfig {
            database_url: None,
            database_max_connections: 10,
            host: "127.0.0.1".into(),
            port: 0,
            frontend_url: "http://localhost:5173".into(),
            gemini_api_key: None,
            gemini_model: "gemini-2.5-flash".into(),
            tool_timeout_secs: 600,
            max_tool_output_bytes: 10 * 1024 * 1024,
            rate_limit_window_secs: 900,
            rate_limit_max_requests: 100,
        }
    }

    const VALID_RESPONSE: &str = r#"Here is the analysis you asked for:
```json
{
  "summary": "One outdated service detected.",
  "keyPoints": ["nginx 1.14 is end of life"],
  "vulnerabilities": [
    {
      "vulnerability": "Outdated nginx",
      "severity": "Medium",
      "riskLevel": "High",
      "occurrence": "Server header in nikto output",
      "cause": "Unpatched web server",
      "remediation": "Upgrade nginx"
    }
  ]
}
```
Let me know if you need more detail."#;

    #[test]
    fn extracts_fenced_json_block() {
        let value = extract_json(VALID_RESPONSE).unwrap();
        assert_eq!(value["summary"], "One outdated service detected.");
    }

    #[test]
    fn falls_back_to_whole_body_parse() {
        let value = extract_json(r#"{"summary": "plain", "keyPoints": [], "vulnerabilities": []}"#)
            .unwrap();
        assert_eq!(value["summary"], "plain");
    }

    #[test]
    fn garbage_response_is_an_error() {
        assert!(extract_json("I could not find any vulnerabilities, sorry.").is_err());
    }

    #[test]
    fn parses_valid_insights() {
        let insights = parse_insights(VALID_RESPONSE).unwrap();
        assert_eq!(insights.vulnerabilities.len(), 1);
        assert_eq!(insights.vulnerabilities[0].severity, Severity::Medium);
        assert_eq!(insights.vulnerabilities[0].risk_level, RiskLevel::High);
        assert_eq!(insights.key_points.len(), 1);
    }

    #[test]
    fn mistyped_summary_fails_validation() {
        let response = r#"{"summary": 42, "keyPoints": [], "vulnerabilities": []}"#;
        assert!(parse_insights(response).is_err());
    }

    #[test]
    fn missing_vulnerabilities_fails_validation() {
        let response = r#"{"summary": "ok", "keyPoints": []}"#;
        assert!(parse_insights(response).is_err());
    }

    #[test]
    fn parses_patch_plan() {
        let response = r#"```json
{
  "patches": [
    {
      "vulnerability": "Outdated nginx",
      "severity": "High",
      "remediation": "Upgrade to the latest stable release",
      "complexity": "Low",
      "dependencies": [],
      "testing_required": true,
      "critical_system": false
    }
  ],
  "deployment_strategy": "Rolling upgrade",
  "testing_requirements": ["Smoke test after upgrade"],
  "estimated_timeline": "2 hours"
}
```"#;
        let plan = parse_patch_plan(response).unwrap();
        assert_eq!(plan.patches.len(), 1);
        assert_eq!(plan.deployment_strategy.as_deref(), Some("Rolling upgrade"));
    }

    #[test]
    fn patch_plan_without_patches_array_fails() {
        assert!(parse_patch_plan(r#"{"deployment_strategy": "none"}"#).is_err());
    }

    #[tokio::test]
    async fn normalize_degrades_without_credential() {
        let client = InsightsClient::new(&config_without_key());
        let insights = client.normalize("+ Server: nginx").await;
        assert!(insights.vulnerabilities.is_empty());
        assert!(insights.key_points.is_empty());
        assert!(insights.summary.contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn patches_degrade_without_credential() {
        let client = InsightsClient::new(&config_without_key());
        let plan = client.recommend_patches(&[], "raw").await;
        assert!(plan.patches.is_empty());
        assert!(plan.error.is_some());
    }
}
