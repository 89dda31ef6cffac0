//! Scan orchestration: sequential per-tool fan-out with per-tool failure
//! isolation and an at-least-one-success threshold for the request.

use std::net::IpAddr;

use tracing::{error, info};

use crate::errors::{AppError, ToolError};
use crate::models::scan::{ScanContext, ScanInsights, ScanTarget, ToolExecutionResult};
use crate::services::aggregator::{self, AggregatedScan, ToolReport};
use crate::services::executor::ToolRunner;
use crate::services::insights::InsightsClient;
use crate::services::registry::{self, ToolId};

/// Run the selected tools against a validated target, in request order.
///
/// One subprocess at a time; a failing tool never aborts the others. The
/// request as a whole fails only when no tool was selected or every
/// selected tool failed.
pub async fn run_scan(
    ctx: &ScanContext,
    runner: &dyn ToolRunner,
    insights_client: &InsightsClient,
    target: &ScanTarget,
    selected_tools: &[String],
) -> Result<AggregatedScan, AppError> {
    if selected_tools.is_empty() {
        return Err(AppError::Validation(
            "Target URL and at least one tool are required".to_string(),
        ));
    }

    let mut resolved_ip: Option<IpAddr> = None;
    let mut reports = Vec::with_capacity(selected_tools.len());

    for raw_id in selected_tools {
        let report = match raw_id.parse::<ToolId>() {
            Ok(tool) => run_tool(ctx, runner, insights_client, target, tool, &mut resolved_ip).await,
            Err(e) => ToolReport {
                result: ToolExecutionResult::failure(raw_id.clone(), e.to_string()),
                insights: None,
            },
        };
        reports.push(report);
    }

    let merged = aggregator::aggregate(target.url.as_str(), ctx.started_at, &reports);

    if merged.errors.len() == reports.len() {
        error!(target = %target.hostname, "All selected tools failed");
        return Err(AppError::AllToolsFailed(merged.errors));
    }

    Ok(merged)
}

/// Execute one tool and normalize its output. Failures are captured in
/// the report, never propagated.
async fn run_tool(
    ctx: &ScanContext,
    runner: &dyn ToolRunner,
    insights_client: &InsightsClient,
    target: &ScanTarget,
    tool: ToolId,
    resolved_ip: &mut Option<IpAddr>,
) -> ToolReport {
    info!(
        tool = %tool,
        target = %target.hostname,
        user = %ctx.requested_by,
        "Starting tool scan"
    );

    let outcome: Result<String, ToolError> = async {
        if tool.needs_resolved_ip() && resolved_ip.is_none() {
            *resolved_ip = Some(resolve_target(&target.hostname).await?);
        }
        let command = registry::build_command(tool, target, *resolved_ip)?;
        runner.run(&command).await
    }
    .await;

    match outcome {
        Ok(raw_output) => {
            info!(tool = %tool, target = %target.hostname, "Completed tool scan");
            let insights = insights_client.normalize(&raw_output).await;
            ToolReport {
                result: ToolExecutionResult::success(tool.as_str(), raw_output),
                insights: Some(insights),
            }
        }
        Err(e) => {
            error!(tool = %tool, target = %target.hostname, error = %e, "Tool scan failed");
            ToolReport {
                result: ToolExecutionResult::failure(tool.as_str(), e.to_string()),
                insights: None,
            }
        }
    }
}

/// Resolve the target hostname once per scan; privileged scanners take
/// the IP directly.
async fn resolve_target(hostname: &str) -> Result<IpAddr, ToolError> {
    let mut addrs = tokio::net::lookup_host((hostname, 80))
        .await
        .map_err(|e| ToolError::Resolve(e.to_string()))?;
    addrs
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| ToolError::Resolve(format!("no addresses found for {hostname}")))
}

/// Normalize pre-captured tool output (file upload path): the raw text
/// skips the registry/executor and goes straight to the normalizer.
pub async fn analyze_upload(insights_client: &InsightsClient, raw_output: &str) -> ScanInsights {
    insights_client.normalize(raw_output).await
}
