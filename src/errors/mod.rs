//! Error taxonomy: request-level errors mapped to HTTP responses and
//! per-tool execution errors that never abort a whole scan.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// JSON error body returned for every failed request.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Request-level error type mapping to HTTP status codes.
///
/// Only validation failures and total tool failure surface as request
/// errors; per-tool and collaborator failures degrade instead (see
/// [`ToolError`] and the insights/store services).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Scanning local or private networks is not allowed")]
    PrivateNetwork,

    #[error("Scanning privileged ports (0-1024) is not allowed")]
    PrivilegedPort,

    #[error("All scans failed: {}", .0.join("; "))]
    AllToolsFailed(Vec<String>),

    #[error("Too many scan requests, please try again later.")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Check if this error represents a not-found condition.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::PrivateNetwork | AppError::PrivilegedPort => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            AppError::AllToolsFailed(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                )
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Failure of a single tool within a scan.
///
/// Captured per tool and folded into the scan's `errors` list; never
/// propagated as a request failure unless every selected tool failed.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool selected: {0}")]
    UnknownTool(String),

    #[error("Sudo access not properly configured")]
    Privilege,

    #[error("Scan timed out after {0} seconds")]
    Timeout(u64),

    #[error("Scan output exceeded the {0} byte limit")]
    OutputTooLarge(usize),

    #[error("No hosts were found up during the scan. The target might be blocking our probes.")]
    NoResults,

    #[error("Failed to resolve target domain: {0}")]
    Resolve(String),

    #[error("Failed to execute scan: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn validation_maps_to_bad_request() {
        let (status, body) =
            body_json(AppError::Validation("Target URL is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Target URL is required");
    }

    #[tokio::test]
    async fn all_tools_failed_lists_each_reason() {
        let err = AppError::AllToolsFailed(vec![
            "nikto: Scan timed out after 600 seconds".into(),
            "nuclei: No hosts were found up during the scan. The target might be blocking our probes.".into(),
        ]);
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with("All scans failed:"));
        assert!(message.contains("nikto"));
        assert!(message.contains("nuclei"));
    }

    #[tokio::test]
    async fn internal_error_is_not_leaked() {
        let (status, body) = body_json(AppError::Internal("pool exhausted".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "An internal error occurred");
    }

    #[tokio::test]
    async fn rate_limited_maps_to_429() {
        let (status, _) = body_json(AppError::RateLimited).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }

    #[test]
    fn app_error_is_not_found() {
        assert!(AppError::NotFound("Scan not found.".into()).is_not_found());
        assert!(!AppError::PrivateNetwork.is_not_found());
    }

    #[test]
    fn tool_error_display() {
        assert_eq!(
            ToolError::UnknownTool("masscan".into()).to_string(),
            "Unknown tool selected: masscan"
        );
        assert_eq!(
            ToolError::Timeout(600).to_string(),
            "Scan timed out after 600 seconds"
        );
    }
}
