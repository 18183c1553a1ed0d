// ---------------------------------------------------------------------------
// handlers/ — HTTP boundary
// Sub-modules group handlers by area; mod.rs re-exports them for lib.rs
// routing together with the shared error type.
// ---------------------------------------------------------------------------

// Sub-modules are pub(crate) so utoipa __path_* types are accessible from lib.rs OpenApi derive.
pub(crate) mod analyze;
pub(crate) mod system;

pub use analyze::{analyze, extract_response};
pub use system::{health, root};

pub use analyze::{__path_analyze, __path_extract_response};
pub use system::{__path_health, __path_root};

use axum::http::StatusCode;
use axum::Json;
use serde_json::json;
use uuid::Uuid;

use crate::analysis::IssueUrlError;
use crate::config::ConfigError;
use crate::mcp::McpError;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Centralized API error type for all handlers.
/// Logs full details server-side, returns sanitized JSON to the client.
///
/// ```json
/// { "error": { "code": "BAD_REQUEST", "message": "...", "request_id": "uuid" } }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Upstream(_) => "UPSTREAM_ERROR",
            ApiError::ToolTimeout(_) => "TOOL_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::ToolTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to return to clients. Validation messages are short and
    /// pass through; everything else is replaced by a generic text.
    fn sanitized_message(&self) -> String {
        match self {
            ApiError::BadRequest(m) => format!("Validation error: {m}"),
            ApiError::Upstream(_) => "Upstream service error".to_string(),
            ApiError::ToolTimeout(_) => "Upstream tool timed out".to_string(),
            ApiError::Internal(_) => "Analysis failed".to_string(),
        }
    }
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let request_id = Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                code = self.error_code(),
                "API error ({}): {}",
                status.as_u16(),
                self
            );
        } else {
            tracing::warn!(
                request_id = %request_id,
                code = self.error_code(),
                "API error ({}): {}",
                status.as_u16(),
                self
            );
        }

        let body = json!({
            "error": {
                "code": self.error_code(),
                "message": self.sanitized_message(),
                "request_id": request_id,
            }
        });
        (status, Json(body)).into_response()
    }
}

impl From<IssueUrlError> for ApiError {
    fn from(e: IssueUrlError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<McpError> for ApiError {
    fn from(e: McpError) -> Self {
        match e {
            McpError::Timeout { .. } => ApiError::ToolTimeout(e.to_string()),
            McpError::Connection(_) | McpError::Handshake(_) | McpError::RemoteTool { .. } => {
                ApiError::Upstream(e.to_string())
            }
            McpError::NotConnected | McpError::Protocol(_) => ApiError::Internal(e.to_string()),
        }
    }
}
