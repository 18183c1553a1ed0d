use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::analysis::GitHubIssueAnalysis;

// ---------------------------------------------------------------------------
// Root / Health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Analyze
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeRequest {
    /// e.g. `https://github.com/owner/repo/issues/123`
    pub github_url: String,
}

// ---------------------------------------------------------------------------
// Extract
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractRequest {
    /// Raw agent output; `null` or empty means the agent said nothing.
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExtractResponse {
    /// `null` when the text parsed; otherwise `no_response`, `invalid_json`
    /// or `schema_violation`.
    pub fallback: Option<String>,
    pub analysis: GitHubIssueAnalysis,
}
