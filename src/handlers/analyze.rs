// ---------------------------------------------------------------------------
// handlers/analyze.rs — Issue analysis and agent-output extraction
// ---------------------------------------------------------------------------

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::analysis::{self, GitHubIssueAnalysis, IssueRef};
use crate::models::{AnalyzeRequest, ExtractRequest, ExtractResponse};
use crate::state::AppState;

use super::ApiError;

/// POST /analyze — analysis for a GitHub issue URL.
///
/// The agent pipeline is not wired in yet: once the URL validates, the canned
/// analysis is returned whatever issue it names.
#[utoipa::path(post, path = "/analyze", tag = "analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Structured issue analysis", body = GitHubIssueAnalysis),
        (status = 400, description = "Invalid request body or issue URL")
    )
)]
pub async fn analyze(
    payload: Result<Json<AnalyzeRequest>, JsonRejection>,
) -> Result<Json<GitHubIssueAnalysis>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let issue = IssueRef::parse(&req.github_url)?;

    tracing::info!(issue = %issue, "analyze: serving mock analysis");
    Ok(Json(analysis::mock_analysis()))
}

/// POST /api/extract — run raw agent output through the extractor.
#[utoipa::path(post, path = "/api/extract", tag = "analysis",
    request_body = ExtractRequest,
    responses(
        (status = 200, description = "Parsed record or fallback record", body = ExtractResponse),
        (status = 400, description = "Invalid request body")
    )
)]
pub async fn extract_response(
    State(state): State<AppState>,
    payload: Result<Json<ExtractRequest>, JsonRejection>,
) -> Result<Json<ExtractResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let extraction = state.extractor.parse(req.text.as_deref());
    Ok(Json(ExtractResponse {
        fallback: extraction.fallback_reason().map(|r| r.as_str().to_string()),
        analysis: extraction.into_record(),
    }))
}
