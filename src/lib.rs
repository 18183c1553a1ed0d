pub mod analysis;
pub mod config;
pub mod handlers;
pub mod mcp;
pub mod models;
pub mod state;

use axum::routing::{get, post};
use axum::{Json, Router};
use utoipa::OpenApi;

use state::AppState;

#[derive(OpenApi)]
#[openapi(
    info(title = "Berkeley AI 25 - GitHub Issue Analysis API", description = "Structured analysis of GitHub issues"),
    paths(
        handlers::root,
        handlers::health,
        handlers::analyze,
        handlers::extract_response,
    ),
    components(schemas(
        models::RootResponse,
        models::HealthResponse,
        models::AnalyzeRequest,
        analysis::GitHubIssueAnalysis,
        analysis::IssueSummary,
        analysis::FileInfo,
        analysis::EntryKind,
        analysis::KeySection,
        analysis::Analysis,
        models::ExtractRequest,
        models::ExtractResponse,
    )),
    tags(
        (name = "system", description = "Banner and health"),
        (name = "analysis", description = "Issue analysis"),
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/analyze", post(handlers::analyze))
        .route("/api/extract", post(handlers::extract_response))
        .route("/api-docs/openapi.json", get(openapi_json))
        .with_state(state)
}
