// ---------------------------------------------------------------------------
// handlers/system.rs — Root banner and health check
// ---------------------------------------------------------------------------

use axum::Json;

use crate::models::{HealthResponse, RootResponse};

pub const SERVICE_NAME: &str = "github-issue-analyzer";
pub const BANNER: &str = "Berkeley AI 25 - GitHub Issue Analysis API";

#[utoipa::path(get, path = "/", tag = "system",
    responses((status = 200, description = "Service banner", body = RootResponse))
)]
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: BANNER.to_string(),
    })
}

/// Static payload: the process is up and serving. Identical on every call.
#[utoipa::path(get, path = "/health", tag = "system",
    responses((status = 200, description = "Health check", body = HealthResponse))
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: SERVICE_NAME.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
