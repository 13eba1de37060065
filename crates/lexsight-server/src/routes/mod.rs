//! HTTP route handlers.

pub mod analyze;
pub mod assist;
pub mod health;
pub mod jobs;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::StatusCode;
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the main Axum router with all routes.
pub fn build_router(state: Arc<AppState>) -> Router {
    let body_limit = state.config.max_upload_bytes;
    Router::new()
        .merge(health::routes())
        .merge(analyze::routes())
        .merge(jobs::routes())
        .merge(assist::routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `{ "error": { "code", "message" } }` response.
pub(crate) fn error_response(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    (
        status,
        Json(serde_json::json!({
            "error": {
                "code": code,
                "message": message.into(),
            }
        })),
    )
}

pub(crate) fn job_not_found(job_id: &str) -> (StatusCode, Json<serde_json::Value>) {
    error_response(
        StatusCode::NOT_FOUND,
        "job_not_found",
        format!("Job {} not found", job_id),
    )
}
