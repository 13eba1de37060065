//! Service banner and health routes.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use crate::state::{AppState, JobStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// GET /: service banner.
async fn root(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "Legal Document Intelligence API",
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "analysis_type": "Legal Document Analysis",
        "model_configured": state.analyzer_config.is_configured(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

/// GET /health: job and store counters.
async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let (active_jobs, total_jobs) = {
        let jobs = state.jobs.read();
        let active = jobs
            .values()
            .filter(|j| j.status == JobStatus::Processing)
            .count();
        (active, jobs.len())
    };

    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "active_jobs": active_jobs,
        "total_jobs": total_jobs,
        "stored_documents": state.store().len(),
    }))
}
