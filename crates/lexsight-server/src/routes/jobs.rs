//! Job status routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use super::{error_response, job_not_found};
use crate::state::{AnalysisJob, AppState, JobStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs))
        .route("/job/{job_id}", get(get_job).delete(delete_job))
        .route("/job/{job_id}/result", get(get_job_result))
}

/// GET /jobs: all jobs, newest first.
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let jobs = state.jobs.read();
    let mut all_jobs: Vec<&AnalysisJob> = jobs.values().collect();
    all_jobs.sort_by(|a, b| b.queued_at.cmp(&a.queued_at));

    let summaries: Vec<serde_json::Value> = all_jobs
        .iter()
        .map(|job| {
            serde_json::json!({
                "job_id": job.job_id,
                "status": job.status,
                "files": job.files,
                "created_at": job.created_at,
                "completed_at": job.completed_at,
            })
        })
        .collect();

    Json(serde_json::json!({
        "jobs": summaries,
        "total": summaries.len(),
    }))
}

/// GET /job/{job_id}: status, plus the result or error once finished.
async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.get_job(&job_id) {
        Some(job) => (StatusCode::OK, Json(serde_json::json!(job))),
        None => job_not_found(&job_id),
    }
}

/// GET /job/{job_id}/result: the analysis of a completed job.
async fn get_job_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let Some(job) = state.get_job(&job_id) else {
        return job_not_found(&job_id);
    };

    match (job.status, job.result) {
        (JobStatus::Completed, Some(result)) => (StatusCode::OK, Json(serde_json::json!(result))),
        (status, _) => error_response(
            StatusCode::BAD_REQUEST,
            "job_not_completed",
            format!("Job is not completed yet. Current status: {}", status.as_str()),
        ),
    }
}

/// DELETE /job/{job_id}: remove a job and its stored analysis.
async fn delete_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    let removed = {
        let mut jobs = state.jobs.write();
        match jobs.get(&job_id).map(|j| j.status) {
            None => return job_not_found(&job_id),
            Some(JobStatus::Processing) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "job_processing",
                    "Cannot delete job that is currently processing",
                );
            }
            Some(_) => jobs.remove(&job_id),
        }
    };

    if let Some(record_id) = removed.and_then(|job| job.record_id) {
        state.store().remove(&record_id);
    }
    info!("Deleted job {}", job_id);

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "message": format!("Job {} deleted successfully", job_id),
        })),
    )
}
