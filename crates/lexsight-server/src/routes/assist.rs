//! Follow-up routes on a completed analysis: risk review and chat.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use lexsight_analyze::chat::ChatDocument;
use lexsight_analyze::{ChatRequest, RiskLevel};
use lexsight_core::AnalysisResult;

use super::{error_response, job_not_found};
use crate::state::{AnalysisJob, AppState, JobStatus};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/job/{job_id}/risks", post(analyze_risks))
        .route("/job/{job_id}/chat", post(chat))
}

/// A completed job with its result, or the error response to send.
fn completed_job(state: &AppState, job_id: &str) -> Result<(AnalysisJob, AnalysisResult), Response> {
    let job = state
        .get_job(job_id)
        .ok_or_else(|| job_not_found(job_id).into_response())?;
    match (job.status, job.result.clone()) {
        (JobStatus::Completed, Some(result)) => Ok((job, result)),
        (status, _) => Err(error_response(
            StatusCode::BAD_REQUEST,
            "job_not_completed",
            format!("Job is not completed yet. Current status: {}", status.as_str()),
        )
        .into_response()),
    }
}

/// Section titles with their refined analyses, one per line.
fn summarize(result: &AnalysisResult) -> String {
    ChatDocument::from_analysis("", "", result)
        .summary
        .iter()
        .map(|(title, text)| format!("{}: {}", title, text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// POST /job/{job_id}/risks: identify risks in a completed analysis.
async fn analyze_risks(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let (job, result) = match completed_job(&state, &job_id) {
        Ok(found) => found,
        Err(response) => return response,
    };

    let content = job.source_text.as_deref().unwrap_or("");
    let report = state
        .risk_analyzer
        .analyze(job.document_name(), content, &summarize(&result))
        .await;

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "job_id": job.job_id,
            "document": job.document_name(),
            "summary": {
                "total": report.risks.len(),
                "critical": report.count_at_least(RiskLevel::Critical),
                "high_or_above": report.count_at_least(RiskLevel::High),
            },
            "risks": report.risks,
            "fallback": report.fallback,
            "model": report.model,
        })),
    )
        .into_response()
}

/// POST /job/{job_id}/chat: answer a question about a completed analysis.
async fn chat(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> Response {
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "empty_message", "Message is required")
            .into_response();
    }

    let (job, result) = match completed_job(&state, &job_id) {
        Ok(found) => found,
        Err(response) => return response,
    };

    let document = ChatDocument::from_analysis(
        job.document_name(),
        job.source_text.clone().unwrap_or_default(),
        &result,
    );
    let reply = state.chat_assistant.answer(&document, &request).await;

    (StatusCode::OK, Json(serde_json::json!(reply))).into_response()
}
