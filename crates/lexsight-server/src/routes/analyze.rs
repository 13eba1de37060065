//! Document submission routes: synchronous analysis, background upload and
//! collection ranking.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use lexsight_core::{mime_for_extension, DocumentInput, Error};
use lexsight_extract::FileType;
use lexsight_runtime::Submission;
use tracing::{info, warn};

use super::error_response;
use crate::jobs;
use crate::state::{AnalysisJob, AppState, JobKind, JobRequest};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/analyze-legal-documents", post(analyze_documents))
        .route("/upload-pdfs", post(upload_pdfs))
        .route("/process-collection", post(process_collection))
}

/// Files and text fields read from a multipart submission.
struct SubmissionForm {
    files: Vec<DocumentInput>,
    persona: Option<String>,
    job_to_be_done: Option<String>,
}

impl SubmissionForm {
    fn into_submission(self) -> Submission {
        Submission::new(
            self.files,
            self.persona.as_deref(),
            self.job_to_be_done.as_deref(),
        )
    }
}

async fn read_form(mut multipart: Multipart) -> Result<SubmissionForm, Response> {
    let mut form = SubmissionForm {
        files: Vec::new(),
        persona: None,
        job_to_be_done: None,
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(
                    error_response(e.status(), "invalid_upload", e.body_text()).into_response()
                );
            }
        };

        let field_name = field.name().unwrap_or("").to_string();
        let file_name = field.file_name().map(sanitize_filename);
        let content_type = field.content_type().map(str::to_string);

        let bytes = field.bytes().await.map_err(|e| {
            error_response(e.status(), "invalid_upload", e.body_text()).into_response()
        })?;

        match (field_name.as_str(), file_name) {
            (_, Some(name)) => {
                let mime = match content_type.as_deref() {
                    Some(ct) if ct != "application/octet-stream" => ct.to_string(),
                    _ => {
                        let ext = std::path::Path::new(&name)
                            .extension()
                            .map(|e| e.to_string_lossy().to_lowercase())
                            .unwrap_or_default();
                        mime_for_extension(&ext).to_string()
                    }
                };
                form.files.push(DocumentInput::new(name, mime, bytes.to_vec()));
            }
            ("persona", None) => form.persona = Some(String::from_utf8_lossy(&bytes).into_owned()),
            ("job_to_be_done", None) => {
                form.job_to_be_done = Some(String::from_utf8_lossy(&bytes).into_owned())
            }
            _ => {}
        }
    }

    validate_files(&form.files)?;
    Ok(form)
}

fn validate_files(files: &[DocumentInput]) -> Result<(), Response> {
    if files.is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "no_files", "No files uploaded").into_response());
    }
    for file in files {
        if FileType::detect(file) == FileType::Unknown {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "unsupported_file_type",
                format!("File {} is not a PDF or plain text document", file.name),
            )
            .into_response());
        }
    }
    Ok(())
}

/// POST /analyze-legal-documents: analyze immediately and return the result.
async fn analyze_documents(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };
    let submission = form.into_submission();

    let job_id = uuid::Uuid::new_v4().to_string();
    state.insert_job(AnalysisJob::new(
        job_id.clone(),
        submission.file_names(),
        &submission.persona,
        &submission.job_to_be_done,
    ));

    match jobs::run_job(&state, &job_id, JobKind::Analysis, submission).await {
        Ok(()) => match state.get_job(&job_id) {
            Some(job) => (
                StatusCode::OK,
                Json(serde_json::json!({
                    "job_id": job.job_id,
                    "status": job.status,
                    "created_at": job.created_at,
                    "completed_at": job.completed_at,
                    "result": job.result,
                })),
            )
                .into_response(),
            None => error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "job_missing",
                "Job was removed before its result could be returned",
            )
            .into_response(),
        },
        Err(e) => {
            let body = jobs::job_error(&e, std::time::Duration::from_secs(state.config.job_timeout_secs));
            error_response(status_for(&e), &body.code, body.message).into_response()
        }
    }
}

fn status_for(e: &Error) -> StatusCode {
    match e {
        Error::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        Error::NoFiles => StatusCode::BAD_REQUEST,
        Error::Cancelled => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// POST /upload-pdfs: save the files and queue a background analysis.
async fn upload_pdfs(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    queue_upload(&state, multipart, JobKind::Analysis).await
}

/// POST /process-collection: save the files and queue a background
/// relevance ranking across all of them.
async fn process_collection(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    queue_upload(&state, multipart, JobKind::Collection).await
}

async fn queue_upload(state: &AppState, multipart: Multipart, kind: JobKind) -> Response {
    let form = match read_form(multipart).await {
        Ok(form) => form,
        Err(response) => return response,
    };

    let job_id = uuid::Uuid::new_v4().to_string();
    let file_names: Vec<String> = form.files.iter().map(|f| f.name.clone()).collect();

    let mut file_paths = Vec::with_capacity(form.files.len());
    for file in &form.files {
        let path = state
            .config
            .data_paths
            .uploads
            .join(format!("{}_{}", job_id, file.name));
        if let Err(e) = std::fs::write(&path, &file.bytes) {
            warn!("Failed to save upload {}: {}", file.name, e);
            for saved in &file_paths {
                let _ = std::fs::remove_file(saved);
            }
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "io_error",
                format!("Failed to save {}: {}", file.name, e),
            )
            .into_response();
        }
        file_paths.push(path);
    }

    let submission = form.into_submission();
    state.insert_job(
        AnalysisJob::new(
            job_id.clone(),
            file_names.clone(),
            &submission.persona,
            &submission.job_to_be_done,
        )
        .with_kind(kind),
    );

    let request = JobRequest {
        job_id: job_id.clone(),
        kind,
        file_paths,
        persona: submission.persona,
        job_to_be_done: submission.job_to_be_done,
    };
    if state.job_tx.send(request).is_err() {
        state.jobs.write().remove(&job_id);
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "queue_unavailable",
            "Background job worker is not running",
        )
        .into_response();
    }

    info!("Queued {:?} job {} for {:?}", kind, job_id, file_names);

    let message = match kind {
        JobKind::Analysis => format!("Processing {} legal documents for analysis", file_names.len()),
        JobKind::Collection => format!("Ranking sections across {} documents", file_names.len()),
    };
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "job_id": job_id,
            "status": "accepted",
            "message": message,
            "files": file_names,
            "analysis_type": kind.analysis_type(),
        })),
    )
        .into_response()
}

fn sanitize_filename(name: &str) -> String {
    // Remove directory components
    let name = name.replace(['/', '\\'], "").replace("..", "");

    std::path::Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("unnamed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_strips_paths() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_filename("C:\\docs\\lease.pdf"), "C:docslease.pdf");
        assert_eq!(sanitize_filename("lease.pdf"), "lease.pdf");
        assert_eq!(sanitize_filename(".."), "unnamed");
    }

    #[test]
    fn test_rejects_unknown_types() {
        let files = vec![DocumentInput::new("photo.png", "image/png", vec![1, 2, 3])];
        assert!(validate_files(&files).is_err());
        assert!(validate_files(&[]).is_err());
        let files = vec![DocumentInput::from_text("notes.txt", "hi")];
        assert!(validate_files(&files).is_ok());
    }
}
