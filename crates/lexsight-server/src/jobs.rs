//! Analysis jobs: the background queue worker and the shared run loop
//! used by both the synchronous and the queued endpoints.

use std::sync::Arc;
use std::time::Duration;

use lexsight_core::{DocumentInput, Error, SubmissionTracker};
use lexsight_runtime::Submission;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::state::{AppState, JobError, JobKind, JobRequest, JobStatus};

/// Finished jobs kept in the job table.
const MAX_FINISHED_JOBS: usize = 100;

/// Start the background job worker task.
pub fn start_job_worker(state: Arc<AppState>) {
    let mut rx = match state.take_job_rx() {
        Some(rx) => rx,
        None => {
            error!("Job worker already started");
            return;
        }
    };

    tokio::spawn(async move {
        info!("Background job worker started");
        while let Some(request) = rx.recv().await {
            process_queued_job(&state, request).await;
        }
    });
}

async fn process_queued_job(state: &AppState, request: JobRequest) {
    if state.get_job(&request.job_id).is_none() {
        info!("Job {} was deleted before it started", request.job_id);
        remove_uploads(&request);
        return;
    }

    let mut files = Vec::with_capacity(request.file_paths.len());
    let mut load_error = None;
    for path in &request.file_paths {
        match DocumentInput::from_path(path) {
            Ok(mut doc) => {
                doc.name = original_file_name(&request.job_id, &doc.name);
                files.push(doc);
            }
            Err(e) => {
                load_error = Some(format!("Failed to read {}: {}", path.display(), e));
                break;
            }
        }
    }

    remove_uploads(&request);

    match load_error {
        Some(message) => {
            error!("Job {} failed: {}", request.job_id, message);
            state.update_job(&request.job_id, |job| {
                job.status = JobStatus::Failed;
                job.completed_at = Some(chrono::Utc::now().to_rfc3339());
                job.error = Some(JobError {
                    code: "io_error".into(),
                    message,
                });
            });
            cleanup_old_jobs(state);
        }
        None => {
            let submission = Submission::new(
                files,
                Some(&request.persona),
                Some(&request.job_to_be_done),
            );
            if let Err(e) = run_job(state, &request.job_id, request.kind, submission).await {
                debug!("Queued job {} ended with error: {}", request.job_id, e);
            }
        }
    }
}

fn remove_uploads(request: &JobRequest) {
    for path in &request.file_paths {
        if let Err(e) = std::fs::remove_file(path) {
            debug!("Could not remove upload {}: {}", path.display(), e);
        }
    }
}

/// Run one submission for an existing job, recording the outcome on it.
///
/// The run is cancelled once the configured job timeout elapses.
pub async fn run_job(
    state: &AppState,
    job_id: &str,
    kind: JobKind,
    submission: Submission,
) -> Result<(), Error> {
    state.update_job(job_id, |job| {
        job.status = JobStatus::Processing;
        job.started_at = Some(chrono::Utc::now().to_rfc3339());
    });
    info!("Processing job {}: {:?}", job_id, submission.file_names());

    let timeout = Duration::from_secs(state.config.job_timeout_secs);
    let cancel = CancellationToken::new();
    let timer = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            cancel.cancel();
        })
    };

    let tracker = SubmissionTracker::new();
    let outcome = match kind {
        JobKind::Analysis => state.pipeline.process(submission, &tracker, &cancel).await,
        JobKind::Collection => {
            state
                .pipeline
                .process_collection(submission, &tracker, &cancel)
                .await
        }
    };
    timer.abort();

    let completed_at = chrono::Utc::now().to_rfc3339();
    let result = match outcome {
        Ok(outcome) => {
            info!(
                "Job {} completed ({})",
                job_id, outcome.record.result.processing_info.analysis_type
            );
            let mut kept = false;
            state.update_job(job_id, |job| {
                kept = true;
                job.status = JobStatus::Completed;
                job.completed_at = Some(completed_at);
                job.result = Some(outcome.record.result.clone());
                job.record_id = Some(outcome.record.id.clone());
                job.source_text = outcome.source_text;
            });
            if !kept {
                // Deleted while running.
                state.store().remove(&outcome.record.id);
            }
            Ok(())
        }
        Err(e) => {
            let job_error = job_error(&e, timeout);
            warn!("Job {} failed: {}", job_id, job_error.message);
            state.update_job(job_id, |job| {
                job.status = JobStatus::Failed;
                job.completed_at = Some(completed_at);
                job.error = Some(job_error);
            });
            Err(e)
        }
    };

    cleanup_old_jobs(state);
    result
}

/// API error body for a failed submission.
pub fn job_error(e: &Error, timeout: Duration) -> JobError {
    let (code, message) = match e {
        Error::Extraction(inner) => (inner.code(), format!("{}. {}", inner, inner.user_guidance())),
        Error::NoFiles => ("no_files", e.to_string()),
        Error::Cancelled => (
            "timeout",
            format!("Processing did not finish within {} seconds", timeout.as_secs()),
        ),
        _ => ("processing_failed", e.to_string()),
    };
    JobError {
        code: code.to_string(),
        message,
    }
}

/// Uploads are saved as `{job_id}_{name}`; recover the submitted name.
fn original_file_name(job_id: &str, stored: &str) -> String {
    stored
        .strip_prefix(job_id)
        .and_then(|rest| rest.strip_prefix('_'))
        .unwrap_or(stored)
        .to_string()
}

/// Drop the oldest finished jobs and their stored records past the
/// retention limit.
pub fn cleanup_old_jobs(state: &AppState) {
    let mut jobs = state.jobs.write();
    let mut finished: Vec<(String, i64)> = jobs
        .values()
        .filter(|j| j.status.is_finished())
        .map(|j| (j.job_id.clone(), j.queued_at))
        .collect();

    if finished.len() > MAX_FINISHED_JOBS {
        finished.sort_by_key(|(_, t)| *t);
        let remove_count = finished.len() - MAX_FINISHED_JOBS;
        for (id, _) in finished.into_iter().take(remove_count) {
            if let Some(job) = jobs.remove(&id) {
                if let Some(record_id) = job.record_id {
                    state.store().remove(&record_id);
                }
            }
        }
        debug!("Pruned {} finished jobs", remove_count);
    }
}

pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
