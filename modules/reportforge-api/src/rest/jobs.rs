//! Job submission and lifecycle endpoints.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use tracing::{info, warn};

use reportforge_queue::{JobPayload, JobState, JobView};

use crate::AppState;

#[derive(Deserialize)]
pub struct SubmitRequest {
    #[serde(rename = "useCase")]
    use_case: Option<String>,
    email: Option<String>,
    filters: Option<std::collections::HashMap<String, String>>,
}

/// POST /api/v1/jobs — validate and enqueue a report request.
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(body): Json<SubmitRequest>,
) -> impl IntoResponse {
    let Some(use_case) = body.use_case.filter(|u| !u.trim().is_empty()) else {
        return bad_request("useCase is required");
    };
    let Some(email) = body.email.filter(|e| !e.trim().is_empty()) else {
        return bad_request("email is required");
    };
    if !is_email(&email) {
        return bad_request("email is not a valid address");
    }
    if !state.registry.known_use_case(&use_case) {
        return bad_request(&format!("Unknown use case: {use_case}"));
    }

    let payload = JobPayload {
        use_case: use_case.clone(),
        recipient: email,
        filters: body.filters.unwrap_or_default(),
    };

    match state.queue.add(&payload).await {
        Ok(job_id) => {
            info!(job_id = %job_id, use_case = %use_case, "Report job accepted");
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "message": "Report job accepted",
                    "jobId": job_id,
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!(error = %e, "Failed to enqueue job");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "Internal error",
                    "message": "Failed to enqueue report job",
                })),
            )
                .into_response()
        }
    }
}

/// GET /api/v1/jobs/{job_id} — poll a job's lifecycle.
pub async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.queue.job_view(&job_id).await {
        Ok(Some(view)) => (StatusCode::OK, Json(job_response(&view))).into_response(),
        Ok(None) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Job not found" })),
        )
            .into_response(),
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Failed to read job");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// GET /api/v1/jobs/queue/stats
pub async fn queue_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.queue.stats().await {
        Ok(counts) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "stats": {
                    "waiting": counts.waiting,
                    "active": counts.active,
                    "completed": counts.completed,
                    "failed": counts.failed,
                    "delayed": counts.delayed,
                    "total": counts.total,
                    "config": {
                        "concurrency": state.config.queue_concurrency,
                        "maxAttempts": state.queue.options.max_attempts,
                        "workerRunning": state.worker_running.load(Ordering::SeqCst),
                    },
                },
                "timestamp": chrono::Utc::now().to_rfc3339(),
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to read queue stats");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /api/v1/jobs/queue/cleanup — requeue stalled jobs on demand.
pub async fn queue_cleanup(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.queue.requeue_stalled().await {
        Ok(requeued) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "message": "Cleanup complete",
                "requeued": requeued,
            })),
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "Stalled-job cleanup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// POST /api/v1/jobs/{job_id}/retry — requeue a terminally-failed job.
pub async fn retry_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match state.queue.retry_job(&job_id).await {
        Ok(true) => (
            StatusCode::OK,
            Json(serde_json::json!({ "message": "Job requeued", "jobId": job_id })),
        )
            .into_response(),
        Ok(false) => bad_request("Only failed jobs can be retried"),
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "Failed to retry job");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

fn bad_request(message: &str) -> axum::response::Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({ "error": message })),
    )
        .into_response()
}

fn job_response(view: &JobView) -> serde_json::Value {
    serde_json::json!({
        "jobId": view.id,
        "status": public_status(view.state),
        "attempts": view.attempts_made,
        "maxAttempts": view.max_attempts,
        "createdAt": view.created_at,
        "processedOn": view.processed_on,
        "finishedOn": view.finished_on,
        "failedReason": view.failed_reason,
        "result": view.result,
    })
}

/// Collapse internal queue states into the public polling vocabulary.
pub fn public_status(state: JobState) -> &'static str {
    match state {
        JobState::Waiting | JobState::Delayed => "pending",
        JobState::Active => "processing",
        JobState::Completed => "completed",
        JobState::Failed => "failed",
    }
}

/// Same loose shape the notification gateway accepts.
fn is_email(identifier: &str) -> bool {
    identifier.contains('@') && identifier.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_collapses_pending_states() {
        assert_eq!(public_status(JobState::Waiting), "pending");
        assert_eq!(public_status(JobState::Delayed), "pending");
        assert_eq!(public_status(JobState::Active), "processing");
        assert_eq!(public_status(JobState::Completed), "completed");
        assert_eq!(public_status(JobState::Failed), "failed");
    }

    #[test]
    fn email_shape_check() {
        assert!(is_email("a@b.co"));
        assert!(!is_email("not-an-email"));
        assert!(!is_email("missing@tld"));
    }

    #[test]
    fn job_response_includes_lifecycle_fields() {
        let view = JobView {
            id: "7".to_string(),
            payload: reportforge_queue::JobPayload {
                use_case: "POLITICAL_SNAPSHOT".to_string(),
                recipient: "a@b.co".to_string(),
                filters: Default::default(),
            },
            attempts_made: 2,
            max_attempts: 3,
            state: JobState::Failed,
            created_at: 1700000000000,
            processed_on: Some(1700000001000),
            finished_on: Some(1700000002000),
            result: None,
            failed_reason: Some("No view data was successfully fetched".to_string()),
        };
        let body = job_response(&view);
        assert_eq!(body["jobId"], "7");
        assert_eq!(body["status"], "failed");
        assert_eq!(body["attempts"], 2);
        assert_eq!(
            body["failedReason"],
            "No view data was successfully fetched"
        );
    }
}
