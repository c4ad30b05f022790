//! Job submission and tracking handlers.
//!
//! Clients submit work, then poll `GET /api/jobs/:job_id/status` until the
//! status turns terminal. The server polls the provider on its own schedule;
//! status reads here never touch a provider.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use reels_models::{Job, JobId, JobKind, JobParams, JobSummary};
use reels_orchestrator::JobArtifact;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Full job view returned by submit and status endpoints.
#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub id: String,
    pub kind: JobKind,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            id: job.id.to_string(),
            kind: job.kind,
            status: job.status.as_str().to_string(),
            external_ref: job.external_ref,
            result: job.result,
            error: job.error,
            created_at: job.created_at.to_rfc3339(),
            updated_at: job.updated_at.to_rfc3339(),
        }
    }
}

/// POST /api/jobs
///
/// Submit work to the matching provider. The job record is returned
/// immediately; completion happens in the background.
///
/// Returns:
/// - 202: Job accepted (status may already be terminal: analysis completes
///   inline, and a failed provider submission comes back as a failed record)
/// - 400: Invalid params
/// - 401: Not authenticated
pub async fn submit_job(
    State(state): State<AppState>,
    user: AuthUser,
    Json(params): Json<JobParams>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    info!("submit_job uid={} kind={}", user.uid, params.kind());

    let job = state.orchestrator.submit(&user.uid, params).await?;

    Ok((StatusCode::ACCEPTED, Json(job.into())))
}

/// GET /api/jobs/:job_id/status
///
/// Current state of one of the caller's jobs. Cheap to poll; reads only the
/// durable record.
///
/// Returns:
/// - 200: Job state
/// - 401: Not authenticated
/// - 404: Unknown job, or a job owned by someone else
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Json<JobResponse>> {
    let job_id = parse_job_id(&job_id)?;
    let job = state.orchestrator.status(&job_id, &user.uid).await?;
    Ok(Json(job.into()))
}

/// Query parameters for the job list endpoint.
#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    /// Restrict to one job kind.
    #[serde(default)]
    pub kind: Option<JobKind>,
}

/// Job list response.
#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub jobs: Vec<JobSummary>,
}

/// GET /api/jobs
///
/// The caller's jobs, newest first, optionally filtered by `?kind=`.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<ListJobsQuery>,
    user: AuthUser,
) -> ApiResult<Json<JobListResponse>> {
    let jobs = state.orchestrator.list(&user.uid, query.kind).await?;
    Ok(Json(JobListResponse {
        jobs: jobs.iter().map(JobSummary::from).collect(),
    }))
}

/// DELETE /api/jobs/:job_id
///
/// Remove a job from the caller's history.
///
/// Returns:
/// - 204: Deleted
/// - 404: Unknown job, or a job owned by someone else
pub async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    user: AuthUser,
) -> ApiResult<StatusCode> {
    let job_id = parse_job_id(&job_id)?;
    state.orchestrator.delete(&user.uid, &job_id).await?;
    info!("delete_job uid={} job_id={}", user.uid, job_id);
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/jobs/:job_id/artifact
///
/// Fetch the output of a completed job. Analysis results come back as JSON,
/// dubbed audio as raw bytes, avatar videos as a provider-hosted URL.
///
/// Returns:
/// - 200: The artifact
/// - 404: Unknown job, or a job owned by someone else
/// - 409: Job has not completed
pub async fn get_job_artifact(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
    user: AuthUser,
) -> ApiResult<Response> {
    let job_id = parse_job_id(&job_id)?;
    let artifact = state.orchestrator.fetch_artifact(&job_id, &user.uid).await?;

    let response = match artifact {
        JobArtifact::Inline(value) => Json(value).into_response(),
        JobArtifact::Media { content_type, data } => {
            ([(header::CONTENT_TYPE, content_type)], data).into_response()
        }
        JobArtifact::Url(url) => Json(json!({ "url": url })).into_response(),
    };
    Ok(response)
}

/// Validate the path segment before it reaches the store.
fn parse_job_id(raw: &str) -> Result<JobId, ApiError> {
    if raw.is_empty() || raw.len() > 64 {
        return Err(ApiError::bad_request("Invalid job ID format"));
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiError::bad_request("Invalid job ID format"));
    }
    Ok(JobId::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_job_ids() {
        assert!(parse_job_id("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(parse_job_id("abc12345").is_ok());
    }

    #[test]
    fn test_invalid_job_ids() {
        assert!(parse_job_id("").is_err());
        assert!(parse_job_id("has space").is_err());
        assert!(parse_job_id("has_underscore").is_err());
        assert!(parse_job_id(&"a".repeat(65)).is_err());
    }
}
