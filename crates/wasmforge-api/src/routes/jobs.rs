//! `GET /jobs/{id}` and `GET /jobs` (spec §4.9, §6): owner-scoped job reads.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use wasmforge_core::job::{Job, JobStatus, JobType};
use wasmforge_core::ResourceId;
use wasmforge_db::JobFilter;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
struct JobView {
    id: ResourceId,
    #[serde(rename = "type")]
    job_type: JobType,
    status: JobStatus,
    project: ResourceId,
    result: Option<wasmforge_core::job::JobResult>,
    error: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<Job> for JobView {
    fn from(job: Job) -> Self {
        Self {
            id: job.id,
            job_type: job.job_type,
            status: job.status,
            project: job.project_id,
            result: job.result,
            error: job.error,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

pub async fn get_job(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(job_id): Path<ResourceId>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let job = state.job_repo.get(job_id).await?;
    if job.owner_id != user_id {
        return Err(ApiError::NotFound(format!("job {job_id}")));
    }

    Ok(Json(json!({
        "success": true,
        "job": JobView::from(job),
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    pub project_id: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub job_type: Option<String>,
    pub limit: Option<i64>,
}

pub async fn list_jobs(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListJobsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let project_id = query
        .project_id
        .as_deref()
        .map(ResourceId::from_str)
        .transpose()
        .map_err(|_| ApiError::BadInput("invalid project_id".to_string()))?;

    let status = query
        .status
        .as_deref()
        .map(JobStatus::from_str)
        .transpose()?;

    let job_type = query
        .job_type
        .as_deref()
        .map(JobType::from_str)
        .transpose()?;

    let jobs = state
        .job_repo
        .list(JobFilter {
            project_id,
            status,
            job_type,
            limit: query.limit.unwrap_or(0),
        })
        .await?;

    let owned: Vec<JobView> = jobs
        .into_iter()
        .filter(|job| job.owner_id == user_id)
        .map(JobView::from)
        .collect();

    Ok(Json(json!({ "success": true, "jobs": owned })))
}
