//! `POST /compile` (spec §4.9): resolve identity and project ownership,
//! admit through the quota gate, create a queued Job, and dispatch it.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use wasmforge_core::job::{JobType, LogKind, LogRecord};
use wasmforge_core::project::SourceFile;
use wasmforge_core::quota::QuotaAction;
use wasmforge_core::ResourceId;
use wasmforge_queue::EnqueueOpts;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CompileRequest {
    pub project_id: ResourceId,
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Serialize)]
pub struct CompileResponse {
    pub success: bool,
    pub job_id: ResourceId,
    pub status: &'static str,
    pub logs: Vec<LogRecord>,
}

pub async fn compile(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<CompileRequest>,
) -> Result<(StatusCode, Json<CompileResponse>), ApiError> {
    if req.files.is_empty() {
        return Err(ApiError::BadInput("files must not be empty".to_string()));
    }

    let user = state.user_directory.get_user(user_id).await?;
    let project = state.project_directory.get_project(req.project_id).await?;
    if project.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "project is not owned by this caller".to_string(),
        ));
    }

    let decision = state.quota_gate.admit(&user, QuotaAction::Compile);
    if !decision.admitted {
        return Err(ApiError::QuotaExceeded {
            current: decision.current.unwrap_or_default(),
            limit: decision.limit.unwrap_or_default(),
        });
    }

    let job = state
        .job_repo
        .create(user_id, req.project_id, JobType::Compile)
        .await?;

    let payload = json!({
        "project_id": req.project_id,
        "files": req.files,
        "job_id": job.id,
        "user_id": user_id,
    });

    state
        .queue
        .enqueue("compile", &job.broker_handle, payload, EnqueueOpts::default())
        .await?;

    let seed = LogRecord::new(LogKind::Info, "job queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(CompileResponse {
            success: true,
            job_id: job.id,
            status: "queued",
            logs: vec![seed],
        }),
    ))
}
