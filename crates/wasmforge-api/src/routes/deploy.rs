//! `POST /deploy` (spec §4.9): identical admission flow to compile, plus
//! quota enforcement (deploys are rate-limited by tier).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;

use wasmforge_core::job::{JobType, LogKind, LogRecord, Network};
use wasmforge_core::quota::QuotaAction;
use wasmforge_core::ResourceId;
use wasmforge_db::CounterKind;
use wasmforge_queue::EnqueueOpts;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DeployRequest {
    pub project_id: ResourceId,
    pub wasm_base64: String,
    pub network: Network,
    #[serde(default)]
    pub wallet_info: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct DeployResponse {
    pub success: bool,
    pub job_id: ResourceId,
    pub status: &'static str,
    pub logs: Vec<LogRecord>,
}

pub async fn deploy(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<DeployRequest>,
) -> Result<(StatusCode, Json<DeployResponse>), ApiError> {
    if req.wasm_base64.is_empty() {
        return Err(ApiError::BadInput("wasm_base64 must not be empty".to_string()));
    }

    let user = state.user_directory.get_user(user_id).await?;
    let project = state.project_directory.get_project(req.project_id).await?;
    if project.owner_id != user_id {
        return Err(ApiError::Forbidden(
            "project is not owned by this caller".to_string(),
        ));
    }

    let decision = state.quota_gate.admit(&user, QuotaAction::Deploy);
    if let Some((_, reset_counter)) = decision.reset.clone() {
        if let Err(e) = state
            .usage_counter_repo
            .reset(user_id, CounterKind::Deploy, reset_counter)
            .await
        {
            tracing::warn!(user_id = %user_id, error = %e, "failed to persist quota window reset");
        }
    }
    if !decision.admitted {
        return Err(ApiError::QuotaExceeded {
            current: decision.current.unwrap_or_default(),
            limit: decision.limit.unwrap_or_default(),
        });
    }

    let job = state
        .job_repo
        .create(user_id, req.project_id, JobType::Deploy)
        .await?;

    let payload = json!({
        "project_id": req.project_id,
        "wasm_base64": req.wasm_base64,
        "network": req.network,
        "job_id": job.id,
        "user_id": user_id,
        "wallet_info": req.wallet_info,
    });

    state
        .queue
        .enqueue("deploy", &job.broker_handle, payload, EnqueueOpts::default())
        .await?;

    let seed = LogRecord::new(LogKind::Info, "job queued");
    Ok((
        StatusCode::ACCEPTED,
        Json(DeployResponse {
            success: true,
            job_id: job.id,
            status: "queued",
            logs: vec![seed],
        }),
    ))
}
