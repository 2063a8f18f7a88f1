//! API routes.

pub mod compile;
pub mod deploy;
pub mod health;
pub mod jobs;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::ws::ws_handler;

/// Build the main API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/compile", post(compile::compile))
        .route("/deploy", post(deploy::deploy))
        .route("/jobs/{id}", get(jobs::get_job))
        .route("/jobs", get(jobs::list_jobs))
        .route("/ws", get(ws_handler))
        .merge(health::router())
        .with_state(state)
}
