//! Shared application state for the ingress API (C9) and Socket Hub (C3).

use std::sync::Arc;

use wasmforge_bus::Bus;
use wasmforge_core::project::ProjectDirectory;
use wasmforge_core::quota::QuotaGate;
use wasmforge_core::user::UserDirectory;
use wasmforge_db::{JobRepo, UsageCounterRepo};
use wasmforge_queue::JobQueue;

use crate::ws::SocketHub;

/// Shared application state, injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub job_repo: Arc<dyn JobRepo>,
    pub user_directory: Arc<dyn UserDirectory>,
    pub project_directory: Arc<dyn ProjectDirectory>,
    pub usage_counter_repo: Arc<dyn UsageCounterRepo>,
    pub queue: Arc<JobQueue>,
    pub bus: Arc<Bus>,
    pub socket_hub: Arc<SocketHub>,
    pub quota_gate: Arc<QuotaGate>,
}
