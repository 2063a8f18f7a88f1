//! Worker Loop (C8): the state machine a dequeued payload drives through
//! (spec §4.8).
//!
//! ```text
//! queued -> active -> completed
//!                 \-> failed
//! ```

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};
use wasmforge_bus::Bus;
use wasmforge_core::hooks::{AuditOutcome, AuditSink};
use wasmforge_core::job::{CompileResult, DeployResult, JobResult, JobStatus, JobType, LogRecord};
use wasmforge_core::ResourceId;
use wasmforge_db::{CounterKind, JobRepo, UsageCounterRepo};

use crate::payload::{CompilePayload, DeployPayload};

/// Shared dependencies a worker process needs to run either handler.
pub struct WorkerDeps {
    pub job_repo: Arc<dyn JobRepo>,
    pub usage_counter_repo: Arc<dyn UsageCounterRepo>,
    pub audit_sink: Arc<dyn AuditSink>,
    pub bus: Arc<Bus>,
    pub scratch_root: PathBuf,
    pub compile_image: String,
}

/// Appends to an in-memory tail, persists it to the store, and publishes
/// each line to the bus (spec §4.8 step 3). Every emit is persisted; the
/// spec allows throttling but the log volumes here don't need it.
struct LogSink {
    job_id: ResourceId,
    job_repo: Arc<dyn JobRepo>,
    bus: Arc<Bus>,
    tail: Mutex<Vec<LogRecord>>,
}

impl LogSink {
    fn new(job_id: ResourceId, job_repo: Arc<dyn JobRepo>, bus: Arc<Bus>) -> Self {
        Self {
            job_id,
            job_repo,
            bus,
            tail: Mutex::new(Vec::new()),
        }
    }

    /// Emits one line: appends to the in-process vector, spawns a
    /// fire-and-forget store write and bus publish. Runner callbacks are
    /// synchronous (`FnMut`), so persistence happens on a detached task;
    /// ordering per job is preserved because each task is spawned in
    /// arrival order and the store/bus both apply writes as they arrive.
    fn emit(self: &Arc<Self>, log: LogRecord) {
        let tail_snapshot = {
            let mut tail = self.tail.lock().expect("log tail mutex poisoned");
            tail.push(log.clone());
            tail.clone()
        };

        let job_repo = self.job_repo.clone();
        let bus = self.bus.clone();
        let job_id = self.job_id;
        tokio::spawn(async move {
            if let Err(e) = job_repo.append_logs(job_id, &tail_snapshot).await {
                warn!(job_id = %job_id, error = %e, "append_logs failed");
            }
            if let Err(e) = bus.publish_log(job_id, &log).await {
                warn!(job_id = %job_id, error = %e, "bus publish_log failed (best-effort)");
            }
        });
    }

    fn snapshot(&self) -> Vec<LogRecord> {
        self.tail.lock().expect("log tail mutex poisoned").clone()
    }
}

/// Step 1: idempotency check. Returns `true` if the job is already
/// terminal and the caller should ack without re-running.
async fn already_terminal(job_repo: &Arc<dyn JobRepo>, job_id: ResourceId) -> bool {
    match job_repo.get(job_id).await {
        Ok(job) => job.status.is_terminal(),
        // Store unavailable after enqueue (spec §4.10): ack and move on,
        // the write-once pattern has no state left to protect.
        Err(e) => {
            warn!(job_id = %job_id, error = %e, "job not found on dequeue, acking as no-op");
            true
        }
    }
}

pub async fn handle_compile(deps: Arc<WorkerDeps>, payload: CompilePayload) -> Result<(), String> {
    let job_id = payload.job_id;

    if already_terminal(&deps.job_repo, job_id).await {
        return Ok(());
    }

    if let Err(e) = deps.job_repo.mark_active(job_id).await {
        return Err(format!("mark_active failed: {e}"));
    }
    let _ = deps
        .bus
        .publish_status(job_id, JobStatus::Active, None)
        .await;

    let sink = Arc::new(LogSink::new(job_id, deps.job_repo.clone(), deps.bus.clone()));
    sink.emit(LogRecord::new(
        wasmforge_core::job::LogKind::Info,
        "compile job started",
    ));

    let compile_result = {
        let sink = sink.clone();
        wasmforge_compiler::compile(
            &deps.scratch_root,
            &job_id.to_string(),
            &payload.files,
            &deps.compile_image,
            move |log| sink.emit(log),
        )
        .await
    };

    match compile_result {
        Ok(result) => {
            info!(job_id = %job_id, backend = ?result.backend_used, "compile succeeded");
            finish_compile_success(&deps, job_id, result).await
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "compile failed");
            finish_failure(&deps, job_id, JobType::Compile, payload.user_id, e.to_string(), sink.snapshot()).await;
            Err(e.to_string())
        }
    }
}

async fn finish_compile_success(
    deps: &Arc<WorkerDeps>,
    job_id: ResourceId,
    result: CompileResult,
) -> Result<(), String> {
    let job_result = JobResult::Compile(result);
    match deps.job_repo.complete(job_id, job_result.clone()).await {
        Ok(_) => {
            // Compiles are unbounded; no counter increment (spec §4.8 step 5).
            let _ = deps
                .bus
                .publish_status(job_id, JobStatus::Completed, Some(job_result))
                .await;
            Ok(())
        }
        Err(e) => Err(format!("complete write failed: {e}")),
    }
}

pub async fn handle_deploy(deps: Arc<WorkerDeps>, payload: DeployPayload) -> Result<(), String> {
    use base64::Engine as _;

    let job_id = payload.job_id;

    if already_terminal(&deps.job_repo, job_id).await {
        return Ok(());
    }

    if let Err(e) = deps.job_repo.mark_active(job_id).await {
        return Err(format!("mark_active failed: {e}"));
    }
    let _ = deps
        .bus
        .publish_status(job_id, JobStatus::Active, None)
        .await;

    let sink = Arc::new(LogSink::new(job_id, deps.job_repo.clone(), deps.bus.clone()));
    sink.emit(LogRecord::new(
        wasmforge_core::job::LogKind::Info,
        "deploy job started",
    ));

    let wasm_bytes = match base64::engine::general_purpose::STANDARD.decode(&payload.wasm_base64) {
        Ok(bytes) => bytes,
        Err(e) => {
            let message = format!("invalid base64 wasm payload: {e}");
            sink.emit(LogRecord::new(wasmforge_core::job::LogKind::Error, message.clone()));
            finish_failure(&deps, job_id, JobType::Deploy, payload.user_id, message.clone(), sink.snapshot()).await;
            return Err(message);
        }
    };

    let deploy_result = {
        let sink = sink.clone();
        wasmforge_deployer::deploy(
            &deps.scratch_root,
            &job_id.to_string(),
            &payload.project_id.to_string(),
            &wasm_bytes,
            payload.network,
            move |log| sink.emit(log),
        )
        .await
    };

    match deploy_result {
        Ok(result) => {
            info!(job_id = %job_id, contract_id = %result.contract_id, "deploy succeeded");
            finish_deploy_success(&deps, job_id, payload.user_id, result).await
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "deploy failed");
            finish_failure(&deps, job_id, JobType::Deploy, payload.user_id, e.to_string(), sink.snapshot()).await;
            Err(e.to_string())
        }
    }
}

async fn finish_deploy_success(
    deps: &Arc<WorkerDeps>,
    job_id: ResourceId,
    owner_id: ResourceId,
    result: DeployResult,
) -> Result<(), String> {
    let job_result = JobResult::Deploy(result);
    let completed = deps.job_repo.complete(job_id, job_result.clone()).await;

    match completed {
        Ok(_) => {
            let _ = deps
                .bus
                .publish_status(job_id, JobStatus::Completed, Some(job_result))
                .await;

            // Side effects (C10): counter increment and audit are
            // best-effort and must never revert the terminal status.
            if let Err(e) = deps.usage_counter_repo.increment(owner_id, CounterKind::Deploy).await {
                warn!(job_id = %job_id, error = %e, "deploy counter increment failed (best-effort)");
            }
            deps.audit_sink
                .record(job_id, owner_id, JobType::Deploy, AuditOutcome::Succeeded)
                .await;
            Ok(())
        }
        Err(e) => Err(format!("complete write failed: {e}")),
    }
}

/// Shared terminal-failure path for both job types (spec §4.8 step 4, 6;
/// §4.10). The `Fail` write happens first no matter what; the function's
/// caller is responsible for re-raising to the broker afterward.
async fn finish_failure(
    deps: &Arc<WorkerDeps>,
    job_id: ResourceId,
    job_type: JobType,
    owner_id: ResourceId,
    error: String,
    logs_tail: Vec<LogRecord>,
) {
    match deps.job_repo.fail(job_id, error, &logs_tail).await {
        Ok(job) => {
            let _ = deps
                .bus
                .publish_status(job_id, JobStatus::Failed, job.result.clone())
                .await;
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "fail write itself failed");
        }
    }

    if job_type == JobType::Deploy {
        deps.audit_sink
            .record(job_id, owner_id, job_type, AuditOutcome::Failed)
            .await;
    }
}
