//! Worker process entrypoint. Consumes one queue (`compile` or `deploy`,
//! selected by `WORKER_TYPE`) and runs jobs to completion (spec §4.8, §9).

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use wasmforge_bus::Bus;
use wasmforge_config::{Config, WorkerType};
use wasmforge_db::{PgAuditSink, PgJobRepo, PgUsageCounterRepo};
use wasmforge_queue::JobQueue;
use wasmforge_worker::{handle_compile, handle_deploy, CompilePayload, DeployPayload, WorkerDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    let worker_type = config.require_worker_type()?;

    info!(?worker_type, "starting wasmforge worker");

    let store_pool = wasmforge_db::create_pool(&config.store_uri).await?;
    wasmforge_db::run_migrations(&store_pool).await?;

    let queue_pool = wasmforge_queue::create_pool(&config.store_uri).await?;
    wasmforge_queue::run_migrations(&queue_pool).await?;

    let bus = Arc::new(Bus::connect(&config.broker.url()).await?);
    let queue = Arc::new(JobQueue::new(queue_pool));

    let deps = Arc::new(WorkerDeps {
        job_repo: Arc::new(PgJobRepo::new(store_pool.clone())),
        usage_counter_repo: Arc::new(PgUsageCounterRepo::new(store_pool.clone())),
        audit_sink: Arc::new(PgAuditSink::new(store_pool.clone())),
        bus,
        scratch_root: PathBuf::from(std::env::var("WASMFORGE_SCRATCH_DIR").unwrap_or_else(|_| "/tmp".into())),
        compile_image: std::env::var("COMPILE_IMAGE")
            .unwrap_or_else(|_| wasmforge_compiler::DEFAULT_COMPILE_IMAGE.to_string()),
    });

    let worker_id = format!("{}-{}", worker_type_str(worker_type), uuid::Uuid::now_v7());

    let retention_queue = queue.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(3600));
        loop {
            interval.tick().await;
            if let Err(e) = retention_queue.sweep_retention().await {
                error!(error = %e, "retention sweep failed");
            }
        }
    });

    match worker_type {
        WorkerType::Compile => {
            queue
                .consume("compile", &worker_id, config.compile_worker_concurrency, move |job| {
                    let deps = deps.clone();
                    async move {
                        let payload: CompilePayload =
                            serde_json::from_value(job.payload).map_err(|e| e.to_string())?;
                        handle_compile(deps, payload).await
                    }
                })
                .await;
        }
        WorkerType::Deploy => {
            queue
                .consume("deploy", &worker_id, config.deploy_worker_concurrency, move |job| {
                    let deps = deps.clone();
                    async move {
                        let payload: DeployPayload =
                            serde_json::from_value(job.payload).map_err(|e| e.to_string())?;
                        handle_deploy(deps, payload).await
                    }
                })
                .await;
        }
    }

    Ok(())
}

fn worker_type_str(worker_type: WorkerType) -> &'static str {
    match worker_type {
        WorkerType::Compile => "compile",
        WorkerType::Deploy => "deploy",
    }
}
