//! Ingress API process entrypoint.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wasmforge_api::state::AppState;
use wasmforge_api::ws::SocketHub;
use wasmforge_api::routes;
use wasmforge_bus::Bus;
use wasmforge_core::quota::QuotaGate;
use wasmforge_db::{PgJobRepo, PgProjectDirectory, PgUsageCounterRepo, PgUserDirectory};
use wasmforge_queue::JobQueue;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = wasmforge_config::Config::from_env()?;

    info!("connecting to job store...");
    let store_pool = wasmforge_db::create_pool(&config.store_uri).await?;
    wasmforge_db::run_migrations(&store_pool).await?;

    info!("connecting to queue store...");
    let queue_pool = wasmforge_queue::create_pool(&config.store_uri).await?;
    wasmforge_queue::run_migrations(&queue_pool).await?;

    info!("connecting to broker...");
    let bus = Arc::new(Bus::connect(&config.broker.url()).await?);
    let queue = Arc::new(JobQueue::new(queue_pool));

    let state = AppState {
        job_repo: Arc::new(PgJobRepo::new(store_pool.clone())),
        user_directory: Arc::new(PgUserDirectory::new(store_pool.clone())),
        project_directory: Arc::new(PgProjectDirectory::new(store_pool.clone())),
        usage_counter_repo: Arc::new(PgUsageCounterRepo::new(store_pool.clone())),
        queue,
        bus: bus.clone(),
        socket_hub: Arc::new(SocketHub::new(bus)),
        quota_gate: Arc::new(QuotaGate::default()),
    };

    let cors = build_cors(&config.cors_origins);

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("starting server on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn build_cors(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| o.parse::<HeaderValue>().ok())
        .collect();

    CorsLayer::new().allow_origin(allowed)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("shutdown signal received, draining in-flight requests");
}
