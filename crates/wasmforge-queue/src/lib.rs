//! Brokered queue adapter (C1): named queues, at-least-once dispatch,
//! retry with exponential backoff, and lease-based redelivery.

pub mod backoff;
pub mod error;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use queue::{EnqueueOpts, JobQueue, QueuedJob};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

pub async fn create_pool(database_url: &str) -> QueueResult<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> QueueResult<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
