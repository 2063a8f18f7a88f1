//! Queue Adapter (C1): enqueue/consume job payloads with retry, backoff,
//! a concurrency cap, and lease-based at-least-once redelivery. Built on
//! `SELECT ... FOR UPDATE SKIP LOCKED` claims over a Postgres table.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::backoff::next_backoff;
use crate::{QueueError, QueueResult};

const DEFAULT_MAX_ATTEMPTS: i32 = 3;
const DEFAULT_LEASE_SECS: i64 = 300;
const POLL_INTERVAL: StdDuration = StdDuration::from_millis(500);

/// Options for a single `enqueue` call.
#[derive(Debug, Clone, Default)]
pub struct EnqueueOpts {
    pub max_attempts: Option<i32>,
}

/// A claimed row handed to the consumer's handler.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QueuedJob {
    pub id: uuid::Uuid,
    pub queue_name: String,
    pub broker_handle: String,
    pub payload: serde_json::Value,
    pub attempts: i32,
    pub max_attempts: i32,
}

/// Postgres-backed queue adapter. One instance is shared across the
/// process (spec §9 "Singleton services to process-wide state").
pub struct JobQueue {
    pool: PgPool,
    lease_secs: i64,
}

impl JobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lease_secs: DEFAULT_LEASE_SECS,
        }
    }

    /// `Enqueue(queue, payload, opts) -> handle` (spec §4.1).
    pub async fn enqueue(
        &self,
        queue_name: &str,
        broker_handle: &str,
        payload: serde_json::Value,
        opts: EnqueueOpts,
    ) -> QueueResult<String> {
        let max_attempts = opts.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let result = sqlx::query(
            r#"
            INSERT INTO job_queue (id, queue_name, broker_handle, payload, max_attempts)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(queue_name)
        .bind(broker_handle)
        .bind(&payload)
        .bind(max_attempts)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(broker_handle.to_string()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(QueueError::Duplicate(broker_handle.to_string()))
            }
            Err(e) => Err(QueueError::Database(e)),
        }
    }

    /// Claim up to one payload, reclaiming expired leases as pending.
    async fn claim(&self, queue_name: &str, worker_id: &str) -> QueueResult<Option<QueuedJob>> {
        let job = sqlx::query_as::<_, QueuedJob>(
            r#"
            UPDATE job_queue
            SET status = 'claimed', claimed_by = $2, claimed_at = NOW(), attempts = attempts + 1
            WHERE id = (
                SELECT id FROM job_queue
                WHERE queue_name = $1
                  AND (
                    (status = 'pending' AND next_attempt_at <= NOW())
                    OR (status = 'claimed' AND claimed_at < NOW() - make_interval(secs => $3))
                  )
                ORDER BY created_at ASC
                FOR UPDATE SKIP LOCKED
                LIMIT 1
            )
            RETURNING id, queue_name, broker_handle, payload, attempts, max_attempts
            "#,
        )
        .bind(queue_name)
        .bind(worker_id)
        .bind(self.lease_secs as f64)
        .fetch_optional(&self.pool)
        .await?;
        Ok(job)
    }

    async fn ack(&self, job_id: uuid::Uuid) -> QueueResult<()> {
        sqlx::query("UPDATE job_queue SET status = 'completed', completed_at = NOW() WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn nack(&self, job: &QueuedJob) -> QueueResult<()> {
        if job.attempts >= job.max_attempts {
            sqlx::query("UPDATE job_queue SET status = 'failed', completed_at = NOW() WHERE id = $1")
                .bind(job.id)
                .execute(&self.pool)
                .await?;
            return Ok(());
        }

        let delay = next_backoff(job.attempts);
        let next_attempt_at: DateTime<Utc> = Utc::now() + delay;

        sqlx::query(
            "UPDATE job_queue SET status = 'pending', next_attempt_at = $2 WHERE id = $1",
        )
        .bind(job.id)
        .bind(next_attempt_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `Consume(queue, handler, concurrency)`: polls for claimable payloads
    /// and dispatches up to `concurrency` handlers in flight on this
    /// instance. Runs until the process is asked to shut down; callers
    /// typically run this inside a `tokio::select!` against a shutdown
    /// signal.
    pub async fn consume<F, Fut>(
        self: Arc<Self>,
        queue_name: &str,
        worker_id: &str,
        concurrency: usize,
        handler: F,
    ) where
        F: Fn(QueuedJob) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let handler = Arc::new(handler);

        loop {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => return,
            };

            match self.claim(queue_name, worker_id).await {
                Ok(Some(job)) => {
                    let queue = self.clone();
                    let handler = handler.clone();
                    info!(job_id = %job.id, broker_handle = %job.broker_handle, "claimed payload");

                    tokio::spawn(async move {
                        let _permit = permit;
                        match handler(job.clone()).await {
                            Ok(()) => {
                                if let Err(e) = queue.ack(job.id).await {
                                    error!(job_id = %job.id, error = %e, "failed to ack");
                                }
                            }
                            Err(msg) => {
                                warn!(job_id = %job.id, error = %msg, "handler failed, nacking");
                                if let Err(e) = queue.nack(&job).await {
                                    error!(job_id = %job.id, error = %e, "failed to nack");
                                }
                            }
                        }
                    });
                }
                Ok(None) => {
                    drop(permit);
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
                Err(e) => {
                    drop(permit);
                    error!(error = %e, "claim failed");
                    tokio::time::sleep(POLL_INTERVAL).await;
                }
            }
        }
    }

    /// Reaps retained rows past their retention window (spec §4.1:
    /// completed 24h/cap 1000, failed 7d). Intended to run on a periodic
    /// tick from the binary's main loop.
    pub async fn sweep_retention(&self) -> QueueResult<()> {
        sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE status = 'completed' AND completed_at < NOW() - INTERVAL '24 hours'
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE status = 'failed' AND completed_at < NOW() - INTERVAL '7 days'
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            DELETE FROM job_queue
            WHERE id IN (
                SELECT id FROM job_queue
                WHERE status = 'completed'
                ORDER BY completed_at DESC
                OFFSET 1000
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
