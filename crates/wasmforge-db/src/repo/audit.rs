//! Postgres-backed audit sink (C10): appends a terminal-outcome row per
//! deploy job. Sink failures are swallowed by the worker, never the job's
//! terminal status (spec §4.8 step 5, §4.10).

use async_trait::async_trait;
use sqlx::PgPool;
use wasmforge_core::hooks::{AuditOutcome, AuditSink};
use wasmforge_core::job::JobType;
use wasmforge_core::ResourceId;

pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record(
        &self,
        job_id: ResourceId,
        owner_id: ResourceId,
        job_type: JobType,
        outcome: AuditOutcome,
    ) {
        let outcome_str = match outcome {
            AuditOutcome::Succeeded => "succeeded",
            AuditOutcome::Failed => "failed",
        };

        let result = sqlx::query(
            r#"
            INSERT INTO audit_log (id, job_id, owner_id, job_type, outcome)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(job_id.as_uuid())
        .bind(owner_id.as_uuid())
        .bind(job_type.as_str())
        .bind(outcome_str)
        .execute(&self.pool)
        .await;

        if let Err(e) = result {
            tracing::warn!(job_id = %job_id, error = %e, "audit log write failed (best-effort)");
        }
    }
}
