//! Job Store (C4): durable job records plus a bounded log tail.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use wasmforge_core::job::{Job, JobResult, JobStatus, JobType, LogRecord};
use wasmforge_core::ResourceId;

use crate::{DbError, DbResult};

/// Bounded tail length kept on the `jobs` row; the full stream lives on
/// the bus at event time (spec §4.4).
const LOG_TAIL_CAP: usize = 500;

#[derive(sqlx::FromRow)]
struct JobRow {
    id: uuid::Uuid,
    job_type: String,
    status: String,
    owner_id: uuid::Uuid,
    project_id: uuid::Uuid,
    broker_handle: String,
    result: Option<serde_json::Value>,
    error: Option<String>,
    log_tail: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl JobRow {
    fn into_job(self) -> DbResult<Job> {
        let logs: Vec<LogRecord> = serde_json::from_value(self.log_tail).unwrap_or_default();
        Ok(Job {
            id: ResourceId::from_uuid(self.id),
            job_type: JobType::from_str(&self.job_type)
                .map_err(|e| DbError::Database(sqlx::Error::Decode(Box::new(e))))?,
            status: JobStatus::from_str(&self.status)
                .map_err(|e| DbError::Database(sqlx::Error::Decode(Box::new(e))))?,
            owner_id: ResourceId::from_uuid(self.owner_id),
            project_id: ResourceId::from_uuid(self.project_id),
            broker_handle: self.broker_handle,
            result: self
                .result
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| DbError::Database(sqlx::Error::Decode(Box::new(e))))?,
            error: self.error,
            logs,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Optional filters for `List` (spec §4.9's `GET /jobs`).
#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub project_id: Option<ResourceId>,
    pub status: Option<JobStatus>,
    pub job_type: Option<JobType>,
    pub limit: i64,
}

#[async_trait]
pub trait JobRepo: Send + Sync {
    async fn create(
        &self,
        owner_id: ResourceId,
        project_id: ResourceId,
        job_type: JobType,
    ) -> DbResult<Job>;

    async fn mark_active(&self, job_id: ResourceId) -> DbResult<()>;

    async fn append_logs(&self, job_id: ResourceId, logs: &[LogRecord]) -> DbResult<()>;

    async fn complete(&self, job_id: ResourceId, result: JobResult) -> DbResult<Job>;

    async fn fail(
        &self,
        job_id: ResourceId,
        error: String,
        logs_tail: &[LogRecord],
    ) -> DbResult<Job>;

    async fn get(&self, job_id: ResourceId) -> DbResult<Job>;

    async fn list(&self, filter: JobFilter) -> DbResult<Vec<Job>>;
}

pub struct PgJobRepo {
    pool: PgPool,
}

impl PgJobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn truncate_tail(logs: &[LogRecord]) -> &[LogRecord] {
        if logs.len() > LOG_TAIL_CAP {
            &logs[logs.len() - LOG_TAIL_CAP..]
        } else {
            logs
        }
    }
}

#[async_trait]
impl JobRepo for PgJobRepo {
    async fn create(
        &self,
        owner_id: ResourceId,
        project_id: ResourceId,
        job_type: JobType,
    ) -> DbResult<Job> {
        let job = Job::new(owner_id, project_id, job_type);

        let result = sqlx::query(
            r#"
            INSERT INTO jobs
                (id, job_type, status, owner_id, project_id, broker_handle, log_tail, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(job.id.as_uuid())
        .bind(job.job_type.as_str())
        .bind(job.status.as_str())
        .bind(job.owner_id.as_uuid())
        .bind(job.project_id.as_uuid())
        .bind(&job.broker_handle)
        .bind(serde_json::json!([]))
        .bind(job.created_at)
        .bind(job.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(job),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                DbError::Duplicate(format!("broker_handle {} already exists", job.broker_handle)),
            ),
            Err(e) => Err(DbError::Database(e)),
        }
    }

    async fn mark_active(&self, job_id: ResourceId) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE jobs SET status = 'active', updated_at = NOW()
            WHERE id = $1 AND status = 'queued'
            "#,
        )
        .bind(job_id.as_uuid())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn append_logs(&self, job_id: ResourceId, logs: &[LogRecord]) -> DbResult<()> {
        let tail = Self::truncate_tail(logs);
        let tail_json = serde_json::to_value(tail).map_err(|e| DbError::Database(sqlx::Error::Encode(Box::new(e))))?;

        sqlx::query(
            r#"
            UPDATE jobs SET log_tail = $2, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(tail_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn complete(&self, job_id: ResourceId, result: JobResult) -> DbResult<Job> {
        let existing = self.get(job_id).await?;
        if existing.status.is_terminal() {
            return Ok(existing);
        }

        let result_json =
            serde_json::to_value(&result).map_err(|e| DbError::Database(sqlx::Error::Encode(Box::new(e))))?;

        sqlx::query(
            r#"
            UPDATE jobs SET status = 'completed', result = $2, updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(result_json)
        .execute(&self.pool)
        .await?;

        self.get(job_id).await
    }

    async fn fail(
        &self,
        job_id: ResourceId,
        error: String,
        logs_tail: &[LogRecord],
    ) -> DbResult<Job> {
        let existing = self.get(job_id).await?;
        if existing.status.is_terminal() {
            return Ok(existing);
        }

        let tail = Self::truncate_tail(logs_tail);
        let tail_json = serde_json::to_value(tail).map_err(|e| DbError::Database(sqlx::Error::Encode(Box::new(e))))?;

        sqlx::query(
            r#"
            UPDATE jobs SET status = 'failed', error = $2, log_tail = $3, updated_at = NOW()
            WHERE id = $1 AND status NOT IN ('completed', 'failed')
            "#,
        )
        .bind(job_id.as_uuid())
        .bind(error)
        .bind(tail_json)
        .execute(&self.pool)
        .await?;

        self.get(job_id).await
    }

    async fn get(&self, job_id: ResourceId) -> DbResult<Job> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, job_type, status, owner_id, project_id, broker_handle, result, error, log_tail, created_at, updated_at
            FROM jobs WHERE id = $1
            "#,
        )
        .bind(job_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("job {job_id}")))?;

        row.into_job()
    }

    async fn list(&self, filter: JobFilter) -> DbResult<Vec<Job>> {
        let limit = if filter.limit > 0 { filter.limit } else { 50 };

        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, job_type, status, owner_id, project_id, broker_handle, result, error, log_tail, created_at, updated_at
            FROM jobs
            WHERE ($1::uuid IS NULL OR project_id = $1)
              AND ($2::text IS NULL OR status = $2)
              AND ($3::text IS NULL OR job_type = $3)
            ORDER BY created_at DESC
            LIMIT $4
            "#,
        )
        .bind(filter.project_id.map(|id| id.as_uuid()))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.job_type.map(|t| t.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(JobRow::into_job).collect()
    }
}
