//! Persistence for the Quota Gate's (C5) `UsageCounter` rows. The gate
//! itself is a pure function in `wasmforge-core::quota`; this repo is the
//! system of record the worker's C10 hook writes back to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use wasmforge_core::user::UsageCounter;
use wasmforge_core::ResourceId;

use crate::DbResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterKind {
    Deploy,
    FunctionTest,
}

impl CounterKind {
    fn as_str(&self) -> &'static str {
        match self {
            CounterKind::Deploy => "deploy",
            CounterKind::FunctionTest => "function_test",
        }
    }
}

#[derive(sqlx::FromRow)]
struct CounterRow {
    count: i64,
    limit_value: i64,
    reset_at: DateTime<Utc>,
}

#[async_trait]
pub trait UsageCounterRepo: Send + Sync {
    /// Fetch a counter, creating an unbounded zeroed row on first read.
    async fn get_or_init(
        &self,
        user_id: ResourceId,
        kind: CounterKind,
        default_limit: i64,
    ) -> DbResult<UsageCounter>;

    /// Overwrite the counter after a periodic reset (spec §4.5).
    async fn reset(&self, user_id: ResourceId, kind: CounterKind, counter: UsageCounter) -> DbResult<()>;

    /// Increment the counter by one after a terminal success (C10).
    async fn increment(&self, user_id: ResourceId, kind: CounterKind) -> DbResult<()>;
}

pub struct PgUsageCounterRepo {
    pool: PgPool,
}

impl PgUsageCounterRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UsageCounterRepo for PgUsageCounterRepo {
    async fn get_or_init(
        &self,
        user_id: ResourceId,
        kind: CounterKind,
        default_limit: i64,
    ) -> DbResult<UsageCounter> {
        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            INSERT INTO usage_counters (user_id, counter_kind, count, limit_value, reset_at)
            VALUES ($1, $2, 0, $3, NOW())
            ON CONFLICT (user_id, counter_kind) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING count, limit_value, reset_at
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(kind.as_str())
        .bind(default_limit)
        .fetch_one(&self.pool)
        .await?;

        Ok(UsageCounter {
            count: row.count,
            limit: row.limit_value,
            reset_at: row.reset_at,
        })
    }

    async fn reset(&self, user_id: ResourceId, kind: CounterKind, counter: UsageCounter) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE usage_counters SET count = $3, reset_at = $4
            WHERE user_id = $1 AND counter_kind = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(kind.as_str())
        .bind(counter.count)
        .bind(counter.reset_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment(&self, user_id: ResourceId, kind: CounterKind) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE usage_counters SET count = count + 1
            WHERE user_id = $1 AND counter_kind = $2
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(kind.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
