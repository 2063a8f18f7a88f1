//! Minimal Postgres-backed stand-ins for the `UserDirectory` and
//! `ProjectDirectory` external collaborators (spec §1: identity and
//! project CRUD are out of scope for the core). A real deployment points
//! these traits at whatever auth/billing and project services it already
//! runs; this crate's implementation exists so the job lifecycle is
//! runnable end to end without one.

use async_trait::async_trait;
use sqlx::PgPool;
use wasmforge_core::project::{ProjectDirectory, ProjectRef};
use wasmforge_core::user::{Tier, UsageCounter, UserDirectory, UserRef};
use wasmforge_core::{Error, ResourceId, Result};

use crate::repo::usage_counter::{CounterKind, PgUsageCounterRepo, UsageCounterRepo};

fn default_limit(tier: Tier, kind: CounterKind) -> i64 {
    match (tier, kind) {
        (Tier::Free, CounterKind::Deploy) => 5,
        (Tier::TierMid, CounterKind::Deploy) => -1,
        (Tier::TierTop, CounterKind::Deploy) => -1,
        (Tier::Free, CounterKind::FunctionTest) => 2,
        (Tier::TierMid, CounterKind::FunctionTest) => 5,
        (Tier::TierTop, CounterKind::FunctionTest) => -1,
    }
}

pub struct PgUserDirectory {
    pool: PgPool,
    counters: PgUsageCounterRepo,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        let counters = PgUsageCounterRepo::new(pool.clone());
        Self { pool, counters }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn get_user(&self, user_id: ResourceId) -> Result<UserRef> {
        let tier_str: Option<String> = sqlx::query_scalar("SELECT tier FROM directory_users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::Transient(e.to_string()))?;

        let tier: Tier = match tier_str {
            Some(raw) => raw.parse()?,
            None => {
                // First contact with this user: provision a free-tier row.
                sqlx::query(
                    "INSERT INTO directory_users (id, tier) VALUES ($1, 'free') ON CONFLICT (id) DO NOTHING",
                )
                .bind(user_id.as_uuid())
                .execute(&self.pool)
                .await
                .map_err(|e| Error::Transient(e.to_string()))?;
                Tier::Free
            }
        };

        let deploy_counter = self
            .counters
            .get_or_init(user_id, CounterKind::Deploy, default_limit(tier, CounterKind::Deploy))
            .await?;
        let function_test_counter = self
            .counters
            .get_or_init(
                user_id,
                CounterKind::FunctionTest,
                default_limit(tier, CounterKind::FunctionTest),
            )
            .await?;

        Ok(UserRef {
            id: user_id,
            tier,
            deploy_counter,
            function_test_counter,
        })
    }
}

pub struct PgProjectDirectory {
    pool: PgPool,
}

impl PgProjectDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProjectDirectory for PgProjectDirectory {
    async fn get_project(&self, project_id: ResourceId) -> Result<ProjectRef> {
        let owner_id: Option<uuid::Uuid> =
            sqlx::query_scalar("SELECT owner_id FROM directory_projects WHERE id = $1")
                .bind(project_id.as_uuid())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::Transient(e.to_string()))?;

        match owner_id {
            Some(owner) => Ok(ProjectRef {
                id: project_id,
                owner_id: ResourceId::from_uuid(owner),
            }),
            None => Err(Error::NotFound(format!("project {project_id}"))),
        }
    }
}
