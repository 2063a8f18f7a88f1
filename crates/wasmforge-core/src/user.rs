//! `UserRef`: a read-only snapshot of a user's identity and quota counters,
//! resolved by an external identity service the core only consumes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;
use crate::Result;

/// Subscription tier, drives the limits in the quota table (spec §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Free,
    TierMid,
    TierTop,
}

impl std::str::FromStr for Tier {
    type Err = crate::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "free" => Ok(Tier::Free),
            "tier_mid" => Ok(Tier::TierMid),
            "tier_top" => Ok(Tier::TierTop),
            other => Err(crate::Error::InvalidInput(format!("unknown tier: {other}"))),
        }
    }
}

/// A rolling 30-day counter for a rate-limited action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageCounter {
    pub count: i64,
    /// `-1` means unbounded.
    pub limit: i64,
    pub reset_at: DateTime<Utc>,
}

impl UsageCounter {
    pub fn unbounded(reset_at: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            limit: -1,
            reset_at,
        }
    }
}

/// Snapshot of a user's identity and quota state, as resolved by the
/// external identity/billing service. The core never owns this data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
    pub id: ResourceId,
    pub tier: Tier,
    pub deploy_counter: UsageCounter,
    pub function_test_counter: UsageCounter,
}

/// External collaborator: resolves user identity/tier/counters.
/// Implemented outside the core (auth/billing is out of scope, §1).
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: ResourceId) -> Result<UserRef>;
}
