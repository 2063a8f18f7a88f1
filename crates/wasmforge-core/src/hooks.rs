//! Audit hook (C10): a side-channel the worker calls on terminal transitions,
//! independent of the job record itself so a slow/failing sink never blocks
//! the state machine.

use async_trait::async_trait;

use crate::id::ResourceId;
use crate::job::JobType;

/// Outcome passed to an audit sink on job completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOutcome {
    Succeeded,
    Failed,
}

/// Receives a best-effort notification after a job reaches a terminal
/// status. Implementations must not be able to fail the job itself;
/// the worker logs and swallows sink errors (spec §4.8, §4.10).
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(
        &self,
        job_id: ResourceId,
        owner_id: ResourceId,
        job_type: JobType,
        outcome: AuditOutcome,
    );
}

/// No-op sink used where no audit destination is configured.
pub struct NullAuditSink;

#[async_trait]
impl AuditSink for NullAuditSink {
    async fn record(
        &self,
        _job_id: ResourceId,
        _owner_id: ResourceId,
        _job_type: JobType,
        _outcome: AuditOutcome,
    ) {
    }
}
