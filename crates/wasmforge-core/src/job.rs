//! The `Job` aggregate: compile/deploy jobs and their terminal results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::ResourceId;

/// Kind of job this record tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Compile,
    Deploy,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Compile => "compile",
            JobType::Deploy => "deploy",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compile" => Ok(JobType::Compile),
            "deploy" => Ok(JobType::Deploy),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown job type: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a job. Monotone except that an at-least-once
/// redelivery may re-observe `Active` before a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Active,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Active => "active",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(JobStatus::Queued),
            "active" => Ok(JobStatus::Active),
            "completed" => Ok(JobStatus::Completed),
            "failed" => Ok(JobStatus::Failed),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown job status: {other}"
            ))),
        }
    }
}

/// Kind of a single log line. `Debug` is used only for internal
/// classification noise and is never surfaced past the runner boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Info,
    Warning,
    Error,
    Success,
    Debug,
}

/// A single log line, as captured from a runner and fanned out on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub kind: LogKind,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    pub fn new(kind: LogKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Which compile backend actually produced the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompileBackend {
    Native,
    Container,
    Stub,
}

/// Result of a successful compile job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileResult {
    pub wasm_bytes: Vec<u8>,
    pub wasm_filename: String,
    pub backend_used: CompileBackend,
}

/// Network a deploy targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    Testnet,
    Mainnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Mainnet => "mainnet",
        }
    }
}

impl std::str::FromStr for Network {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "testnet" => Ok(Network::Testnet),
            "mainnet" => Ok(Network::Mainnet),
            other => Err(crate::Error::InvalidInput(format!(
                "unknown network: {other}"
            ))),
        }
    }
}

/// Result of a successful deploy job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResult {
    pub contract_id: String,
    pub network: Network,
    pub signer_identity: String,
    pub signer_address: String,
}

/// Type-specific terminal payload of a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JobResult {
    Compile(CompileResult),
    Deploy(DeployResult),
}

/// The durable record tracking one compile or deploy job end to end.
///
/// Invariant: `status == Completed` implies `result.is_some() && error.is_none()`.
/// Invariant: `status == Failed` implies `error.is_some()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: ResourceId,
    pub job_type: JobType,
    pub status: JobStatus,
    pub owner_id: ResourceId,
    pub project_id: ResourceId,
    pub broker_handle: String,
    pub result: Option<JobResult>,
    pub error: Option<String>,
    /// Bounded tail of the most recent log records (see `AppendLogs`, §4.4).
    pub logs: Vec<LogRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    pub fn new(owner_id: ResourceId, project_id: ResourceId, job_type: JobType) -> Self {
        let id = ResourceId::new();
        let now = Utc::now();
        Self {
            id,
            job_type,
            status: JobStatus::Queued,
            owner_id,
            project_id,
            broker_handle: format!("{}-{}", job_type.as_str(), id),
            result: None,
            error: None,
            logs: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_handle_is_stable_per_job() {
        let job = Job::new(ResourceId::new(), ResourceId::new(), JobType::Compile);
        assert!(job.broker_handle.starts_with("compile-"));
        assert!(job.broker_handle.ends_with(&job.id.to_string()));
    }

    #[test]
    fn terminal_statuses() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Active.is_terminal());
    }

    #[test]
    fn job_type_round_trips_through_str() {
        use std::str::FromStr;
        assert_eq!(JobType::from_str("compile").unwrap(), JobType::Compile);
        assert_eq!(JobType::from_str("deploy").unwrap(), JobType::Deploy);
        assert!(JobType::from_str("bogus").is_err());
    }
}
