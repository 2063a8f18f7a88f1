//! Core domain types and traits for the wasmforge job lifecycle.
//!
//! This crate contains:
//! - Resource identifiers
//! - The `Job` aggregate and its result/log types
//! - `UserRef`/`ProjectRef` snapshots consumed (not owned) by the core
//! - The quota gate's tier logic
//! - The audit/receipt hook contract
//! - A shared subprocess line-streaming helper used by both runners

pub mod error;
pub mod hooks;
pub mod id;
pub mod job;
pub mod project;
pub mod quota;
pub mod subprocess;
pub mod user;
pub mod wasm;

pub use error::{Error, Result};
pub use id::ResourceId;
pub use job::{CompileResult, DeployResult, Job, JobStatus, JobType, LogKind, LogRecord};
pub use project::{ProjectDirectory, ProjectRef, SourceFile};
pub use quota::{AdmitDecision, Clock, QuotaAction, QuotaGate, SystemClock};
pub use user::{Tier, UsageCounter, UserDirectory, UserRef};
