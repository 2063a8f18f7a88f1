//! Repository traits and implementations.

pub mod audit;
pub mod directory;
pub mod job;
pub mod usage_counter;

pub use audit::PgAuditSink;
pub use directory::{PgProjectDirectory, PgUserDirectory};
pub use job::{JobFilter, JobRepo, PgJobRepo};
pub use usage_counter::{CounterKind, PgUsageCounterRepo, UsageCounterRepo};
