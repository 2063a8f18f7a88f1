//! Worker Loop (C8): dequeues compile/deploy payloads, transitions job
//! states, invokes the compile or deploy runner, and persists results
//! (spec §4.8).

pub mod handler;
pub mod payload;

pub use handler::{handle_compile, handle_deploy, WorkerDeps};
pub use payload::{CompilePayload, DeployPayload};
