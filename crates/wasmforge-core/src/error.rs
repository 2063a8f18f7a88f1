//! Error types for wasmforge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("quota exceeded: current={current} limit={limit}")]
    QuotaExceeded { current: i64, limit: i64 },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("required toolchain not found on PATH: {0}")]
    ToolchainMissing(String),

    #[error("compiler exited with a failure: {0}")]
    CompilerFailed(String),

    #[error("compiler produced no wasm artifact")]
    CompilerDidNotProduceArtifact,

    #[error("invalid wasm module: {0}")]
    InvalidWasm(String),

    #[error("deploy output did not contain a contract id")]
    ContractIdNotFound,

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
