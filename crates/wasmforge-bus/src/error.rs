//! Bus errors. All are treated as best-effort: callers log and swallow
//! (spec §4.10 "Bus unavailable").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type BusResult<T> = std::result::Result<T, BusError>;
