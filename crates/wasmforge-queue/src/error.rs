//! Queue adapter errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("duplicate broker handle: {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("handler error: {0}")]
    Handler(String),
}

pub type QueueResult<T> = std::result::Result<T, QueueError>;
