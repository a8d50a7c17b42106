//! Context error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("Invalid positions snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Invalid resolver settings: {0}")]
    InvalidSettings(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ContextResult<T> = Result<T, ContextError>;
