//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Context error: {0}")]
    Context(#[from] optsig_context::ContextError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] optsig_telemetry::TelemetryError),

    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
