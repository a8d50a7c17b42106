//! optsig replay driver.
//!
//! Main application that feeds chat message records through the pipeline:
//! - Configuration loading (TOML, env, CLI)
//! - JSON-lines record input from a file or stdin
//! - Classification, context resolution and symbol composition
//! - JSON-lines instruction output

pub mod app;
pub mod config;
pub mod error;

pub use app::{Application, InstructionLine, RunStats};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
