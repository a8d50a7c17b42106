//! Prometheus metrics and structured logging for optsig.
//!
//! - Prometheus metrics for classification, context resolution and symbols
//! - Structured logging with tracing, JSON in production

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, init_logging_with, DEFAULT_FILTER};
pub use metrics::Metrics;
