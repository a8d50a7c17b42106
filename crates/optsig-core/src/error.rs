//! Error types for optsig-core.

use thiserror::Error;

/// Core error types.
///
/// Only raised when decoding textual forms (symbols, expiry descriptors,
/// prices). An instruction that cannot be completed is a value, not an error.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid canonical symbol: {0}")]
    InvalidSymbol(String),

    #[error("Invalid expiry descriptor: {0}")]
    InvalidExpiry(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
