//! Core domain types for optsig.
//!
//! This crate provides the types shared by the signal pipeline:
//! - `MessageRecord`: One incoming chat message with thread position
//! - `Instruction`: Tagged trading action with instrument identity
//! - `Price`, `Strike`: Precision-safe numeric types
//! - `ExpiryDescriptor`: Expiry as written, dated later
//! - `SymbolComposer`, `CanonicalSymbol`: Deterministic contract identifiers

pub mod decimal;
pub mod error;
pub mod expiry;
pub mod instruction;
pub mod message;
pub mod symbol;
pub mod types;

pub use decimal::{parse_loose_decimal, Price, Strike};
pub use error::{CoreError, Result};
pub use expiry::{ExpiryDescriptor, RelativeTerm};
pub use instruction::{
    Action, CloseScope, Completion, CompletionSource, Instruction, InstrumentIdentity,
    TickerOrigin,
};
pub use message::{parse_timestamp, GroupPosition, MessageRecord};
pub use symbol::{CanonicalSymbol, SymbolComposer, SymbolParts, DEFAULT_WEEKLY_CUTOFF_HOUR};
pub use types::{OptionType, PriceQuote, PriceRange, SellQuantity};
