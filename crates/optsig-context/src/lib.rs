//! Context resolution for optsig.
//!
//! Completes instructions that name only part of an instrument by borrowing
//! the missing fields from an earlier message, the quoted message, or an
//! open position, then runs the full per-record pipeline.
//!
//! # Key Components
//!
//! - [`HistoryBuffer`]: Append-only log of resolved messages with per-record scan cursors
//! - [`DonorSearch`]: Same-thread and recency walks over the buffer
//! - [`ContextResolver`]: Ordered strategies (history, refer, recent, positions)
//! - [`OpenPositions`]: Trait for the open-positions store, with [`PositionBook`]
//! - [`InstructionPipeline`]: Classify, resolve and compose one record at a time

pub mod donor;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod positions;
pub mod resolver;

pub use donor::{is_eligible, Donor, DonorSearch};
pub use error::{ContextError, ContextResult};
pub use history::{HistoryBuffer, HistoryEntry, ScanCursor};
pub use pipeline::InstructionPipeline;
pub use positions::{OpenPosition, OpenPositions, PositionBook};
pub use resolver::{ContextResolver, ResolverSettings, DEFAULT_RECENT_WINDOW};
