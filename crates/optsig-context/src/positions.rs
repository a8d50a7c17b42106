//! Open-position lookup used as the last completion fallback.
//!
//! The store is read as a snapshot. Writers (an execution component
//! updating fills) may mutate it concurrently; a stale read only makes the
//! fallback less accurate.

use std::path::Path;

use chrono::NaiveDate;
use dashmap::DashMap;
use optsig_core::{CanonicalSymbol, ExpiryDescriptor, InstrumentIdentity, Price};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ContextError, ContextResult};

// ============================================================================
// OpenPosition
// ============================================================================

/// One open option position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenPosition {
    pub symbol: CanonicalSymbol,
    /// Contracts held; `None` when the source does not report it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg_cost: Option<Price>,
}

impl OpenPosition {
    #[must_use]
    pub fn new(symbol: CanonicalSymbol) -> Self {
        Self {
            symbol,
            quantity: None,
            avg_cost: None,
        }
    }

    /// Ticker prefix of the symbol.
    pub fn ticker(&self) -> &str {
        self.symbol.ticker()
    }

    /// Whether the position still holds contracts.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.quantity.map_or(true, |q| q > Decimal::ZERO)
    }

    /// Instrument identity recovered from the symbol.
    pub fn identity(&self) -> Option<InstrumentIdentity> {
        let parts = self.symbol.parts().ok()?;
        Some(InstrumentIdentity {
            ticker: Some(parts.ticker),
            option_type: Some(parts.option_type),
            strike: Some(parts.strike),
            expiry: Some(ExpiryDescriptor::Absolute(parts.expiry)),
        })
    }

    /// Expiry date recovered from the symbol.
    pub fn expiry(&self) -> Option<NaiveDate> {
        self.symbol.parts().ok().map(|p| p.expiry)
    }
}

// ============================================================================
// OpenPositions
// ============================================================================

/// Read-only view of currently open positions.
pub trait OpenPositions: Send + Sync {
    /// Open positions whose symbol carries `ticker` (case-insensitive).
    fn positions_for_ticker(&self, ticker: &str) -> Vec<OpenPosition>;
}

// ============================================================================
// PositionBook
// ============================================================================

/// In-memory position store keyed by canonical symbol.
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: DashMap<CanonicalSymbol, OpenPosition>,
}

impl PositionBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a JSON array of positions.
    pub fn from_snapshot_str(json: &str) -> ContextResult<Self> {
        let positions: Vec<OpenPosition> = serde_json::from_str(json)?;
        let book = Self::new();
        for position in positions {
            book.upsert(position);
        }
        debug!(count = book.len(), "Loaded positions snapshot");
        Ok(book)
    }

    /// Load a JSON array of positions from a file.
    pub fn from_snapshot_file(path: impl AsRef<Path>) -> ContextResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        Self::from_snapshot_str(&content).map_err(|e| match e {
            ContextError::Json(err) => {
                ContextError::InvalidSnapshot(format!("{}: {}", path.display(), err))
            }
            other => other,
        })
    }

    /// Insert or replace a position.
    pub fn upsert(&self, position: OpenPosition) {
        self.positions.insert(position.symbol.clone(), position);
    }

    pub fn remove(&self, symbol: &CanonicalSymbol) -> Option<OpenPosition> {
        self.positions.remove(symbol).map(|(_, p)| p)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl OpenPositions for PositionBook {
    fn positions_for_ticker(&self, ticker: &str) -> Vec<OpenPosition> {
        let mut matches: Vec<OpenPosition> = self
            .positions
            .iter()
            .filter(|entry| entry.ticker().eq_ignore_ascii_case(ticker))
            .filter(|entry| entry.is_open())
            .map(|entry| entry.value().clone())
            .collect();
        matches.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        if matches.len() > 1 {
            warn!(ticker, count = matches.len(), "Multiple open positions for ticker");
        }
        matches
    }
}
