//! Context resolution for incomplete instructions.
//!
//! Strategies run in fixed order and the first donor wins:
//! 1. same thread (buffer walk, then the record's own thread texts)
//! 2. the quoted message
//! 3. recent messages regardless of thread
//! 4. open positions, for a bare ticker only

use std::sync::Arc;

use optsig_core::{Completion, CompletionSource, Instruction, InstrumentIdentity, MessageRecord};
use optsig_parser::Classifier;
use optsig_telemetry::Metrics;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::donor::{Donor, DonorSearch};
use crate::error::{ContextError, ContextResult};
use crate::history::HistoryBuffer;
use crate::positions::OpenPositions;

/// Default number of records the recency walk examines.
pub const DEFAULT_RECENT_WINDOW: usize = 10;

/// Resolver tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Records examined by the recency walk.
    pub recent_window: usize,
    /// Consult open positions when everything else fails.
    pub enable_position_fallback: bool,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            recent_window: DEFAULT_RECENT_WINDOW,
            enable_position_fallback: true,
        }
    }
}

impl ResolverSettings {
    pub fn validate(&self) -> ContextResult<()> {
        if self.recent_window == 0 {
            return Err(ContextError::InvalidSettings(
                "recent_window must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Completes Sell/Close/Modify instructions from context.
pub struct ContextResolver {
    classifier: Classifier,
    donors: DonorSearch,
    settings: ResolverSettings,
    positions: Option<Arc<dyn OpenPositions>>,
}

impl ContextResolver {
    pub fn new(settings: ResolverSettings) -> ContextResult<Self> {
        settings.validate()?;
        Ok(Self {
            classifier: Classifier::new(),
            donors: DonorSearch::new(settings.recent_window),
            settings,
            positions: None,
        })
    }

    /// Attach an open-positions store for the last fallback.
    #[must_use]
    pub fn with_positions(mut self, positions: Arc<dyn OpenPositions>) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    /// Try to complete `candidate` using the record's context.
    ///
    /// Instructions that need no completion are returned unchanged. When no
    /// strategy yields a donor the candidate comes back as it was.
    pub fn resolve(
        &self,
        candidate: Instruction,
        record: &MessageRecord,
        history: &mut HistoryBuffer,
    ) -> Instruction {
        if !candidate.needs_completion() {
            return candidate;
        }

        if record.group_position.continues_thread() {
            let donor = self
                .donors
                .search_thread(&candidate, record, history)
                .or_else(|| {
                    self.donors
                        .search_thread_texts(&self.classifier, &candidate, record)
                });
            if let Some(donor) = donor {
                return complete(candidate, donor, CompletionSource::History, false);
            }
        }

        if let Some(donor) = self.refer_donor(&candidate, record) {
            return complete(candidate, donor, CompletionSource::Refer, false);
        }

        if let Some(donor) = self.donors.search_recent(&candidate, record, history) {
            return complete(candidate, donor, CompletionSource::Recent, false);
        }

        if let Some((donor, ambiguous)) = self.position_donor(&candidate) {
            return complete(candidate, donor, CompletionSource::Positions, ambiguous);
        }

        Metrics::resolution("none");
        debug!(record_id = %record.id, action = %candidate.action, "No donor found");
        candidate
    }

    /// The quoted message, when it classifies as a Buy with ticker and
    /// strike.
    fn refer_donor(&self, candidate: &Instruction, record: &MessageRecord) -> Option<Donor> {
        let quoted = record.quoted_text.as_deref()?.trim();
        if quoted.is_empty() {
            return None;
        }
        let quoted_instruction = self.classifier.classify(quoted, record.timestamp);
        let identity = &quoted_instruction.identity;
        if !quoted_instruction.is_buy() || identity.ticker.is_none() || identity.strike.is_none()
        {
            return None;
        }
        if candidate.identity.ticker.is_some() && !candidate.identity.same_ticker(identity) {
            return None;
        }
        Some(Donor {
            identity: quoted_instruction.identity,
            symbol: None,
            text: quoted.to_string(),
            index: None,
        })
    }

    /// First open position for a bare-ticker candidate, and whether others
    /// matched too.
    fn position_donor(&self, candidate: &Instruction) -> Option<(Donor, bool)> {
        if !self.settings.enable_position_fallback || !candidate.identity.is_bare_ticker() {
            return None;
        }
        let positions = self.positions.as_ref()?;
        let ticker = candidate.ticker()?;

        let mut matches = positions.positions_for_ticker(ticker);
        matches.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        let ambiguous = matches.len() > 1;

        let (position, identity) = matches
            .into_iter()
            .find_map(|p| p.identity().map(|identity| (p, identity)))?;
        if ambiguous {
            Metrics::ambiguous_donor();
            warn!(ticker, symbol = %position.symbol, "Ambiguous position fallback, taking first");
        }
        Some((
            Donor {
                identity,
                symbol: Some(position.symbol.clone()),
                text: position.symbol.as_str().to_string(),
                index: None,
            },
            ambiguous,
        ))
    }
}

/// Same ticker (case-insensitive) and the same remaining fields.
fn same_instrument(a: &InstrumentIdentity, b: &InstrumentIdentity) -> bool {
    a.same_ticker(b) && a.option_type == b.option_type && a.strike == b.strike && a.expiry == b.expiry
}

fn complete(
    mut candidate: Instruction,
    donor: Donor,
    source: CompletionSource,
    ambiguous: bool,
) -> Instruction {
    candidate.identity.fill_missing_from(&donor.identity);
    if candidate.canonical_symbol.is_none() && same_instrument(&candidate.identity, &donor.identity)
    {
        candidate.canonical_symbol = donor.symbol.clone();
    }
    Metrics::resolution(source.as_str());
    debug!(
        source = %source,
        donor_index = ?donor.index,
        ticker = ?candidate.identity.ticker,
        "Completed instruction from context"
    );
    candidate.completion = Some(Completion {
        source,
        donor_text: Some(donor.text),
        ambiguous,
    });
    candidate
}
