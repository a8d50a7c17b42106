//! Per-record classify → resolve → compose pipeline.

use std::time::Instant;

use chrono::NaiveDateTime;
use optsig_core::{Instruction, MessageRecord, SymbolComposer, TickerOrigin};
use optsig_parser::Classifier;
use optsig_telemetry::Metrics;
use tracing::{debug, info};

use crate::history::HistoryBuffer;
use crate::resolver::ContextResolver;

/// Owns the history buffer and runs every record through the three stages.
///
/// Records must be fed in arrival order.
pub struct InstructionPipeline {
    classifier: Classifier,
    resolver: ContextResolver,
    composer: SymbolComposer,
    history: HistoryBuffer,
}

impl InstructionPipeline {
    #[must_use]
    pub fn new(resolver: ContextResolver, composer: SymbolComposer, history: HistoryBuffer) -> Self {
        Self {
            classifier: Classifier::new(),
            resolver,
            composer,
            history,
        }
    }

    /// Process one record.
    ///
    /// The record's own timestamp is the reference time for relative
    /// expiries; `received_at` stands in when it has none. A record id seen
    /// before returns the instruction already produced for it.
    pub fn process(&mut self, record: MessageRecord, received_at: NaiveDateTime) -> Instruction {
        if let Some(index) = self.history.index_of(&record.id) {
            if let Some(entry) = self.history.get(index) {
                debug!(record_id = %record.id, index, "Duplicate record, returning stored instruction");
                return entry.instruction.clone();
            }
        }

        let start = Instant::now();
        let as_of = record.timestamp.or(Some(received_at));

        let classified = self.classifier.classify_detailed(&record.text, as_of);
        let candidate = classified.instruction;
        Metrics::classified(candidate.action.name());
        if candidate.ticker_origin == Some(TickerOrigin::Sniffed) {
            Metrics::ticker_sniffed();
        }

        let resolved = self.resolver.resolve(candidate, &record, &mut self.history);

        let had_symbol = resolved.canonical_symbol.is_some();
        let instruction = self.composer.apply(resolved, as_of);
        if instruction.is_instrument_bearing() {
            let outcome = match (had_symbol, instruction.canonical_symbol.is_some()) {
                (true, _) => "passthrough",
                (false, true) => "composed",
                (false, false) => "unresolved",
            };
            Metrics::symbol(outcome);
        }

        info!(
            record_id = %record.id,
            action = %instruction.action,
            shape = classified.shape.unwrap_or("-"),
            symbol = instruction.canonical_symbol.as_ref().map_or("-", |s| s.as_str()),
            source = instruction.source_of_completion().map_or("-", |s| s.as_str()),
            "Processed record"
        );

        let index = self.history.append(record, instruction.clone());
        Metrics::record_latency(start.elapsed().as_secs_f64() * 1_000_000.0);
        debug!(index, "Appended to history");
        instruction
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn resolver(&self) -> &ContextResolver {
        &self.resolver
    }

    pub fn composer(&self) -> SymbolComposer {
        self.composer
    }
}
