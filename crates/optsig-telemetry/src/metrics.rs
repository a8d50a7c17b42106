//! Prometheus metrics for the optsig pipeline.
//!
//! Covers:
//! - Classifier outcomes per action
//! - Heuristic ticker attachments
//! - Which context strategy completed an instruction
//! - Canonical symbol composition outcomes
//! - Per-record pipeline latency
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use crate::error::{TelemetryError, TelemetryResult};
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, CounterVec, Encoder,
    Histogram, IntCounter, TextEncoder,
};

/// Classified messages.
/// Labels: action (BUY/SELL/CLOSE/MODIFY/UNCLASSIFIED)
pub static CLASSIFIED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "optsig_classified_total",
        "Total messages classified, by action",
        &["action"]
    )
    .unwrap()
});

/// Tickers attached by the uppercase-token heuristic.
pub static TICKER_SNIFFED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "optsig_ticker_sniffed_total",
        "Total tickers attached by heuristic sniffing"
    )
    .unwrap()
});

/// Context resolution outcomes.
/// Labels: source (history/refer/recent/positions/none)
pub static RESOLUTION_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "optsig_resolution_total",
        "Total context resolutions, by donor source",
        &["source"]
    )
    .unwrap()
});

/// Position fallbacks that matched more than one open position.
pub static AMBIGUOUS_DONOR_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "optsig_ambiguous_donor_total",
        "Total position fallbacks with more than one candidate"
    )
    .unwrap()
});

/// Canonical symbol outcomes.
/// Labels: outcome (composed/passthrough/unresolved)
pub static SYMBOL_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "optsig_symbol_total",
        "Total canonical symbol outcomes",
        &["outcome"]
    )
    .unwrap()
});

/// Per-record pipeline latency in microseconds.
pub static RECORD_LATENCY_US: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "optsig_record_latency_us",
        "Per-record classify/resolve/compose latency in microseconds",
        vec![10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 10000.0]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a classifier outcome.
    pub fn classified(action: &str) {
        CLASSIFIED_TOTAL.with_label_values(&[action]).inc();
    }

    pub fn ticker_sniffed() {
        TICKER_SNIFFED_TOTAL.inc();
    }

    /// Record which strategy completed an instruction, or "none".
    pub fn resolution(source: &str) {
        RESOLUTION_TOTAL.with_label_values(&[source]).inc();
    }

    pub fn ambiguous_donor() {
        AMBIGUOUS_DONOR_TOTAL.inc();
    }

    /// Record a symbol outcome.
    pub fn symbol(outcome: &str) {
        SYMBOL_TOTAL.with_label_values(&[outcome]).inc();
    }

    pub fn record_latency(latency_us: f64) {
        RECORD_LATENCY_US.observe(latency_us);
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let families = prometheus::gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
