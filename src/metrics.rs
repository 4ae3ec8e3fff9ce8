/// Metrics Module - Prometheus Instrumentation
///
/// Fetch volume, per-address outcomes, upstream latency and the size of the
/// currently visible set. Label values are fixed small sets (request kind,
/// outcome, error kind); addresses never become labels.

use lazy_static::lazy_static;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Once;
use std::time::Instant;

/// Standard latency buckets for histograms (seconds)
const LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    /// Fetch invocations by request kind
    /// Labels: kind (single, list, xpub, invalid, import)
    pub static ref FETCH_REQUESTS: IntCounterVec = IntCounterVec::new(
        Opts::new("rustyutxo_fetch_requests_total", "Fetch invocations by request kind"),
        &["kind"]
    ).unwrap();

    /// Single-address fetch results
    /// Labels: outcome (ok, network, decoding, api, ...)
    pub static ref ADDRESS_FETCHES: IntCounterVec = IntCounterVec::new(
        Opts::new("rustyutxo_address_fetches_total", "Single-address fetch results by outcome"),
        &["outcome"]
    ).unwrap();

    /// Esplora request latency
    pub static ref ESPLORA_REQUEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new("rustyutxo_esplora_request_duration_seconds", "Esplora UTXO request latency")
            .buckets(LATENCY_BUCKETS.to_vec())
    ).unwrap();

    /// Results dropped because a newer request was issued first
    pub static ref SUPERSEDED_RESULTS: IntCounter = IntCounter::new(
        "rustyutxo_superseded_results_total",
        "Fetch results discarded because a newer request superseded them"
    ).unwrap();

    /// UTXOs in the current filtered view
    pub static ref VISIBLE_UTXOS: IntGauge = IntGauge::new(
        "rustyutxo_visible_utxos",
        "UTXOs in the current filtered view"
    ).unwrap();
}

static INIT: Once = Once::new();

/// Registers all metrics with the global registry. Safe to call repeatedly.
pub fn init_metrics() {
    INIT.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(FETCH_REQUESTS.clone()),
            Box::new(ADDRESS_FETCHES.clone()),
            Box::new(ESPLORA_REQUEST_DURATION.clone()),
            Box::new(SUPERSEDED_RESULTS.clone()),
            Box::new(VISIBLE_UTXOS.clone()),
        ];
        for collector in collectors {
            if let Err(e) = REGISTRY.register(collector) {
                tracing::warn!(error = %e, "Failed to register metric");
            }
        }
    });
}

/// Gather metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

pub fn increment_fetch_requests(kind: &str) {
    FETCH_REQUESTS.with_label_values(&[kind]).inc();
}

pub fn increment_address_fetches(outcome: &str) {
    ADDRESS_FETCHES.with_label_values(&[outcome]).inc();
}

pub fn record_esplora_request_duration(duration_secs: f64) {
    ESPLORA_REQUEST_DURATION.observe(duration_secs);
}

pub fn increment_superseded_results() {
    SUPERSEDED_RESULTS.inc();
}

pub fn set_visible_utxos(count: usize) {
    VISIBLE_UTXOS.set(count as i64);
}

/// Timer for measuring durations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_metrics_twice() {
        init_metrics();
        init_metrics();
    }

    #[test]
    fn test_gather_metrics() {
        init_metrics();

        increment_fetch_requests("list");
        increment_address_fetches("ok");
        set_visible_utxos(3);

        let output = gather_metrics();

        assert!(output.contains("rustyutxo_fetch_requests_total"));
        assert!(output.contains("rustyutxo_address_fetches_total"));
        assert!(output.contains("rustyutxo_visible_utxos"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::new();
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(timer.elapsed_secs() >= 0.01);
    }
}
