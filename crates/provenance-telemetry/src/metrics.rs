//! Prometheus metrics for the provenance service.
//!
//! All metrics follow the naming convention: `pv_<component>_<metric>_<unit>`

use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, Histogram, HistogramOpts, HistogramVec, IntCounter, Opts,
    Registry, TextEncoder,
};
use std::time::Instant;

use crate::TelemetryError;

const LATENCY_BUCKETS: &[f64] = &[
    0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // LIFECYCLE METRICS
    // =========================================================================

    /// Fingerprints anchored and committed locally
    pub static ref DOCUMENTS_UPLOADED: IntCounter = IntCounter::new(
        "pv_lifecycle_documents_uploaded_total",
        "Total documents anchored on the ledger and recorded locally"
    ).expect("metric creation failed");

    /// Fingerprints revoked and removed locally
    pub static ref DOCUMENTS_REVOKED: IntCounter = IntCounter::new(
        "pv_lifecycle_documents_revoked_total",
        "Total documents revoked on the ledger and removed locally"
    ).expect("metric creation failed");

    /// Ledger failures by operation and kind
    pub static ref LEDGER_FAILURES: CounterVec = CounterVec::new(
        Opts::new("pv_ledger_failures_total", "Ledger failures by operation and kind"),
        &["operation", "kind"]  // operation: upload/revoke/verify, kind: rpc/reverted/timeout/...
    ).expect("metric creation failed");

    /// Time from submission to receipt
    pub static ref LEDGER_WRITE_DURATION: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "pv_ledger_write_duration_seconds",
            "Time spent submitting and confirming a ledger transaction"
        ).buckets(LATENCY_BUCKETS.to_vec()),
        &["operation"]
    ).expect("metric creation failed");

    // =========================================================================
    // RECONCILER METRICS
    // =========================================================================

    /// Intents closed by the reconciler, by outcome
    pub static ref INTENTS_RECONCILED: CounterVec = CounterVec::new(
        Opts::new("pv_reconciler_intents_total", "Intents resolved by the reconciler"),
        &["outcome"]  // outcome: registered/revoked/already_applied/reverted/abandoned/error
    ).expect("metric creation failed");

    /// Intents still waiting on the ledger after the last pass
    pub static ref INTENTS_PENDING: Gauge = Gauge::new(
        "pv_reconciler_intents_pending",
        "Open intents left pending after the last reconciliation pass"
    ).expect("metric creation failed");

    // =========================================================================
    // HTTP METRICS
    // =========================================================================

    /// Requests by route and status
    pub static ref HTTP_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("pv_http_requests_total", "HTTP requests by route and status"),
        &["method", "route", "status"]
    ).expect("metric creation failed");

    /// Request latency by route
    pub static ref HTTP_REQUEST_DURATION: Histogram = Histogram::with_opts(
        HistogramOpts::new(
            "pv_http_request_duration_seconds",
            "Time spent handling HTTP requests"
        ).buckets(LATENCY_BUCKETS.to_vec())
    ).expect("metric creation failed");

    /// Live sessions
    pub static ref ACTIVE_SESSIONS: Gauge = Gauge::new(
        "pv_sessions_active",
        "Number of live login sessions"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Safe to call more than once; metrics already registered are skipped.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        // Lifecycle
        Box::new(DOCUMENTS_UPLOADED.clone()),
        Box::new(DOCUMENTS_REVOKED.clone()),
        Box::new(LEDGER_FAILURES.clone()),
        Box::new(LEDGER_WRITE_DURATION.clone()),
        // Reconciler
        Box::new(INTENTS_RECONCILED.clone()),
        Box::new(INTENTS_PENDING.clone()),
        // HTTP
        Box::new(HTTP_REQUESTS.clone()),
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(ACTIVE_SESSIONS.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }
    Ok(())
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsEncode(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsEncode(e.to_string()))
}

/// Content type for [`encode_metrics`] output.
pub fn metrics_content_type() -> String {
    TextEncoder::new().format_type().to_string()
}

/// Timer guard for automatic histogram observation.
pub struct HistogramTimer {
    histogram: Histogram,
    start: Instant,
}

impl HistogramTimer {
    /// Start a new timer for the given histogram.
    pub fn new(histogram: &Histogram) -> Self {
        Self {
            histogram: histogram.clone(),
            start: Instant::now(),
        }
    }
}

impl Drop for HistogramTimer {
    fn drop(&mut self) {
        self.histogram.observe(self.start.elapsed().as_secs_f64());
    }
}

/// Start timing for a histogram. Observation happens on drop.
#[macro_export]
macro_rules! time_histogram {
    ($histogram:expr) => {
        $crate::metrics::HistogramTimer::new(&$histogram)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_twice_is_ok() {
        register_metrics().unwrap();
        register_metrics().unwrap();
    }

    #[test]
    fn test_encoded_text_contains_counters() {
        register_metrics().unwrap();
        DOCUMENTS_UPLOADED.inc();
        LEDGER_FAILURES.with_label_values(&["upload", "timeout"]).inc();

        let text = encode_metrics().unwrap();
        assert!(text.contains("pv_lifecycle_documents_uploaded_total"));
        assert!(text.contains("pv_ledger_failures_total"));
        assert!(text.contains("kind=\"timeout\""));
    }

    #[test]
    fn test_histogram_timer_observes_on_drop() {
        let before = HTTP_REQUEST_DURATION.get_sample_count();
        {
            let _timer = time_histogram!(HTTP_REQUEST_DURATION);
        }
        assert_eq!(HTTP_REQUEST_DURATION.get_sample_count(), before + 1);
    }
}
