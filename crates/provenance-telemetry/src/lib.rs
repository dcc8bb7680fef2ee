//! # Provenance Telemetry
//!
//! Logging and metrics shared by every crate in the workspace.
//!
//! ## Components
//!
//! | Concern | Tool | Output |
//! |---------|------|--------|
//! | Logs | `tracing-subscriber` | stdout, pretty or JSON lines |
//! | Metrics | `prometheus` | text exposition at `GET /metrics` |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use provenance_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! Filtering follows `EnvFilter` syntax, e.g.
//! `PV_LOG_LEVEL=pv_04_lifecycle=debug,sqlx=warn,info`.

pub mod config;
pub mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{encode_metrics, metrics_content_type, register_metrics, HistogramTimer};

pub use metrics::{
    ACTIVE_SESSIONS, DOCUMENTS_REVOKED, DOCUMENTS_UPLOADED, HTTP_REQUESTS, HTTP_REQUEST_DURATION,
    INTENTS_PENDING, INTENTS_RECONCILED, LEDGER_FAILURES, LEDGER_WRITE_DURATION,
};

use thiserror::Error;

/// Telemetry initialization errors.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{directive}': {reason}")]
    InvalidFilter { directive: String, reason: String },

    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("failed to initialize metrics: {0}")]
    MetricsInit(String),

    #[error("failed to encode metrics: {0}")]
    MetricsEncode(String),
}

/// Register metrics, then install the global log subscriber.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    register_metrics()?;
    init_logging(config)
}

/// Convenience macro for recording a metric increment.
#[macro_export]
macro_rules! metric_inc {
    ($metric:expr) => {
        $metric.inc()
    };
    ($metric:expr, $labels:expr) => {
        $metric.with_label_values($labels).inc()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_inc_macro() {
        let before = INTENTS_RECONCILED.with_label_values(&["abandoned"]).get();
        metric_inc!(INTENTS_RECONCILED, &["abandoned"]);
        assert_eq!(
            INTENTS_RECONCILED.with_label_values(&["abandoned"]).get(),
            before + 1.0
        );
    }
}
