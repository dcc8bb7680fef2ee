//! Telemetry configuration from environment variables.

use std::env;

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name stamped on the startup event
    pub service_name: String,

    /// Filter directive (`info`, `pv_04_lifecycle=debug,info`, ...)
    pub log_level: String,

    /// JSON lines instead of human-readable output
    pub json_logs: bool,

    /// Include file and line in JSON output
    pub source_locations: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "provenance".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            source_locations: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `PV_SERVICE_NAME`: Service name (default: provenance)
    /// - `PV_LOG_LEVEL` or `RUST_LOG`: Filter directive (default: info)
    /// - `PV_JSON_LOGS`: JSON output (default: false, true inside containers)
    /// - `PV_LOG_SOURCE`: Include file/line in JSON output (default: false)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self::from_lookup(|key| env::var(key).ok(), is_container)
    }

    pub(crate) fn from_lookup<F>(lookup: F, is_container: bool) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            service_name: lookup("PV_SERVICE_NAME").unwrap_or(defaults.service_name),
            log_level: lookup("PV_LOG_LEVEL")
                .or_else(|| lookup("RUST_LOG"))
                .unwrap_or(defaults.log_level),
            json_logs: lookup("PV_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(is_container),
            source_locations: lookup("PV_LOG_SOURCE")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.source_locations),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
