//! # Outbound Ports
//!
//! Besides the store (`pv-01-storage`) and ledger (`pv-03-ledger-client`)
//! traits, the coordinator needs only a clock.

/// Source of wall-clock time for intent timestamps.
pub trait TimeSource: Send + Sync {
    /// Seconds since the Unix epoch.
    fn now(&self) -> i64;
}
