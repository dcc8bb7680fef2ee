//! # Document Lifecycle (pv-04)
//!
//! The only component with cross-system logic: it sequences a ledger write,
//! waits for confirmation, and only then mutates the local registry.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Enforcement |
//! |----|-----------|-------------|
//! | 1 | Ledger First | Local rows are written only after a success receipt |
//! | 2 | Atomic Apply | Record, notification and intent close commit together |
//! | 3 | Unknown Is Not Failure | A confirmation timeout never mutates local state |
//! | 4 | Opaque Ownership | Revoke by a non-owner is indistinguishable from "absent" |
//! | 5 | Serialized Fingerprint | One in-flight operation per fingerprint per process |
//! | 6 | Journaled Intent | Every submission is preceded by an intent row |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Errors, outcomes, per-fingerprint locks
//! - `ports/` - `TimeSource`
//! - `adapters/` - System and manual clocks
//! - `service/` - `LifecycleCoordinator` and `Reconciler`

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::time::{ManualClock, SystemTimeSource};
pub use domain::{
    FingerprintLocks, LifecycleError, LifecycleResult, ReconciliationReport, RevokeOutcome,
    UploadOutcome,
};
pub use ports::outbound::TimeSource;
pub use service::{LifecycleCoordinator, Reconciler};
