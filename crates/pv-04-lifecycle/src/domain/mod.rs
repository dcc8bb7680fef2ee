//! Domain layer for the lifecycle crate.

pub mod errors;
pub mod locks;
pub mod outcomes;

pub use errors::{LifecycleError, LifecycleResult};
pub use locks::{FingerprintGuard, FingerprintLocks};
pub use outcomes::{ReconciliationReport, RevokeOutcome, UploadOutcome};
