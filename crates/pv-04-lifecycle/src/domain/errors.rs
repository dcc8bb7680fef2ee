//! # Domain Errors
//!
//! Every failure leaves local state as it was before the call, except that
//! an intent may stay open when the ledger outcome is unknown.

use pv_01_storage::StoreError;
use pv_03_ledger_client::LedgerError;
use shared_types::{Capability, FingerprintError, TxHash};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// Caller's role lacks the capability.
    #[error("access denied: missing {0:?}")]
    Forbidden(Capability),

    #[error("invalid fingerprint: {0}")]
    InvalidFingerprint(#[from] FingerprintError),

    /// The ledger already holds the fingerprint. Nothing was submitted.
    #[error("document already anchored")]
    AlreadyAnchored,

    /// No record for this fingerprint owned by the caller. Deliberately
    /// does not say whether someone else owns it.
    #[error("document not found or access denied")]
    NotFoundOrForbidden,

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The ledger confirmed but the local transaction failed. The intent
    /// stays open so the reconciler can apply it later.
    #[error("ledger confirmed {tx_hash} but local commit failed: {source}")]
    LocalCommitFailed { tx_hash: TxHash, source: StoreError },
}

impl LifecycleError {
    /// The ledger may hold a change the local registry does not reflect yet.
    pub fn leaves_divergence(&self) -> bool {
        match self {
            LifecycleError::Ledger(e) => e.is_ambiguous(),
            LifecycleError::LocalCommitFailed { .. } => true,
            _ => false,
        }
    }
}

pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_divergence_classification() {
        let tx = TxHash::from_bytes([1; 32]);
        assert!(LifecycleError::Ledger(LedgerError::ConfirmationTimeout {
            tx_hash: tx,
            waited: Duration::from_secs(1)
        })
        .leaves_divergence());
        assert!(LifecycleError::LocalCommitFailed {
            tx_hash: tx,
            source: StoreError::Database("disk full".into())
        }
        .leaves_divergence());
        assert!(!LifecycleError::Ledger(LedgerError::Reverted { tx_hash: Some(tx) }).leaves_divergence());
        assert!(!LifecycleError::AlreadyAnchored.leaves_divergence());
    }
}
