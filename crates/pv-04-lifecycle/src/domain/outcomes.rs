//! Results of lifecycle operations.

use shared_types::{Fingerprint, TxHash};

/// A fingerprint anchored on the ledger and recorded locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub fingerprint: Fingerprint,
    pub tx_hash: TxHash,
    pub document_id: i64,
    pub block_number: Option<u64>,
}

/// A fingerprint revoked on the ledger and removed locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevokeOutcome {
    pub fingerprint: Fingerprint,
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
}

/// What one reconciliation pass did with the open intents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationReport {
    /// Open intents seen at the start of the pass.
    pub examined: usize,
    /// Confirmed registrations whose local record was created now.
    pub registrations_applied: usize,
    /// Confirmed revocations whose local record was deleted now.
    pub revocations_applied: usize,
    /// Outcomes already reflected locally; intent closed without change.
    pub already_applied: usize,
    /// Reverted transactions; intent closed without change.
    pub reverted: usize,
    /// Still no receipt; intent kept for the next pass.
    pub still_pending: usize,
    /// Given up after `max_intent_age`; needs a manual audit.
    pub abandoned: usize,
    /// Errors while processing an intent; intent kept.
    pub errors: usize,
}

impl ReconciliationReport {
    /// Intents closed by this pass.
    pub fn closed(&self) -> usize {
        self.registrations_applied
            + self.revocations_applied
            + self.already_applied
            + self.reverted
            + self.abandoned
    }
}
