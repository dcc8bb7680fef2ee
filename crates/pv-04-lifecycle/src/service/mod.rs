//! # Lifecycle Coordinator
//!
//! Sequences ledger transactions with local registry mutations.
//!
//! ## Upload
//!
//! ```text
//! lock(fp) → exists? ──yes──► AlreadyAnchored
//!              │no
//!              ▼
//!        open intent → submit → attach tx → await confirmation
//!                                              │
//!          ┌───────────────┬──────────────────┼──────────────────┐
//!          ▼               ▼                  ▼                  ▼
//!       success        reverted            timeout        commit failed
//!   commit record +   close intent     keep intent open   keep intent open
//!   notification +
//!   close intent
//! ```
//!
//! Revoke follows the same shape, starting from the caller's own record.
//! Local state never runs ahead of the ledger: nothing is written locally
//! until a success receipt is in hand.

mod reconciler;

pub use reconciler::Reconciler;

use crate::adapters::time::SystemTimeSource;
use crate::domain::errors::{LifecycleError, LifecycleResult};
use crate::domain::locks::FingerprintLocks;
use crate::domain::outcomes::{RevokeOutcome, UploadOutcome};
use crate::ports::outbound::TimeSource;
use pv_01_storage::ProvenanceStore;
use pv_03_ledger_client::{await_confirmation, ConfirmationPolicy, LedgerClient, LedgerError};
use shared_types::{
    upload_notification, Capability, Fingerprint, IntentKind, LedgerIntent, NotificationEvent,
    TxHash, UserIdentity,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Coordinates the document lifecycle across store and ledger.
pub struct LifecycleCoordinator<S: ?Sized, L: ?Sized> {
    pub(crate) store: Arc<S>,
    pub(crate) ledger: Arc<L>,
    pub(crate) locks: Arc<FingerprintLocks>,
    pub(crate) clock: Arc<dyn TimeSource>,
    confirmation: ConfirmationPolicy,
}

impl<S, L> LifecycleCoordinator<S, L>
where
    S: ProvenanceStore + ?Sized,
    L: LedgerClient + ?Sized,
{
    pub fn new(store: Arc<S>, ledger: Arc<L>, confirmation: ConfirmationPolicy) -> Self {
        Self {
            store,
            ledger,
            locks: Arc::new(FingerprintLocks::new()),
            clock: Arc::new(SystemTimeSource),
            confirmation,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = clock;
        self
    }

    /// Reconciler sharing this coordinator's store, ledger and locks.
    pub fn reconciler(&self, max_intent_age: Duration) -> Reconciler<S, L> {
        Reconciler::new(
            self.store.clone(),
            self.ledger.clone(),
            self.locks.clone(),
            self.clock.clone(),
            max_intent_age,
        )
    }

    /// Anchor a new fingerprint for `caller`.
    pub async fn upload(&self, caller: &UserIdentity, raw: &str) -> LifecycleResult<UploadOutcome> {
        require(caller, Capability::UploadDocuments)?;
        let fingerprint = Fingerprint::parse(raw)?;
        let _guard = self.locks.acquire(&fingerprint).await;

        if self.ledger.exists(&fingerprint).await? {
            debug!(fingerprint = %fingerprint, "Upload rejected, already anchored");
            return Err(LifecycleError::AlreadyAnchored);
        }

        let intent = self
            .store
            .open_intent(IntentKind::Register, &fingerprint, caller.id, self.clock.now())
            .await?;

        let tx = match self.ledger.submit_register(&fingerprint).await {
            Ok(tx) => tx,
            Err(e) => {
                self.close_after_failure(&intent).await;
                return Err(e.into());
            }
        };
        self.record_tx(&intent, tx).await;

        let receipt = match await_confirmation(self.ledger.as_ref(), tx, &self.confirmation).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.settle_failed_wait(&intent, e).await),
        };

        let notification = upload_notification(&fingerprint);
        let (document, _) = self
            .store
            .commit_registration(intent.id, caller.id, &fingerprint, &notification)
            .await
            .map_err(|source| {
                error!(
                    intent = %intent.id,
                    tx_hash = %tx,
                    error = %source,
                    "Registration confirmed on ledger but local commit failed"
                );
                LifecycleError::LocalCommitFailed { tx_hash: tx, source }
            })?;

        info!(
            fingerprint = %fingerprint,
            owner = %caller.id,
            tx_hash = %tx,
            document_id = document.id,
            "Document anchored"
        );

        Ok(UploadOutcome {
            fingerprint,
            tx_hash: tx,
            document_id: document.id,
            block_number: receipt.block_number,
        })
    }

    /// Revoke a fingerprint `caller` owns.
    pub async fn revoke(&self, caller: &UserIdentity, raw: &str) -> LifecycleResult<RevokeOutcome> {
        require(caller, Capability::RevokeDocuments)?;
        let fingerprint =
            Fingerprint::parse(raw).map_err(|_| LifecycleError::NotFoundOrForbidden)?;
        let _guard = self.locks.acquire(&fingerprint).await;

        let record = self
            .store
            .find_owned_document(&fingerprint, caller.id)
            .await?
            .ok_or(LifecycleError::NotFoundOrForbidden)?;

        let intent = self
            .store
            .open_intent(IntentKind::Revoke, &fingerprint, caller.id, self.clock.now())
            .await?;

        let tx = match self.ledger.submit_revoke(&fingerprint).await {
            Ok(tx) => tx,
            Err(e) => {
                self.close_after_failure(&intent).await;
                return Err(e.into());
            }
        };
        self.record_tx(&intent, tx).await;

        let receipt = match await_confirmation(self.ledger.as_ref(), tx, &self.confirmation).await {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.settle_failed_wait(&intent, e).await),
        };

        self.store
            .commit_revocation(intent.id, record.id)
            .await
            .map_err(|source| {
                error!(
                    intent = %intent.id,
                    tx_hash = %tx,
                    error = %source,
                    "Revocation confirmed on ledger but local commit failed"
                );
                LifecycleError::LocalCommitFailed { tx_hash: tx, source }
            })?;

        info!(
            fingerprint = %fingerprint,
            owner = %caller.id,
            tx_hash = %tx,
            "Document revoked"
        );

        Ok(RevokeOutcome {
            fingerprint,
            tx_hash: tx,
            block_number: receipt.block_number,
        })
    }

    /// Ask the ledger whether a fingerprint is anchored. Reads no local state.
    pub async fn verify(&self, caller: &UserIdentity, raw: &str) -> LifecycleResult<bool> {
        require(caller, Capability::VerifyDocuments)?;
        let fingerprint = Fingerprint::parse(raw)?;
        Ok(self.ledger.exists(&fingerprint).await?)
    }

    /// The notification log in insertion order.
    pub async fn notifications(
        &self,
        caller: &UserIdentity,
    ) -> LifecycleResult<Vec<NotificationEvent>> {
        require(caller, Capability::ReadNotifications)?;
        Ok(self.store.notifications().await?)
    }

    async fn record_tx(&self, intent: &LedgerIntent, tx: TxHash) {
        // The commit closes the intent either way; a missing hash only
        // limits what the reconciler can do if we crash before that.
        if let Err(e) = self.store.attach_tx_hash(intent.id, tx).await {
            warn!(intent = %intent.id, tx_hash = %tx, error = %e, "Failed to record tx hash on intent");
        }
    }

    /// Map a failed confirmation wait and decide the intent's fate.
    ///
    /// Only a revert proves the ledger is untouched. Anything else leaves
    /// the intent open for the reconciler.
    async fn settle_failed_wait(&self, intent: &LedgerIntent, e: LedgerError) -> LifecycleError {
        match &e {
            LedgerError::Reverted { .. } => {
                info!(intent = %intent.id, fingerprint = %intent.fingerprint, "Transaction reverted");
                self.close_after_failure(intent).await;
            }
            _ => {
                warn!(
                    intent = %intent.id,
                    kind = intent.kind.as_str(),
                    fingerprint = %intent.fingerprint,
                    error = %e,
                    "Ledger outcome unknown, intent left open"
                );
            }
        }
        e.into()
    }

    async fn close_after_failure(&self, intent: &LedgerIntent) {
        if let Err(e) = self.store.close_intent(intent.id).await {
            warn!(intent = %intent.id, error = %e, "Failed to close intent");
        }
    }
}

fn require(caller: &UserIdentity, capability: Capability) -> LifecycleResult<()> {
    if caller.can(capability) {
        Ok(())
    } else {
        debug!(user_id = %caller.id, capability = ?capability, "Capability check failed");
        Err(LifecycleError::Forbidden(capability))
    }
}
