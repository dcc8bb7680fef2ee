//! # Reconciler
//!
//! Resolves intents left open by timeouts, failed local commits or crashes.
//!
//! | Intent state | Ledger says | Action |
//! |--------------|-------------|--------|
//! | tx hash, register | success | create record + notification unless present, close |
//! | tx hash, revoke | success | delete owner's record if present, close |
//! | tx hash | reverted | close |
//! | tx hash | no receipt | keep until `max_intent_age`, then close and warn |
//! | no tx hash | - | keep until `max_intent_age`, then close |

use crate::domain::errors::LifecycleResult;
use crate::domain::locks::FingerprintLocks;
use crate::domain::outcomes::ReconciliationReport;
use crate::ports::outbound::TimeSource;
use pv_01_storage::ProvenanceStore;
use pv_03_ledger_client::LedgerClient;
use shared_types::{upload_notification, IntentKind, LedgerIntent, ReceiptStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

enum Resolution {
    RegistrationApplied,
    RevocationApplied,
    AlreadyApplied,
    Reverted,
    Pending,
    Abandoned,
}

pub struct Reconciler<S: ?Sized, L: ?Sized> {
    store: Arc<S>,
    ledger: Arc<L>,
    locks: Arc<FingerprintLocks>,
    clock: Arc<dyn TimeSource>,
    max_intent_age: Duration,
}

impl<S, L> Reconciler<S, L>
where
    S: ProvenanceStore + ?Sized,
    L: LedgerClient + ?Sized,
{
    pub(crate) fn new(
        store: Arc<S>,
        ledger: Arc<L>,
        locks: Arc<FingerprintLocks>,
        clock: Arc<dyn TimeSource>,
        max_intent_age: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            locks,
            clock,
            max_intent_age,
        }
    }

    /// One pass over every open intent, oldest first.
    ///
    /// A failure on one intent is counted and logged; the pass continues.
    pub async fn run_once(&self) -> LifecycleResult<ReconciliationReport> {
        let intents = self.store.open_intents().await?;
        let mut report = ReconciliationReport {
            examined: intents.len(),
            ..Default::default()
        };

        for intent in intents {
            let _guard = self.locks.acquire(&intent.fingerprint).await;
            match self.resolve(&intent).await {
                Ok(Resolution::RegistrationApplied) => report.registrations_applied += 1,
                Ok(Resolution::RevocationApplied) => report.revocations_applied += 1,
                Ok(Resolution::AlreadyApplied) => report.already_applied += 1,
                Ok(Resolution::Reverted) => report.reverted += 1,
                Ok(Resolution::Pending) => report.still_pending += 1,
                Ok(Resolution::Abandoned) => report.abandoned += 1,
                Err(e) => {
                    warn!(intent = %intent.id, error = %e, "Failed to reconcile intent");
                    report.errors += 1;
                }
            }
        }

        if report.closed() > 0 || report.errors > 0 {
            info!(
                examined = report.examined,
                closed = report.closed(),
                pending = report.still_pending,
                errors = report.errors,
                "Reconciliation pass complete"
            );
        } else {
            debug!(examined = report.examined, "Reconciliation pass, nothing to do");
        }
        Ok(report)
    }

    async fn resolve(&self, intent: &LedgerIntent) -> LifecycleResult<Resolution> {
        let Some(tx) = intent.tx_hash else {
            return self.expire_if_stale(intent, "no transaction hash").await;
        };

        let Some(receipt) = self.ledger.receipt(tx).await? else {
            return self.expire_if_stale(intent, "no receipt").await;
        };

        if receipt.status == ReceiptStatus::Reverted {
            self.store.close_intent(intent.id).await?;
            return Ok(Resolution::Reverted);
        }

        let existing = self
            .store
            .find_owned_document(&intent.fingerprint, intent.owner)
            .await?;

        match (intent.kind, existing) {
            (IntentKind::Register, None) => {
                let notification = upload_notification(&intent.fingerprint);
                self.store
                    .commit_registration(intent.id, intent.owner, &intent.fingerprint, &notification)
                    .await?;
                info!(
                    intent = %intent.id,
                    fingerprint = %intent.fingerprint,
                    tx_hash = %tx,
                    "Applied confirmed registration"
                );
                Ok(Resolution::RegistrationApplied)
            }
            (IntentKind::Revoke, Some(record)) => {
                self.store.commit_revocation(intent.id, record.id).await?;
                info!(
                    intent = %intent.id,
                    fingerprint = %intent.fingerprint,
                    tx_hash = %tx,
                    "Applied confirmed revocation"
                );
                Ok(Resolution::RevocationApplied)
            }
            (IntentKind::Register, Some(_)) | (IntentKind::Revoke, None) => {
                self.store.close_intent(intent.id).await?;
                Ok(Resolution::AlreadyApplied)
            }
        }
    }

    async fn expire_if_stale(
        &self,
        intent: &LedgerIntent,
        reason: &'static str,
    ) -> LifecycleResult<Resolution> {
        let age = self.clock.now().saturating_sub(intent.created_at);
        if age < self.max_intent_age.as_secs() as i64 {
            return Ok(Resolution::Pending);
        }

        warn!(
            intent = %intent.id,
            kind = intent.kind.as_str(),
            fingerprint = %intent.fingerprint,
            tx_hash = ?intent.tx_hash,
            age_secs = age,
            reason = reason,
            "Abandoning intent, ledger and registry may disagree"
        );
        self.store.close_intent(intent.id).await?;
        Ok(Resolution::Abandoned)
    }
}
