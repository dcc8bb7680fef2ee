//! In-process simulation of the document registry contract.
//!
//! Transactions execute at submission, like a development chain with
//! automine. Registering an anchored fingerprint or revoking a missing one
//! produces a reverted receipt and leaves state unchanged.
//!
//! ## Fault Injection
//!
//! | Knob | Effect |
//! |------|--------|
//! | `fail_next_rpcs(n)` | The next `n` calls fail with `LedgerError::Rpc` |
//! | `set_unreachable(true)` | Every call fails with `LedgerError::Rpc` |
//! | `set_withhold_receipts(true)` | Transactions execute but receipts stay hidden |
//! | `set_force_revert(true)` | Submissions revert regardless of state |

use crate::domain::errors::{LedgerError, LedgerResult};
use crate::ports::inbound::LedgerClient;
use async_trait::async_trait;
use parking_lot::Mutex;
use sha3::{Digest, Keccak256};
use shared_types::{Fingerprint, ReceiptStatus, TransactionReceipt, TxHash};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tracing::debug;

#[derive(Default)]
struct ChainState {
    anchored: HashSet<String>,
    receipts: HashMap<TxHash, TransactionReceipt>,
    withheld: HashSet<TxHash>,
    block_number: u64,
    nonce: u64,
}

#[derive(Default)]
pub struct InMemoryLedger {
    state: Mutex<ChainState>,
    fail_next: AtomicUsize,
    unreachable: AtomicBool,
    withhold_receipts: AtomicBool,
    force_revert: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_rpcs(&self, n: usize) {
        self.fail_next.store(n, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_withhold_receipts(&self, withhold: bool) {
        self.withhold_receipts.store(withhold, Ordering::SeqCst);
    }

    pub fn set_force_revert(&self, revert: bool) {
        self.force_revert.store(revert, Ordering::SeqCst);
    }

    /// Publish every receipt hidden while withholding was on.
    pub fn release_receipts(&self) {
        self.state.lock().withheld.clear();
    }

    /// Anchor a fingerprint directly, as another client of the contract would.
    pub fn anchor(&self, fingerprint: &Fingerprint) {
        self.state
            .lock()
            .anchored
            .insert(fingerprint.as_str().to_string());
    }

    pub fn is_anchored(&self, fingerprint: &Fingerprint) -> bool {
        self.state.lock().anchored.contains(fingerprint.as_str())
    }

    /// Number of transactions submitted so far.
    pub fn transaction_count(&self) -> u64 {
        self.state.lock().nonce
    }

    fn check_reachable(&self) -> LedgerResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(LedgerError::Rpc("connection refused".into()));
        }
        let took = self
            .fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if took.is_ok() {
            return Err(LedgerError::Rpc("injected rpc failure".into()));
        }
        Ok(())
    }

    fn execute(&self, fingerprint: &Fingerprint, register: bool) -> TxHash {
        let mut state = self.state.lock();
        state.nonce += 1;
        state.block_number += 1;

        let mut hasher = Keccak256::new();
        hasher.update(state.nonce.to_be_bytes());
        hasher.update([register as u8]);
        hasher.update(fingerprint.as_str().as_bytes());
        let tx = TxHash::from_bytes(hasher.finalize().into());

        let key = fingerprint.as_str();
        let applies = !self.force_revert.load(Ordering::SeqCst)
            && (register != state.anchored.contains(key));
        if applies {
            if register {
                state.anchored.insert(key.to_string());
            } else {
                state.anchored.remove(key);
            }
        }

        let receipt = TransactionReceipt {
            tx_hash: tx,
            block_number: Some(state.block_number),
            status: if applies {
                ReceiptStatus::Success
            } else {
                ReceiptStatus::Reverted
            },
        };
        state.receipts.insert(tx, receipt);
        if self.withhold_receipts.load(Ordering::SeqCst) {
            state.withheld.insert(tx);
        }

        debug!(
            tx_hash = %tx,
            fingerprint = %fingerprint,
            register = register,
            applied = applies,
            "Simulated transaction"
        );
        tx
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn exists(&self, fingerprint: &Fingerprint) -> LedgerResult<bool> {
        self.check_reachable()?;
        Ok(self.is_anchored(fingerprint))
    }

    async fn submit_register(&self, fingerprint: &Fingerprint) -> LedgerResult<TxHash> {
        self.check_reachable()?;
        Ok(self.execute(fingerprint, true))
    }

    async fn submit_revoke(&self, fingerprint: &Fingerprint) -> LedgerResult<TxHash> {
        self.check_reachable()?;
        Ok(self.execute(fingerprint, false))
    }

    async fn receipt(&self, tx: TxHash) -> LedgerResult<Option<TransactionReceipt>> {
        self.check_reachable()?;
        let state = self.state.lock();
        if state.withheld.contains(&tx) {
            return Ok(None);
        }
        Ok(state.receipts.get(&tx).cloned())
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.check_reachable()
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::confirmation::{await_confirmation, ConfirmationPolicy};
    use std::time::Duration;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::parse(s).unwrap()
    }

    fn policy() -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(100),
        }
    }

    #[tokio::test]
    async fn test_register_then_exists() {
        let ledger = InMemoryLedger::new();
        assert!(!ledger.exists(&fp("hash1")).await.unwrap());

        let tx = ledger.submit_register(&fp("hash1")).await.unwrap();
        let receipt = await_confirmation(&ledger, tx, &policy()).await.unwrap();
        assert!(receipt.succeeded());
        assert!(ledger.exists(&fp("hash1")).await.unwrap());
    }

    #[tokio::test]
    async fn test_double_register_reverts() {
        let ledger = InMemoryLedger::new();
        ledger.anchor(&fp("hash1"));

        let tx = ledger.submit_register(&fp("hash1")).await.unwrap();
        assert_eq!(
            await_confirmation(&ledger, tx, &policy()).await,
            Err(LedgerError::Reverted { tx_hash: Some(tx) })
        );
    }

    #[tokio::test]
    async fn test_revoke_missing_reverts() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.submit_revoke(&fp("nope")).await.unwrap();
        assert!(matches!(
            await_confirmation(&ledger, tx, &policy()).await,
            Err(LedgerError::Reverted { .. })
        ));
    }

    #[tokio::test]
    async fn test_force_revert_leaves_state() {
        let ledger = InMemoryLedger::new();
        ledger.set_force_revert(true);

        let tx = ledger.submit_register(&fp("hash1")).await.unwrap();
        assert!(await_confirmation(&ledger, tx, &policy()).await.is_err());
        assert!(!ledger.is_anchored(&fp("hash1")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_withheld_receipt_times_out_but_state_changed() {
        let ledger = InMemoryLedger::new();
        ledger.set_withhold_receipts(true);

        let tx = ledger.submit_register(&fp("hash1")).await.unwrap();
        let err = await_confirmation(&ledger, tx, &policy()).await.unwrap_err();
        assert!(err.is_ambiguous());
        assert!(ledger.is_anchored(&fp("hash1")));

        ledger.release_receipts();
        assert!(ledger.receipt(tx).await.unwrap().unwrap().succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_poll_errors_are_retried() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.submit_register(&fp("hash1")).await.unwrap();

        ledger.fail_next_rpcs(3);
        let receipt = await_confirmation(&ledger, tx, &policy()).await.unwrap();
        assert!(receipt.succeeded());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreachable_node_times_out() {
        let ledger = InMemoryLedger::new();
        let tx = ledger.submit_register(&fp("hash1")).await.unwrap();

        ledger.set_unreachable(true);
        assert!(matches!(
            await_confirmation(&ledger, tx, &policy()).await,
            Err(LedgerError::ConfirmationTimeout { .. })
        ));
        assert!(ledger.health_check().await.is_err());
    }

    #[tokio::test]
    async fn test_transaction_hashes_are_unique() {
        let ledger = InMemoryLedger::new();
        let a = ledger.submit_register(&fp("x")).await.unwrap();
        let b = ledger.submit_revoke(&fp("x")).await.unwrap();
        assert_ne!(a, b);
        assert_eq!(ledger.transaction_count(), 2);
    }
}
