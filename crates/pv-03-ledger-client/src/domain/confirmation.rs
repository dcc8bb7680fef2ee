//! # Confirmation Wait
//!
//! Turns a submitted transaction hash into a final receipt, bounded in time.
//!
//! ```text
//! submit ──► tx_hash ──► poll receipt ──► Some(status=1) ──► Ok(receipt)
//!                          │    ▲         Some(status=0) ──► Reverted
//!                          ▼    │         deadline       ──► ConfirmationTimeout
//!                       None / Rpc error
//! ```
//!
//! A timeout says nothing about the ledger: the transaction can still be
//! mined afterwards. Callers must treat it as "unknown".

use crate::domain::errors::{LedgerError, LedgerResult};
use crate::ports::inbound::LedgerClient;
use shared_types::{TransactionReceipt, TxHash};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Bounds for `await_confirmation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// Total time to wait for a receipt.
    pub timeout: Duration,
    /// Delay between receipt polls.
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Poll `client` until `tx` has a receipt or `policy.timeout` elapses.
///
/// Transient RPC errors are logged and retried until the deadline. The future
/// holds no state besides the deadline, so dropping it is safe.
pub async fn await_confirmation<C>(
    client: &C,
    tx: TxHash,
    policy: &ConfirmationPolicy,
) -> LedgerResult<TransactionReceipt>
where
    C: LedgerClient + ?Sized,
{
    let started = Instant::now();
    let deadline = started + policy.timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        match tokio::time::timeout_at(deadline, client.receipt(tx)).await {
            Ok(Ok(Some(receipt))) => {
                debug!(
                    tx_hash = %tx,
                    attempts = attempts,
                    block = ?receipt.block_number,
                    "Receipt received"
                );
                if receipt.succeeded() {
                    return Ok(receipt);
                }
                return Err(LedgerError::Reverted { tx_hash: Some(tx) });
            }
            Ok(Ok(None)) => {}
            Ok(Err(e)) if e.is_transient() => {
                warn!(tx_hash = %tx, attempts = attempts, error = %e, "Receipt poll failed, retrying");
            }
            Ok(Err(e)) => return Err(e),
            Err(_) => break,
        }

        let now = Instant::now();
        if now >= deadline {
            break;
        }
        tokio::time::sleep(policy.poll_interval.min(deadline - now)).await;
    }

    Err(LedgerError::ConfirmationTimeout {
        tx_hash: tx,
        waited: started.elapsed(),
    })
}
