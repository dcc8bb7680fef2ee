//! # Inbound Ports (Driving Ports)
//!
//! The ledger API offered to the lifecycle coordinator.
//!
//! Production: `JsonRpcLedger` (adapters/jsonrpc.rs)
//! Testing and development: `InMemoryLedger` (adapters/memory.rs)

use crate::domain::errors::LedgerResult;
use async_trait::async_trait;
use shared_types::{Fingerprint, TransactionReceipt, TxHash};

/// Client bound to one deployed document registry contract.
///
/// `submit_*` only hands the transaction to the node. Use
/// `await_confirmation` to learn whether it took effect.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Read-only existence check.
    async fn exists(&self, fingerprint: &Fingerprint) -> LedgerResult<bool>;

    async fn submit_register(&self, fingerprint: &Fingerprint) -> LedgerResult<TxHash>;

    async fn submit_revoke(&self, fingerprint: &Fingerprint) -> LedgerResult<TxHash>;

    /// One receipt poll. `None` while the transaction is not yet mined.
    async fn receipt(&self, tx: TxHash) -> LedgerResult<Option<TransactionReceipt>>;

    /// Check the node is reachable.
    async fn health_check(&self) -> LedgerResult<()>;

    /// Short backend name for logs and the health endpoint.
    fn backend(&self) -> &'static str;
}
