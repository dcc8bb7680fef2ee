//! # JSON-RPC Ledger
//!
//! Talks to an Ethereum node over HTTP and drives the document registry
//! contract through `eth_call` and `eth_sendTransaction`.
//!
//! The node signs transactions for the sender account, which must be
//! unlocked on the node (Ganache, Hardhat, geth `--dev`). When no account is
//! configured the node's first account is used.

use crate::domain::abi::{self, REVOKE_DOCUMENT, UPLOAD_DOCUMENT, VERIFY_DOCUMENT};
use crate::domain::errors::{LedgerError, LedgerResult};
use crate::domain::rpc_types::{Address, Bytes, CallRequest, JsonRpcRequest, JsonRpcResponse, RawReceipt};
use crate::ports::inbound::LedgerClient;
use async_trait::async_trait;
use primitive_types::U256;
use serde_json::{json, Value};
use shared_types::{Fingerprint, TransactionReceipt, TxHash};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

/// Connection settings for `JsonRpcLedger`.
#[derive(Debug, Clone)]
pub struct JsonRpcConfig {
    pub rpc_url: String,
    pub contract_address: Address,
    /// Sender account. `None` uses `eth_accounts[0]`.
    pub account: Option<Address>,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Gas limit sent with transactions. `None` lets the node estimate.
    pub gas_limit: Option<u64>,
}

impl Default for JsonRpcConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:7545".to_string(),
            contract_address: Address::zero(),
            account: None,
            request_timeout: Duration::from_secs(10),
            gas_limit: Some(300_000),
        }
    }
}

pub struct JsonRpcLedger {
    http: reqwest::Client,
    config: JsonRpcConfig,
    next_id: AtomicU64,
    sender: OnceCell<Address>,
}

impl JsonRpcLedger {
    pub fn new(config: JsonRpcConfig) -> LedgerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::Rpc(e.to_string()))?;

        Ok(Self {
            http,
            config,
            next_id: AtomicU64::new(1),
            sender: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &JsonRpcConfig {
        &self.config
    }

    async fn call(&self, method: &str, params: Value) -> LedgerResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        debug!(method = method, id = id, "JSON-RPC request");

        let response = self
            .http
            .post(&self.config.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| LedgerError::Rpc(format!("{}: {}", method, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::Rpc(format!("{}: HTTP {}", method, status)));
        }

        let body: JsonRpcResponse = response
            .json()
            .await
            .map_err(|e| LedgerError::InvalidResponse(format!("{}: {}", method, e)))?;
        body.into_result()
    }

    /// Resolve the sender once and cache it.
    async fn sender(&self) -> LedgerResult<Address> {
        if let Some(account) = self.config.account {
            return Ok(account);
        }
        self.sender
            .get_or_try_init(|| async {
                let accounts: Vec<Address> = serde_json::from_value(
                    self.call("eth_accounts", json!([])).await?,
                )
                .map_err(|e| LedgerError::InvalidResponse(format!("eth_accounts: {}", e)))?;

                let first = accounts.first().copied().ok_or_else(|| {
                    LedgerError::InvalidResponse("node has no unlocked accounts".into())
                })?;
                info!(account = ?first, "Using node's first account as sender");
                Ok::<Address, LedgerError>(first)
            })
            .await
            .copied()
    }

    async fn transact(&self, signature: &str, fingerprint: &Fingerprint) -> LedgerResult<TxHash> {
        let from = self.sender().await?;
        let request = CallRequest {
            from: Some(from),
            to: Some(self.config.contract_address),
            gas: self.config.gas_limit.map(U256::from),
            data: Some(Bytes(abi::encode_string_call(signature, fingerprint.as_str()))),
        };

        let result = self.call("eth_sendTransaction", json!([request])).await?;
        let raw = result
            .as_str()
            .ok_or_else(|| LedgerError::InvalidResponse(format!("tx hash not a string: {}", result)))?;
        let tx: TxHash = raw
            .parse()
            .map_err(|e| LedgerError::InvalidResponse(format!("tx hash {}: {}", raw, e)))?;

        debug!(tx_hash = %tx, function = signature, fingerprint = %fingerprint, "Submitted transaction");
        Ok(tx)
    }
}

#[async_trait]
impl LedgerClient for JsonRpcLedger {
    async fn exists(&self, fingerprint: &Fingerprint) -> LedgerResult<bool> {
        let request = CallRequest {
            to: Some(self.config.contract_address),
            data: Some(Bytes(abi::encode_string_call(
                VERIFY_DOCUMENT,
                fingerprint.as_str(),
            ))),
            ..Default::default()
        };

        let result = self.call("eth_call", json!([request, "latest"])).await?;
        let data: Bytes = serde_json::from_value(result)
            .map_err(|e| LedgerError::InvalidResponse(format!("eth_call: {}", e)))?;
        abi::decode_bool(data.as_slice())
    }

    async fn submit_register(&self, fingerprint: &Fingerprint) -> LedgerResult<TxHash> {
        self.transact(UPLOAD_DOCUMENT, fingerprint).await
    }

    async fn submit_revoke(&self, fingerprint: &Fingerprint) -> LedgerResult<TxHash> {
        self.transact(REVOKE_DOCUMENT, fingerprint).await
    }

    async fn receipt(&self, tx: TxHash) -> LedgerResult<Option<TransactionReceipt>> {
        let result = self
            .call("eth_getTransactionReceipt", json!([tx.to_hex()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let raw: RawReceipt = serde_json::from_value(result)
            .map_err(|e| LedgerError::InvalidResponse(format!("receipt: {}", e)))?;
        TransactionReceipt::try_from(raw).map(Some)
    }

    async fn health_check(&self) -> LedgerResult<()> {
        self.call("eth_blockNumber", json!([])).await.map(|_| ())
    }

    fn backend(&self) -> &'static str {
        "jsonrpc"
    }
}
