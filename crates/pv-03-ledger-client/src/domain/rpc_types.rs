//! Ethereum JSON-RPC wire types used by the HTTP adapter.

use crate::domain::errors::{LedgerError, LedgerResult};
use primitive_types::{H160, U256};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use shared_types::{ReceiptStatus, TransactionReceipt, TxHash};

/// 20-byte account or contract address.
pub type Address = H160;

/// Bytes with `0x` hex serialization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(v: Vec<u8>) -> Self {
        Bytes(v)
    }
}

impl Serialize for Bytes {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("0x{}", hex::encode(&self.0)))
    }
}

impl<'de> Deserialize<'de> for Bytes {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let s = s.strip_prefix("0x").unwrap_or(&s);
        hex::decode(s)
            .map(Bytes)
            .map_err(|_| de::Error::custom("invalid hex bytes"))
    }
}

/// Call object for `eth_call` and `eth_sendTransaction`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<U256>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
}

/// JSON-RPC 2.0 request envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Value,
}

impl JsonRpcRequest {
    pub fn new(id: u64, method: &str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            method: method.to_string(),
            params,
        }
    }
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// JSON-RPC 2.0 response envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcErrorObject>,
}

impl JsonRpcResponse {
    /// Result value, or the node's error mapped into the ledger taxonomy.
    ///
    /// Nodes that execute on submission (Ganache, Hardhat automine) report a
    /// contract revert as an error object rather than a receipt.
    pub fn into_result(self) -> LedgerResult<Value> {
        if let Some(err) = self.error {
            if err.message.to_ascii_lowercase().contains("revert") {
                return Err(LedgerError::Reverted { tx_hash: None });
            }
            return Err(LedgerError::Rpc(format!(
                "node error {}: {}",
                err.code, err.message
            )));
        }
        Ok(self.result.unwrap_or(Value::Null))
    }
}

/// Subset of `eth_getTransactionReceipt` the client reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReceipt {
    pub transaction_hash: String,
    #[serde(default)]
    pub block_number: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl TryFrom<RawReceipt> for TransactionReceipt {
    type Error = LedgerError;

    fn try_from(raw: RawReceipt) -> Result<Self, Self::Error> {
        let tx_hash: TxHash = raw
            .transaction_hash
            .parse()
            .map_err(|e| LedgerError::InvalidResponse(format!("receipt hash: {}", e)))?;
        let block_number = raw.block_number.as_deref().map(parse_quantity).transpose()?;
        let status = match raw.status.as_deref().map(parse_quantity).transpose()? {
            Some(1) => ReceiptStatus::Success,
            Some(0) => ReceiptStatus::Reverted,
            Some(other) => {
                return Err(LedgerError::InvalidResponse(format!(
                    "receipt status {}",
                    other
                )))
            }
            None => {
                return Err(LedgerError::InvalidResponse(
                    "receipt without status field".into(),
                ))
            }
        };

        Ok(TransactionReceipt {
            tx_hash,
            block_number,
            status,
        })
    }
}

/// Parse a hex `QUANTITY` such as `0x1a`.
pub fn parse_quantity(raw: &str) -> LedgerResult<u64> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| LedgerError::InvalidResponse(format!("quantity without 0x: {}", raw)))?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| LedgerError::InvalidResponse(format!("quantity {}: {}", raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_call_request_skips_empty_fields() {
        let req = CallRequest {
            to: Some(Address::repeat_byte(0x11)),
            data: Some(Bytes(vec![0xde, 0xad])),
            ..Default::default()
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(
            value,
            json!({
                "to": "0x1111111111111111111111111111111111111111",
                "data": "0xdead"
            })
        );
    }

    #[test]
    fn test_revert_error_maps_to_reverted() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "VM Exception while processing transaction: revert"}
        }))
        .unwrap();
        assert_eq!(
            resp.into_result(),
            Err(LedgerError::Reverted { tx_hash: None })
        );
    }

    #[test]
    fn test_other_node_error_is_rpc() {
        let resp: JsonRpcResponse = serde_json::from_value(json!({
            "id": 1,
            "error": {"code": -32601, "message": "method not found"}
        }))
        .unwrap();
        assert!(matches!(resp.into_result(), Err(LedgerError::Rpc(_))));
    }

    #[test]
    fn test_receipt_conversion() {
        let tx = TxHash::from_bytes([3; 32]);
        let raw = RawReceipt {
            transaction_hash: tx.to_hex(),
            block_number: Some("0x10".into()),
            status: Some("0x0".into()),
        };
        let receipt = TransactionReceipt::try_from(raw).unwrap();
        assert_eq!(receipt.tx_hash, tx);
        assert_eq!(receipt.block_number, Some(16));
        assert_eq!(receipt.status, ReceiptStatus::Reverted);
    }

    #[test]
    fn test_receipt_without_status_rejected() {
        let raw = RawReceipt {
            transaction_hash: TxHash::from_bytes([3; 32]).to_hex(),
            block_number: None,
            status: None,
        };
        assert!(matches!(
            TransactionReceipt::try_from(raw),
            Err(LedgerError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("0x1").unwrap(), 1);
        assert_eq!(parse_quantity("0xff").unwrap(), 255);
        assert!(parse_quantity("12").is_err());
        assert!(parse_quantity("0xzz").is_err());
    }
}
