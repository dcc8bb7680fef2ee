//! # Domain Errors
//!
//! Failure taxonomy for ledger operations.
//!
//! | Variant | Meaning for the caller |
//! |---------|------------------------|
//! | `Rpc` | Transport failure, retryable, ledger untouched as far as we know |
//! | `Reverted` | The contract rejected the transaction, ledger untouched |
//! | `ConfirmationTimeout` | Outcome unknown, the transaction may still be mined |
//! | `InvalidResponse` | The node answered with something we cannot parse |
//! | `Abi` | Contract return data did not decode |

use shared_types::TxHash;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("ledger rpc failure: {0}")]
    Rpc(String),

    /// `tx_hash` is `None` when the node rejected the submission outright.
    #[error("transaction reverted{}", .tx_hash.map(|t| format!(": {}", t)).unwrap_or_default())]
    Reverted { tx_hash: Option<TxHash> },

    #[error("no receipt for {tx_hash} after {waited:?}")]
    ConfirmationTimeout { tx_hash: TxHash, waited: Duration },

    #[error("invalid ledger response: {0}")]
    InvalidResponse(String),

    #[error("abi decoding failed: {0}")]
    Abi(String),
}

impl LedgerError {
    /// Worth retrying within the confirmation window.
    pub fn is_transient(&self) -> bool {
        matches!(self, LedgerError::Rpc(_))
    }

    /// Outcome unknown: the ledger may hold the change.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, LedgerError::ConfirmationTimeout { .. })
    }

    /// Stable label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Rpc(_) => "rpc",
            LedgerError::Reverted { .. } => "reverted",
            LedgerError::ConfirmationTimeout { .. } => "timeout",
            LedgerError::InvalidResponse(_) => "invalid_response",
            LedgerError::Abi(_) => "abi",
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let timeout = LedgerError::ConfirmationTimeout {
            tx_hash: TxHash::from_bytes([1; 32]),
            waited: Duration::from_secs(5),
        };
        assert!(timeout.is_ambiguous());
        assert!(!timeout.is_transient());
        assert_eq!(timeout.kind(), "timeout");

        assert!(LedgerError::Rpc("refused".into()).is_transient());
        assert!(!LedgerError::Reverted { tx_hash: None }.is_ambiguous());
    }

    #[test]
    fn test_reverted_message() {
        assert_eq!(
            LedgerError::Reverted { tx_hash: None }.to_string(),
            "transaction reverted"
        );
        let tx = TxHash::from_bytes([0xaa; 32]);
        assert_eq!(
            LedgerError::Reverted { tx_hash: Some(tx) }.to_string(),
            format!("transaction reverted: {}", tx)
        );
    }
}
