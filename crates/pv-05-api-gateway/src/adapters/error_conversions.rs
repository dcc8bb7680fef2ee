//! Error conversions from the service crates.
//!
//! Ownership failures stay uninformative, and store faults are logged here
//! and replaced with a generic message.

use crate::domain::ApiError;
use pv_02_credentials::CredentialError;
use pv_03_ledger_client::LedgerError;
use pv_04_lifecycle::LifecycleError;
use tracing::error;

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::DuplicateEmail => ApiError::bad_request("Email already exists"),
            CredentialError::InvalidCredentials => {
                ApiError::Unauthorized("Invalid credentials".to_string())
            }
            CredentialError::InvalidInput(msg) => ApiError::BadRequest(msg),
            CredentialError::UnknownUser(_) => ApiError::Unauthenticated,
            other => {
                error!(error = %other, "Credential operation failed");
                ApiError::internal()
            }
        }
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        let divergent = e.leaves_divergence();
        match e {
            LifecycleError::Forbidden(_) => ApiError::Forbidden,
            LifecycleError::InvalidFingerprint(inner) => {
                ApiError::BadRequest(format!("Invalid document hash: {inner}"))
            }
            LifecycleError::AlreadyAnchored => ApiError::bad_request("Document already exists"),
            LifecycleError::NotFoundOrForbidden => {
                ApiError::NotFound("Document not found or access denied".to_string())
            }
            LifecycleError::Ledger(inner) => ledger_failure(&inner, divergent),
            LifecycleError::LocalCommitFailed { tx_hash, source } => {
                error!(tx_hash = %tx_hash, error = %source, "Ledger confirmed but local commit failed");
                ApiError::Internal(
                    "Ledger transaction confirmed but not yet recorded; it will be applied shortly"
                        .to_string(),
                )
            }
            LifecycleError::Store(inner) => {
                error!(error = %inner, "Store operation failed");
                ApiError::internal()
            }
        }
    }
}

fn ledger_failure(e: &LedgerError, divergent: bool) -> ApiError {
    error!(kind = e.kind(), error = %e, "Ledger operation failed");
    if divergent {
        ApiError::Internal(
            "Ledger transaction not confirmed in time; it will be reconciled".to_string(),
        )
    } else {
        ApiError::Internal("Ledger transaction failed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pv_01_storage::StoreError;
    use shared_types::{Capability, TxHash};
    use std::time::Duration;

    #[test]
    fn test_credential_mapping() {
        assert_eq!(
            ApiError::from(CredentialError::DuplicateEmail),
            ApiError::bad_request("Email already exists")
        );
        assert_eq!(
            ApiError::from(CredentialError::InvalidCredentials),
            ApiError::Unauthorized("Invalid credentials".into())
        );
        assert_eq!(
            ApiError::from(CredentialError::Cipher("bad tag".into())),
            ApiError::internal()
        );
    }

    #[test]
    fn test_lifecycle_mapping() {
        assert_eq!(
            ApiError::from(LifecycleError::AlreadyAnchored),
            ApiError::bad_request("Document already exists")
        );
        assert_eq!(
            ApiError::from(LifecycleError::Forbidden(Capability::VerifyDocuments)),
            ApiError::Forbidden
        );
        assert_eq!(
            ApiError::from(LifecycleError::NotFoundOrForbidden).to_string(),
            "Document not found or access denied"
        );
    }

    #[test]
    fn test_internal_details_hidden() {
        let err = ApiError::from(LifecycleError::Store(StoreError::Database(
            "disk I/O error at /var/lib/pv.db".into(),
        )));
        assert_eq!(err, ApiError::internal());

        let timeout = ApiError::from(LifecycleError::Ledger(LedgerError::ConfirmationTimeout {
            tx_hash: TxHash::from_bytes([1u8; 32]),
            waited: Duration::from_secs(30),
        }));
        assert!(timeout.to_string().contains("reconciled"));

        let refused = ApiError::from(LifecycleError::Ledger(LedgerError::Rpc(
            "connection refused".into(),
        )));
        assert_eq!(
            refused,
            ApiError::Internal("Ledger transaction failed".to_string())
        );
    }
}
