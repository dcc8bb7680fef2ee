//! # Domain Errors
//!
//! Error types for the credential subsystem.

use pv_01_storage::StoreError;
use shared_types::UserId;
use thiserror::Error;

/// Errors returned by credential operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Registration with an email that already has an identity.
    #[error("email already registered")]
    DuplicateEmail,

    /// Unknown email or wrong password. The two cases are not distinguished.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Required registration field missing or blank.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Identity referenced by a session or caller no longer exists.
    #[error("unknown user: {0}")]
    UnknownUser(UserId),

    /// Encryption key is malformed.
    #[error("invalid encryption key: {0}")]
    InvalidKey(String),

    /// Encryption or decryption failed (wrong key, tampered blob).
    #[error("cipher error: {0}")]
    Cipher(String),

    /// Password hashing failed.
    #[error("password hashing error: {0}")]
    Hashing(String),

    /// Underlying store failure.
    #[error("store error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for CredentialError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::DuplicateEmail { .. } => CredentialError::DuplicateEmail,
            other => CredentialError::Store(other),
        }
    }
}

/// Result type for credential operations.
pub type CredentialResult<T> = Result<T, CredentialError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_duplicate_maps_to_duplicate_email() {
        let err: CredentialError = StoreError::DuplicateEmail {
            email: "a@x.com".into(),
        }
        .into();
        assert_eq!(err, CredentialError::DuplicateEmail);

        let err: CredentialError = StoreError::Database("io".into()).into();
        assert!(matches!(err, CredentialError::Store(_)));
    }
}
