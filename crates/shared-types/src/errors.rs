//! # Error Types
//!
//! Validation errors for the shared value objects.

use thiserror::Error;

/// Reasons a caller-supplied fingerprint is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FingerprintError {
    /// Fingerprint was empty or whitespace only.
    #[error("fingerprint must not be empty")]
    Empty,

    /// Fingerprint longer than the registry column allows.
    #[error("fingerprint too long: {len} > {max} characters")]
    TooLong { len: usize, max: usize },
}

/// Errors parsing a transaction hash from its hex form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TxHashError {
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("transaction hash must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Unknown role or intent tag read back from storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} tag: {value}")]
pub struct UnknownTag {
    pub kind: &'static str,
    pub value: String,
}
