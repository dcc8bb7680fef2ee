//! # Credentials & Access (pv-02)
//!
//! The gate in front of the document lifecycle: who a caller is and what
//! their role allows.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Unique Email | Registration fails on a taken email, even under a race |
//! | 2 | Opaque Failures | Unknown email and wrong password return the same error |
//! | 3 | Sealed at Rest | Sensitive data is stored only as AES-256-GCM ciphertext |
//! | 4 | Role, not Identity | Privilege comes from `Role::grants`, never an email literal |
//!
//! ## Crate Structure
//!
//! - `domain/` - Password hashing, cipher, sessions, role policy, errors
//! - `service.rs` - `CredentialService` over any `CredentialStore`

pub mod domain;
pub mod service;

pub use domain::{
    hash_password, verify_password, CredentialError, CredentialResult, RolePolicy,
    SensitiveDataCipher, SessionStore, SessionToken,
};
pub use service::{CredentialService, Registration};
