//! Domain layer for the credential crate.

pub mod cipher;
pub mod errors;
pub mod password;
pub mod policy;
pub mod session;

pub use cipher::SensitiveDataCipher;
pub use errors::{CredentialError, CredentialResult};
pub use password::{hash_password, verify_password};
pub use policy::RolePolicy;
pub use session::{SessionStore, SessionToken};
