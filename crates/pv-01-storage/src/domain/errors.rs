//! # Domain Errors
//!
//! Error types for the storage subsystem.
//!
//! - Each variant maps to one failure mode callers can act on
//! - Backend specifics are flattened into `Database` so ports stay adapter-agnostic

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// An identity with this email already exists (INVARIANT-1).
    #[error("email already registered: {email}")]
    DuplicateEmail { email: String },

    /// Referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: i64 },

    /// A stored value could not be mapped back to a domain type.
    #[error("corrupt row in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },

    /// Schema migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database I/O or driver error.
    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    pub fn corrupt(table: &'static str, reason: impl ToString) -> Self {
        StoreError::Corrupt {
            table,
            reason: reason.to_string(),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
