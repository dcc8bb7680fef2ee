//! # Provenance Storage (pv-01)
//!
//! The local relational store behind the document-provenance service. It holds
//! four tables:
//!
//! ```text
//! users ──< documents          (owner foreign key)
//!   └────< ledger_intents      (write-ahead journal for ledger transactions)
//! notifications                (append-only)
//! ```
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Unique Email | Two identities never share an email |
//! | 2 | Atomic Registration | Document row, notification and intent close commit together |
//! | 3 | Atomic Revocation | Document delete and intent close commit together |
//! | 4 | Append-only Log | Notifications are never updated or deleted |
//! | 5 | Additive Schema | Migrations only create tables or add columns |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Error types
//! - `ports/` - Repository traits (driven ports)
//! - `adapters/` - SQLite (sqlx) and in-memory implementations
//!
//! ## Usage
//!
//! ```ignore
//! use pv_01_storage::{SqliteStore, ProvenanceStore};
//!
//! let store = SqliteStore::connect("sqlite://provenance.db", 4).await?;
//! store.migrate().await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::memory::InMemoryStore;
pub use adapters::migrations::MigrationReport;
pub use adapters::sqlite::SqliteStore;
pub use domain::errors::{StoreError, StoreResult};
pub use ports::outbound::{
    CredentialStore, DocumentRegistry, IntentJournal, NotificationLog, ProvenanceStore,
};
