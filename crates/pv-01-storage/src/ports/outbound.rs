//! # Outbound Ports (Driven Ports)
//!
//! Repository traits implemented by the storage adapters.
//!
//! Production: `SqliteStore` (adapters/sqlite.rs)
//! Testing: `InMemoryStore` (adapters/memory.rs)

use crate::adapters::migrations::MigrationReport;
use crate::domain::errors::StoreResult;
use async_trait::async_trait;
use shared_types::{
    DocumentRecord, Fingerprint, IntentId, IntentKind, LedgerIntent, NewIdentity,
    NotificationEvent, TxHash, UserId, UserIdentity,
};

/// Persistent table of user identities.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create an identity.
    ///
    /// Fails with `StoreError::DuplicateEmail` when the email is taken, even if
    /// a concurrent insert won the race after the caller's pre-check.
    async fn insert_identity(&self, identity: NewIdentity) -> StoreResult<UserIdentity>;

    async fn find_identity(&self, id: UserId) -> StoreResult<Option<UserIdentity>>;

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<UserIdentity>>;

    /// Replace the encrypted sensitive-data blob.
    async fn set_sensitive_data(&self, id: UserId, blob: Option<String>) -> StoreResult<()>;

    /// Make `Auditor` exactly the identities whose email is in
    /// `auditor_emails` (trimmed, lowercase); demote every other auditor.
    ///
    /// Runs in one transaction. Returns how many identities changed role.
    async fn sync_auditor_roles(&self, auditor_emails: &[String]) -> StoreResult<u64>;
}

/// Local index of fingerprint ownership.
#[async_trait]
pub trait DocumentRegistry: Send + Sync {
    async fn find_owned_document(
        &self,
        fingerprint: &Fingerprint,
        owner: UserId,
    ) -> StoreResult<Option<DocumentRecord>>;

    async fn documents_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StoreResult<Vec<DocumentRecord>>;

    async fn documents_for_owner(&self, owner: UserId) -> StoreResult<Vec<DocumentRecord>>;

    /// Apply a confirmed registration.
    ///
    /// ## Atomicity Guarantee (INVARIANT-2)
    ///
    /// Inserts the document row, appends `notification`, and closes `intent`
    /// in one transaction. Either all three are visible or none is.
    async fn commit_registration(
        &self,
        intent: IntentId,
        owner: UserId,
        fingerprint: &Fingerprint,
        notification: &str,
    ) -> StoreResult<(DocumentRecord, NotificationEvent)>;

    /// Apply a confirmed revocation.
    ///
    /// ## Atomicity Guarantee (INVARIANT-3)
    ///
    /// Deletes the document row and closes `intent` in one transaction.
    /// Returns `false` when the document row was already gone.
    async fn commit_revocation(&self, intent: IntentId, document_id: i64) -> StoreResult<bool>;
}

/// Append-only event log. Events are written only by
/// `DocumentRegistry::commit_registration`, together with their record.
#[async_trait]
pub trait NotificationLog: Send + Sync {
    /// All events in insertion order.
    async fn notifications(&self) -> StoreResult<Vec<NotificationEvent>>;
}

/// Write-ahead journal of ledger transactions whose outcome is not yet applied.
#[async_trait]
pub trait IntentJournal: Send + Sync {
    async fn open_intent(
        &self,
        kind: IntentKind,
        fingerprint: &Fingerprint,
        owner: UserId,
        created_at: i64,
    ) -> StoreResult<LedgerIntent>;

    async fn attach_tx_hash(&self, intent: IntentId, tx_hash: TxHash) -> StoreResult<()>;

    /// Close an intent whose ledger outcome needs no local change.
    async fn close_intent(&self, intent: IntentId) -> StoreResult<()>;

    /// Open intents, oldest first.
    async fn open_intents(&self) -> StoreResult<Vec<LedgerIntent>>;
}

/// Combined store used by the services.
#[async_trait]
pub trait ProvenanceStore:
    CredentialStore + DocumentRegistry + NotificationLog + IntentJournal + Send + Sync
{
    /// Bring the schema up to date (INVARIANT-5).
    async fn migrate(&self) -> StoreResult<MigrationReport>;

    /// Check connectivity.
    async fn health_check(&self) -> StoreResult<()>;
}
