use crate::adapters::migrations::MigrationReport;
use crate::domain::errors::{StoreError, StoreResult};
use crate::ports::outbound::{
    CredentialStore, DocumentRegistry, IntentJournal, NotificationLog, ProvenanceStore,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{
    DocumentRecord, Fingerprint, IntentId, IntentKind, LedgerIntent, NewIdentity,
    NotificationEvent, Role, TxHash, UserId, UserIdentity,
};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserIdentity>,
    documents: BTreeMap<i64, DocumentRecord>,
    notifications: Vec<NotificationEvent>,
    intents: BTreeMap<i64, LedgerIntent>,
    next_user: i64,
    next_document: i64,
    next_notification: i64,
    next_intent: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// In-memory provenance store for unit tests and the development node.
///
/// All tables sit behind one lock, so each trait call is atomic.
/// Production uses `SqliteStore` with real transactions.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    fail_commits: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `commit_registration` and `commit_revocation` fail with a
    /// database error, leaving every table untouched.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    fn check_commit(&self) -> StoreResult<()> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected commit failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn insert_identity(&self, identity: NewIdentity) -> StoreResult<UserIdentity> {
        let mut t = self.tables.write();
        if t.users.values().any(|u| u.email == identity.email) {
            return Err(StoreError::DuplicateEmail {
                email: identity.email,
            });
        }

        let id = next(&mut t.next_user);
        let user = UserIdentity {
            id: UserId(id),
            username: identity.username,
            email: identity.email,
            password_hash: identity.password_hash,
            sensitive_data: identity.sensitive_data,
            role: identity.role,
        };
        t.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_identity(&self, id: UserId) -> StoreResult<Option<UserIdentity>> {
        Ok(self.tables.read().users.get(&id.0).cloned())
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<UserIdentity>> {
        Ok(self
            .tables
            .read()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_sensitive_data(&self, id: UserId, blob: Option<String>) -> StoreResult<()> {
        let mut t = self.tables.write();
        let user = t.users.get_mut(&id.0).ok_or(StoreError::NotFound {
            entity: "user",
            id: id.0,
        })?;
        user.sensitive_data = blob;
        Ok(())
    }

    async fn sync_auditor_roles(&self, auditor_emails: &[String]) -> StoreResult<u64> {
        let mut t = self.tables.write();
        let mut changed = 0;
        for user in t.users.values_mut() {
            let email = user.email.trim().to_ascii_lowercase();
            let role = if auditor_emails.contains(&email) {
                Role::Auditor
            } else {
                Role::Member
            };
            if user.role != role {
                user.role = role;
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl DocumentRegistry for InMemoryStore {
    async fn find_owned_document(
        &self,
        fingerprint: &Fingerprint,
        owner: UserId,
    ) -> StoreResult<Option<DocumentRecord>> {
        Ok(self
            .tables
            .read()
            .documents
            .values()
            .find(|d| d.owner == owner && &d.fingerprint == fingerprint)
            .cloned())
    }

    async fn documents_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StoreResult<Vec<DocumentRecord>> {
        Ok(self
            .tables
            .read()
            .documents
            .values()
            .filter(|d| &d.fingerprint == fingerprint)
            .cloned()
            .collect())
    }

    async fn documents_for_owner(&self, owner: UserId) -> StoreResult<Vec<DocumentRecord>> {
        Ok(self
            .tables
            .read()
            .documents
            .values()
            .filter(|d| d.owner == owner)
            .cloned()
            .collect())
    }

    async fn commit_registration(
        &self,
        intent: IntentId,
        owner: UserId,
        fingerprint: &Fingerprint,
        notification: &str,
    ) -> StoreResult<(DocumentRecord, NotificationEvent)> {
        self.check_commit()?;

        let mut t = self.tables.write();
        if !t.intents.contains_key(&intent.0) {
            return Err(StoreError::NotFound {
                entity: "intent",
                id: intent.0,
            });
        }
        if !t.users.contains_key(&owner.0) {
            return Err(StoreError::NotFound {
                entity: "user",
                id: owner.0,
            });
        }

        let document = DocumentRecord {
            id: next(&mut t.next_document),
            owner,
            fingerprint: fingerprint.clone(),
        };
        let event = NotificationEvent {
            id: next(&mut t.next_notification),
            message: notification.to_string(),
        };

        t.documents.insert(document.id, document.clone());
        t.notifications.push(event.clone());
        t.intents.remove(&intent.0);
        Ok((document, event))
    }

    async fn commit_revocation(&self, intent: IntentId, document_id: i64) -> StoreResult<bool> {
        self.check_commit()?;

        let mut t = self.tables.write();
        if !t.intents.contains_key(&intent.0) {
            return Err(StoreError::NotFound {
                entity: "intent",
                id: intent.0,
            });
        }

        let deleted = t.documents.remove(&document_id).is_some();
        t.intents.remove(&intent.0);
        Ok(deleted)
    }
}

#[async_trait]
impl NotificationLog for InMemoryStore {
    async fn notifications(&self) -> StoreResult<Vec<NotificationEvent>> {
        Ok(self.tables.read().notifications.clone())
    }
}

#[async_trait]
impl IntentJournal for InMemoryStore {
    async fn open_intent(
        &self,
        kind: IntentKind,
        fingerprint: &Fingerprint,
        owner: UserId,
        created_at: i64,
    ) -> StoreResult<LedgerIntent> {
        let mut t = self.tables.write();
        let intent = LedgerIntent {
            id: IntentId(next(&mut t.next_intent)),
            kind,
            fingerprint: fingerprint.clone(),
            owner,
            tx_hash: None,
            created_at,
        };
        t.intents.insert(intent.id.0, intent.clone());
        Ok(intent)
    }

    async fn attach_tx_hash(&self, intent: IntentId, tx_hash: TxHash) -> StoreResult<()> {
        let mut t = self.tables.write();
        let row = t.intents.get_mut(&intent.0).ok_or(StoreError::NotFound {
            entity: "intent",
            id: intent.0,
        })?;
        row.tx_hash = Some(tx_hash);
        Ok(())
    }

    async fn close_intent(&self, intent: IntentId) -> StoreResult<()> {
        self.tables.write().intents.remove(&intent.0);
        Ok(())
    }

    async fn open_intents(&self) -> StoreResult<Vec<LedgerIntent>> {
        let mut intents: Vec<_> = self.tables.read().intents.values().cloned().collect();
        intents.sort_by_key(|i| (i.created_at, i.id));
        Ok(intents)
    }
}

#[async_trait]
impl ProvenanceStore for InMemoryStore {
    async fn migrate(&self) -> StoreResult<MigrationReport> {
        Ok(MigrationReport::default())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}
