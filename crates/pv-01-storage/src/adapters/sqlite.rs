//! SQLite-backed provenance store.

use crate::adapters::migrations::{self, MigrationReport};
use crate::domain::errors::{StoreError, StoreResult};
use crate::ports::outbound::{
    CredentialStore, DocumentRegistry, IntentJournal, NotificationLog, ProvenanceStore,
};
use async_trait::async_trait;
use shared_types::{
    DocumentRecord, Fingerprint, IntentId, IntentKind, LedgerIntent, NewIdentity,
    NotificationEvent, Role, TxHash, UserId, UserIdentity,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e.to_string())
    }
}

/// SQLite store.
///
/// In-memory URLs (`sqlite::memory:`) are pinned to one long-lived connection,
/// otherwise every pooled connection would see its own empty database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url`.
    pub async fn connect(url: &str, max_connections: u32) -> StoreResult<Self> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut opts = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));
        if !in_memory {
            opts = opts
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal);
        }

        let pool_opts = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(max_connections.max(1))
        };

        let pool = pool_opts.connect_with(opts).await?;
        debug!(url = url, in_memory = in_memory, "Opened SQLite pool");
        Ok(Self { pool })
    }

    /// Fresh in-memory database with the schema applied.
    pub async fn in_memory() -> StoreResult<Self> {
        let store = Self::connect("sqlite::memory:", 1).await?;
        store.migrate().await?;
        Ok(store)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

// =============================================================================
// ROW MAPPING
// =============================================================================

#[derive(FromRow)]
struct IdentityRow {
    id: i64,
    username: String,
    email: String,
    password_hash: String,
    sensitive_data: Option<String>,
    role: String,
}

impl TryFrom<IdentityRow> for UserIdentity {
    type Error = StoreError;

    fn try_from(row: IdentityRow) -> Result<Self, Self::Error> {
        Ok(UserIdentity {
            id: UserId(row.id),
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            sensitive_data: row.sensitive_data,
            role: row.role.parse().map_err(|e| StoreError::corrupt("users", e))?,
        })
    }
}

#[derive(FromRow)]
struct DocumentRow {
    id: i64,
    user_id: i64,
    document_hash: String,
}

impl TryFrom<DocumentRow> for DocumentRecord {
    type Error = StoreError;

    fn try_from(row: DocumentRow) -> Result<Self, Self::Error> {
        Ok(DocumentRecord {
            id: row.id,
            owner: UserId(row.user_id),
            fingerprint: Fingerprint::parse(&row.document_hash)
                .map_err(|e| StoreError::corrupt("documents", e))?,
        })
    }
}

#[derive(FromRow)]
struct NotificationRow {
    id: i64,
    message: String,
}

impl From<NotificationRow> for NotificationEvent {
    fn from(row: NotificationRow) -> Self {
        NotificationEvent {
            id: row.id,
            message: row.message,
        }
    }
}

#[derive(FromRow)]
struct IntentRow {
    id: i64,
    kind: String,
    fingerprint: String,
    owner_id: i64,
    tx_hash: Option<String>,
    created_at: i64,
}

impl TryFrom<IntentRow> for LedgerIntent {
    type Error = StoreError;

    fn try_from(row: IntentRow) -> Result<Self, Self::Error> {
        let tx_hash = row
            .tx_hash
            .as_deref()
            .map(TxHash::from_str)
            .transpose()
            .map_err(|e| StoreError::corrupt("ledger_intents", e))?;

        Ok(LedgerIntent {
            id: IntentId(row.id),
            kind: row
                .kind
                .parse()
                .map_err(|e| StoreError::corrupt("ledger_intents", e))?,
            fingerprint: Fingerprint::parse(&row.fingerprint)
                .map_err(|e| StoreError::corrupt("ledger_intents", e))?,
            owner: UserId(row.owner_id),
            tx_hash,
            created_at: row.created_at,
        })
    }
}

const IDENTITY_COLUMNS: &str = "id, username, email, password_hash, sensitive_data, role";

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

// =============================================================================
// PORT IMPLEMENTATIONS
// =============================================================================

#[async_trait]
impl CredentialStore for SqliteStore {
    async fn insert_identity(&self, identity: NewIdentity) -> StoreResult<UserIdentity> {
        let result = sqlx::query(
            "INSERT INTO users (username, email, password_hash, sensitive_data, role)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&identity.username)
        .bind(&identity.email)
        .bind(&identity.password_hash)
        .bind(&identity.sensitive_data)
        .bind(identity.role.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) => Ok(UserIdentity {
                id: UserId(done.last_insert_rowid()),
                username: identity.username,
                email: identity.email,
                password_hash: identity.password_hash,
                sensitive_data: identity.sensitive_data,
                role: identity.role,
            }),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail {
                email: identity.email,
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_identity(&self, id: UserId) -> StoreResult<Option<UserIdentity>> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE id = ?",
            IDENTITY_COLUMNS
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserIdentity::try_from).transpose()
    }

    async fn find_identity_by_email(&self, email: &str) -> StoreResult<Option<UserIdentity>> {
        let row: Option<IdentityRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users WHERE email = ?",
            IDENTITY_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserIdentity::try_from).transpose()
    }

    async fn set_sensitive_data(&self, id: UserId, blob: Option<String>) -> StoreResult<()> {
        let done = sqlx::query("UPDATE users SET sensitive_data = ? WHERE id = ?")
            .bind(blob)
            .bind(id.0)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "user",
                id: id.0,
            });
        }
        Ok(())
    }

    async fn sync_auditor_roles(&self, auditor_emails: &[String]) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;
        let mut changed = 0;

        for email in auditor_emails {
            changed += sqlx::query(
                "UPDATE users SET role = ? WHERE lower(trim(email)) = ? AND role <> ?",
            )
            .bind(Role::Auditor.as_str())
            .bind(email)
            .bind(Role::Auditor.as_str())
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        let mut demote = QueryBuilder::<Sqlite>::new("UPDATE users SET role = ");
        demote
            .push_bind(Role::Member.as_str())
            .push(" WHERE role = ")
            .push_bind(Role::Auditor.as_str());
        if !auditor_emails.is_empty() {
            demote.push(" AND lower(trim(email)) NOT IN (");
            let mut list = demote.separated(", ");
            for email in auditor_emails {
                list.push_bind(email);
            }
            list.push_unseparated(")");
        }
        changed += demote.build().execute(&mut *tx).await?.rows_affected();

        tx.commit().await?;
        if changed > 0 {
            debug!(changed = changed, "Synchronized auditor roles");
        }
        Ok(changed)
    }
}

#[async_trait]
impl DocumentRegistry for SqliteStore {
    async fn find_owned_document(
        &self,
        fingerprint: &Fingerprint,
        owner: UserId,
    ) -> StoreResult<Option<DocumentRecord>> {
        let row: Option<DocumentRow> = sqlx::query_as(
            "SELECT id, user_id, document_hash FROM documents
             WHERE document_hash = ? AND user_id = ?
             ORDER BY id LIMIT 1",
        )
        .bind(fingerprint.as_str())
        .bind(owner.0)
        .fetch_optional(&self.pool)
        .await?;

        row.map(DocumentRecord::try_from).transpose()
    }

    async fn documents_for_fingerprint(
        &self,
        fingerprint: &Fingerprint,
    ) -> StoreResult<Vec<DocumentRecord>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, user_id, document_hash FROM documents WHERE document_hash = ? ORDER BY id",
        )
        .bind(fingerprint.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRecord::try_from).collect()
    }

    async fn documents_for_owner(&self, owner: UserId) -> StoreResult<Vec<DocumentRecord>> {
        let rows: Vec<DocumentRow> = sqlx::query_as(
            "SELECT id, user_id, document_hash FROM documents WHERE user_id = ? ORDER BY id",
        )
        .bind(owner.0)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(DocumentRecord::try_from).collect()
    }

    async fn commit_registration(
        &self,
        intent: IntentId,
        owner: UserId,
        fingerprint: &Fingerprint,
        notification: &str,
    ) -> StoreResult<(DocumentRecord, NotificationEvent)> {
        let mut tx = self.pool.begin().await?;

        let document_id = sqlx::query("INSERT INTO documents (user_id, document_hash) VALUES (?, ?)")
            .bind(owner.0)
            .bind(fingerprint.as_str())
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let notification_id = sqlx::query("INSERT INTO notifications (message) VALUES (?)")
            .bind(notification)
            .execute(&mut *tx)
            .await?
            .last_insert_rowid();

        let closed = sqlx::query("DELETE FROM ledger_intents WHERE id = ?")
            .bind(intent.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if closed == 0 {
            // Dropping `tx` rolls back the two inserts.
            return Err(StoreError::NotFound {
                entity: "intent",
                id: intent.0,
            });
        }

        tx.commit().await?;

        Ok((
            DocumentRecord {
                id: document_id,
                owner,
                fingerprint: fingerprint.clone(),
            },
            NotificationEvent {
                id: notification_id,
                message: notification.to_string(),
            },
        ))
    }

    async fn commit_revocation(&self, intent: IntentId, document_id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let closed = sqlx::query("DELETE FROM ledger_intents WHERE id = ?")
            .bind(intent.0)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if closed == 0 {
            return Err(StoreError::NotFound {
                entity: "intent",
                id: intent.0,
            });
        }

        tx.commit().await?;
        Ok(deleted > 0)
    }
}

#[async_trait]
impl NotificationLog for SqliteStore {
    async fn notifications(&self) -> StoreResult<Vec<NotificationEvent>> {
        let rows: Vec<NotificationRow> =
            sqlx::query_as("SELECT id, message FROM notifications ORDER BY id")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(NotificationEvent::from).collect())
    }
}

#[async_trait]
impl IntentJournal for SqliteStore {
    async fn open_intent(
        &self,
        kind: IntentKind,
        fingerprint: &Fingerprint,
        owner: UserId,
        created_at: i64,
    ) -> StoreResult<LedgerIntent> {
        let id = sqlx::query(
            "INSERT INTO ledger_intents (kind, fingerprint, owner_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(kind.as_str())
        .bind(fingerprint.as_str())
        .bind(owner.0)
        .bind(created_at)
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        Ok(LedgerIntent {
            id: IntentId(id),
            kind,
            fingerprint: fingerprint.clone(),
            owner,
            tx_hash: None,
            created_at,
        })
    }

    async fn attach_tx_hash(&self, intent: IntentId, tx_hash: TxHash) -> StoreResult<()> {
        let done = sqlx::query("UPDATE ledger_intents SET tx_hash = ? WHERE id = ?")
            .bind(tx_hash.to_hex())
            .bind(intent.0)
            .execute(&self.pool)
            .await?;

        if done.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: "intent",
                id: intent.0,
            });
        }
        Ok(())
    }

    async fn close_intent(&self, intent: IntentId) -> StoreResult<()> {
        sqlx::query("DELETE FROM ledger_intents WHERE id = ?")
            .bind(intent.0)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn open_intents(&self) -> StoreResult<Vec<LedgerIntent>> {
        let rows: Vec<IntentRow> = sqlx::query_as(
            "SELECT id, kind, fingerprint, owner_id, tx_hash, created_at
             FROM ledger_intents ORDER BY created_at, id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LedgerIntent::try_from).collect()
    }
}

#[async_trait]
impl ProvenanceStore for SqliteStore {
    async fn migrate(&self) -> StoreResult<MigrationReport> {
        migrations::run(&self.pool).await
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
