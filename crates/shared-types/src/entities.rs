//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Identity**: `UserId`, `UserIdentity`, `Role`, `Capability`
//! - **Documents**: `Fingerprint`, `DocumentRecord`, `NotificationEvent`
//! - **Ledger**: `TxHash`, `TransactionReceipt`, `LedgerIntent`

use crate::errors::{FingerprintError, TxHashError, UnknownTag};
use primitive_types::H256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Primary key of a user identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Operations gated by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Anchor a new fingerprint.
    UploadDocuments,
    /// Revoke a fingerprint the caller owns.
    RevokeDocuments,
    /// Query the ledger for arbitrary fingerprints.
    VerifyDocuments,
    /// Read the notification log.
    ReadNotifications,
}

/// Authorization tier stored on the identity record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular account: manages its own documents.
    #[default]
    Member,
    /// Privileged account: may also verify and read notifications.
    Auditor,
}

impl Role {
    /// Capability predicate used by every privileged endpoint.
    pub fn grants(self, capability: Capability) -> bool {
        match capability {
            Capability::UploadDocuments | Capability::RevokeDocuments => true,
            Capability::VerifyDocuments | Capability::ReadNotifications => {
                matches!(self, Role::Auditor)
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Auditor => "auditor",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "auditor" => Ok(Role::Auditor),
            other => Err(UnknownTag {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserIdentity {
    pub id: UserId,
    pub username: String,
    /// Unique across the credential store.
    pub email: String,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// Base64 of nonce || AES-GCM ciphertext. `None` when never set.
    pub sensitive_data: Option<String>,
    pub role: Role,
}

impl UserIdentity {
    pub fn can(&self, capability: Capability) -> bool {
        self.role.grants(capability)
    }
}

/// Fields required to create an identity. The store assigns the id.
#[derive(Debug, Clone)]
pub struct NewIdentity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub sensitive_data: Option<String>,
    pub role: Role,
}

// =============================================================================
// CLUSTER B: DOCUMENTS
// =============================================================================

/// Caller-computed content hash. Opaque: stored and sent to the ledger
/// byte for byte, surrounding whitespace included.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Matches the width of the registry's fingerprint column.
    pub const MAX_LEN: usize = 300;

    /// Validate a raw fingerprint without normalizing it.
    pub fn parse(raw: &str) -> Result<Self, FingerprintError> {
        if raw.trim().is_empty() {
            return Err(FingerprintError::Empty);
        }
        let len = raw.chars().count();
        if len > Self::MAX_LEN {
            return Err(FingerprintError::TooLong {
                len,
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Fingerprint::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Local ownership record for an anchored fingerprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRecord {
    pub id: i64,
    pub owner: UserId,
    pub fingerprint: Fingerprint,
}

/// Append-only lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    pub id: i64,
    pub message: String,
}

/// Message appended when a fingerprint is anchored.
pub fn upload_notification(fingerprint: &Fingerprint) -> String {
    format!("New document uploaded with hash: {}", fingerprint)
}

// =============================================================================
// CLUSTER C: LEDGER
// =============================================================================

/// 32-byte transaction hash. Displays as `0x`-prefixed lowercase hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub H256);

impl TxHash {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(H256::from(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.0.as_fixed_bytes()
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for TxHash {
    type Err = TxHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits).map_err(|e| TxHashError::InvalidHex(e.to_string()))?;
        let fixed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TxHashError::InvalidLength(bytes.len()))?;
        Ok(Self::from_bytes(fixed))
    }
}

impl Serialize for TxHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for TxHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Final outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptStatus {
    Success,
    Reverted,
}

/// Receipt for a transaction that has been included in a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub status: ReceiptStatus,
}

impl TransactionReceipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }
}

/// Ledger mutation recorded in the intent journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntentKind {
    Register,
    Revoke,
}

impl IntentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IntentKind::Register => "register",
            IntentKind::Revoke => "revoke",
        }
    }
}

impl FromStr for IntentKind {
    type Err = UnknownTag;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "register" => Ok(IntentKind::Register),
            "revoke" => Ok(IntentKind::Revoke),
            other => Err(UnknownTag {
                kind: "intent",
                value: other.to_string(),
            }),
        }
    }
}

/// Primary key of an intent journal row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IntentId(pub i64);

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write-ahead record of an in-flight ledger transaction.
///
/// Opened before submission and closed in the same local transaction that
/// applies the confirmed outcome. A row that stays open means the ledger and
/// the local registry may disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerIntent {
    pub id: IntentId,
    pub kind: IntentKind,
    pub fingerprint: Fingerprint,
    pub owner: UserId,
    /// Set once the node accepted the submission.
    pub tx_hash: Option<TxHash>,
    /// Unix seconds.
    pub created_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_kept_verbatim_and_rejects_blank() {
        assert_eq!(Fingerprint::parse("  abc  ").unwrap().as_str(), "  abc  ");
        assert_ne!(
            Fingerprint::parse(" x ").unwrap(),
            Fingerprint::parse("x").unwrap()
        );
        assert_eq!(Fingerprint::parse("   "), Err(FingerprintError::Empty));
        assert_eq!(Fingerprint::parse(""), Err(FingerprintError::Empty));
    }

    #[test]
    fn test_fingerprint_length_bound() {
        let max = "a".repeat(Fingerprint::MAX_LEN);
        assert!(Fingerprint::parse(&max).is_ok());

        let over = "a".repeat(Fingerprint::MAX_LEN + 1);
        assert!(matches!(
            Fingerprint::parse(&over),
            Err(FingerprintError::TooLong { len: 301, max: 300 })
        ));
    }

    #[test]
    fn test_fingerprint_deserialize_validates() {
        let fp: Fingerprint = serde_json::from_str("\"hash1\"").unwrap();
        assert_eq!(fp.as_str(), "hash1");
        assert!(serde_json::from_str::<Fingerprint>("\"\"").is_err());
    }

    #[test]
    fn test_role_capabilities() {
        assert!(Role::Member.grants(Capability::UploadDocuments));
        assert!(Role::Member.grants(Capability::RevokeDocuments));
        assert!(!Role::Member.grants(Capability::VerifyDocuments));
        assert!(!Role::Member.grants(Capability::ReadNotifications));
        assert!(Role::Auditor.grants(Capability::VerifyDocuments));
        assert!(Role::Auditor.grants(Capability::ReadNotifications));
    }

    #[test]
    fn test_role_tags() {
        assert_eq!("auditor".parse::<Role>().unwrap(), Role::Auditor);
        assert_eq!(Role::Member.as_str(), "member");
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn test_tx_hash_hex_format() {
        let tx = TxHash::from_bytes([0xab; 32]);
        let hex = tx.to_hex();
        assert!(hex.starts_with("0xabab"));
        assert_eq!(hex.len(), 66);
        assert_eq!(hex.parse::<TxHash>().unwrap(), tx);
        assert_eq!(serde_json::to_string(&tx).unwrap(), format!("\"{}\"", hex));
    }

    #[test]
    fn test_tx_hash_rejects_short_input() {
        assert_eq!(
            "0xabcd".parse::<TxHash>(),
            Err(TxHashError::InvalidLength(2))
        );
        assert!(matches!(
            "0xzz".parse::<TxHash>(),
            Err(TxHashError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_upload_notification_message() {
        let fp = Fingerprint::parse("hash1").unwrap();
        assert_eq!(
            upload_notification(&fp),
            "New document uploaded with hash: hash1"
        );
    }

    #[test]
    fn test_intent_kind_tags() {
        assert_eq!("revoke".parse::<IntentKind>().unwrap(), IntentKind::Revoke);
        assert_eq!(IntentKind::Register.as_str(), "register");
        assert!("mint".parse::<IntentKind>().is_err());
    }
}
