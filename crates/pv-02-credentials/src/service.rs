//! # Credential Service
//!
//! Registration, login and the encrypted sensitive-data field.
//!
//! Argon2 work runs on the blocking pool so a burst of logins never stalls
//! the async workers.

use crate::domain::cipher::SensitiveDataCipher;
use crate::domain::errors::{CredentialError, CredentialResult};
use crate::domain::password::{hash_password, verify_password};
use crate::domain::policy::RolePolicy;
use pv_01_storage::CredentialStore;
use shared_types::{NewIdentity, UserId, UserIdentity};
use std::sync::Arc;
use tracing::{debug, info};

/// Input for `CredentialService::register`.
#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub sensitive_info: Option<String>,
}

/// Identity management over a `CredentialStore`.
pub struct CredentialService<S: ?Sized> {
    store: Arc<S>,
    cipher: SensitiveDataCipher,
    policy: RolePolicy,
}

impl<S> CredentialService<S>
where
    S: CredentialStore + ?Sized,
{
    pub fn new(store: Arc<S>, cipher: SensitiveDataCipher, policy: RolePolicy) -> Self {
        Self {
            store,
            cipher,
            policy,
        }
    }

    /// Create an identity.
    ///
    /// Rejects blank fields and taken emails. A non-empty `sensitive_info` is
    /// encrypted before it reaches the store; blank means no value.
    pub async fn register(&self, registration: Registration) -> CredentialResult<UserIdentity> {
        let username = required("username", &registration.username)?;
        let email = required("email", &registration.email)?;
        if registration.password.is_empty() {
            return Err(CredentialError::InvalidInput("password is required".into()));
        }

        if self.store.find_identity_by_email(&email).await?.is_some() {
            return Err(CredentialError::DuplicateEmail);
        }

        let sensitive_data = self.seal(registration.sensitive_info.as_deref())?;
        let password_hash = hash_blocking(registration.password).await?;
        let role = self.policy.role_for(&email);

        let identity = self
            .store
            .insert_identity(NewIdentity {
                username,
                email,
                password_hash,
                sensitive_data,
                role,
            })
            .await?;

        info!(
            user_id = %identity.id,
            role = identity.role.as_str(),
            "Registered identity"
        );
        Ok(identity)
    }

    /// Re-apply the role policy to identities that already exist.
    ///
    /// Covers rows created before the role column existed and emails added
    /// to or removed from the auditor list since registration.
    pub async fn sync_roles(&self) -> CredentialResult<u64> {
        let emails = self.policy.auditor_emails();
        let changed = self.store.sync_auditor_roles(&emails).await?;
        if changed > 0 {
            info!(
                changed = changed,
                auditors = emails.len(),
                "Applied role policy to existing identities"
            );
        }
        Ok(changed)
    }

    /// Verify an email/password pair.
    pub async fn authenticate(&self, email: &str, password: &str) -> CredentialResult<UserIdentity> {
        let Some(identity) = self.store.find_identity_by_email(email.trim()).await? else {
            debug!("Login for unknown email");
            return Err(CredentialError::InvalidCredentials);
        };

        let phc = identity.password_hash.clone();
        let candidate = password.to_string();
        let ok = tokio::task::spawn_blocking(move || verify_password(&candidate, &phc))
            .await
            .map_err(|e| CredentialError::Hashing(e.to_string()))?;

        if !ok {
            debug!(user_id = %identity.id, "Login with wrong password");
            return Err(CredentialError::InvalidCredentials);
        }
        Ok(identity)
    }

    /// Look up an identity by id, failing if it is gone.
    pub async fn identity(&self, id: UserId) -> CredentialResult<UserIdentity> {
        self.store
            .find_identity(id)
            .await?
            .ok_or(CredentialError::UnknownUser(id))
    }

    /// Replace the caller's sensitive data. Blank or `None` clears it.
    pub async fn update_sensitive_data(
        &self,
        id: UserId,
        plaintext: Option<&str>,
    ) -> CredentialResult<()> {
        let blob = self.seal(plaintext)?;
        self.store.set_sensitive_data(id, blob).await?;
        Ok(())
    }

    /// Decrypt the caller's sensitive data.
    pub async fn reveal_sensitive_data(&self, id: UserId) -> CredentialResult<Option<String>> {
        let identity = self.identity(id).await?;
        identity
            .sensitive_data
            .as_deref()
            .map(|blob| self.cipher.decrypt(blob))
            .transpose()
    }

    fn seal(&self, plaintext: Option<&str>) -> CredentialResult<Option<String>> {
        match plaintext {
            Some(text) if !text.trim().is_empty() => Ok(Some(self.cipher.encrypt(text)?)),
            _ => Ok(None),
        }
    }
}

fn required(field: &str, value: &str) -> CredentialResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CredentialError::InvalidInput(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

async fn hash_blocking(password: String) -> CredentialResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CredentialError::Hashing(e.to_string()))?
}
