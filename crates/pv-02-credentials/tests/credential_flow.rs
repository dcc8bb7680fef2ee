//! Registration and login against the SQLite store.

use pv_01_storage::{CredentialStore, SqliteStore};
use pv_02_credentials::{
    CredentialError, CredentialService, Registration, RolePolicy, SensitiveDataCipher,
};
use shared_types::{Capability, Role};
use std::sync::Arc;

async fn service() -> (Arc<SqliteStore>, CredentialService<SqliteStore>) {
    let store = Arc::new(SqliteStore::in_memory().await.unwrap());
    let cipher = SensitiveDataCipher::from_base64_key(&SensitiveDataCipher::generate_key()).unwrap();
    let svc = CredentialService::new(store.clone(), cipher, RolePolicy::new(["dev@gmail.com"]));
    (store, svc)
}

fn registration(email: &str, password: &str, sensitive: Option<&str>) -> Registration {
    Registration {
        username: "user".into(),
        email: email.into(),
        password: password.into(),
        sensitive_info: sensitive.map(str::to_string),
    }
}

#[tokio::test]
async fn test_register_then_login() {
    let (_, svc) = service().await;
    let user = svc
        .register(registration("a@x.com", "correct horse", None))
        .await
        .unwrap();

    let logged_in = svc.authenticate("a@x.com", "correct horse").await.unwrap();
    assert_eq!(logged_in.id, user.id);
    assert!(logged_in.password_hash.starts_with("$argon2id$"));
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let (_, svc) = service().await;
    svc.register(registration("a@x.com", "pw", None))
        .await
        .unwrap();

    assert_eq!(
        svc.authenticate("a@x.com", "wrong").await,
        Err(CredentialError::InvalidCredentials)
    );
    assert_eq!(
        svc.authenticate("nobody@x.com", "pw").await,
        Err(CredentialError::InvalidCredentials)
    );
}

#[tokio::test]
async fn test_duplicate_email_rejected() {
    let (_, svc) = service().await;
    svc.register(registration("a@x.com", "pw", None))
        .await
        .unwrap();

    assert_eq!(
        svc.register(registration("a@x.com", "other", None)).await,
        Err(CredentialError::DuplicateEmail)
    );
}

#[tokio::test]
async fn test_sensitive_data_is_encrypted_at_rest() {
    let (store, svc) = service().await;
    let user = svc
        .register(registration("a@x.com", "pw", Some("passport 991")))
        .await
        .unwrap();

    let row = store.find_identity(user.id).await.unwrap().unwrap();
    let blob = row.sensitive_data.unwrap();
    assert!(!blob.contains("passport"));

    assert_eq!(
        svc.reveal_sensitive_data(user.id).await.unwrap().as_deref(),
        Some("passport 991")
    );
}

#[tokio::test]
async fn test_configured_auditor_gets_privileges() {
    let (_, svc) = service().await;
    let dev = svc
        .register(registration("dev@gmail.com", "pw", None))
        .await
        .unwrap();
    let member = svc
        .register(registration("m@x.com", "pw", None))
        .await
        .unwrap();

    assert_eq!(dev.role, Role::Auditor);
    assert!(dev.can(Capability::VerifyDocuments));
    assert!(!member.can(Capability::ReadNotifications));
}
