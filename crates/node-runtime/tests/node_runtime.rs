//! Node wiring against a file-backed SQLite database and the in-memory ledger.

use node_runtime::container::{ConfigError, LedgerBackend};
use node_runtime::{AppContainer, NodeConfig, NodeRuntime};
use pv_01_storage::DocumentRegistry;
use pv_02_credentials::Registration;
use shared_types::Capability;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

const KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";

fn memory_config(db: &Path) -> NodeConfig {
    let mut config = NodeConfig::default();
    config.http.port = 0;
    config.storage.database_url = format!("sqlite://{}", db.display());
    config.ledger.backend = LedgerBackend::Memory;
    config.ledger.confirmation_timeout = Duration::from_millis(500);
    config.ledger.poll_interval = Duration::from_millis(10);
    config.security.encryption_key = Some(KEY.to_string());
    config.security.auditor_emails = vec!["dev@x.com".to_string()];
    config
}

#[tokio::test]
async fn test_state_survives_container_rebuild() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("provenance.db");

    let alice_id = {
        let container = AppContainer::build(memory_config(&db)).await.unwrap();
        let alice = container
            .credentials
            .register(Registration {
                username: "alice".into(),
                email: "alice@x.com".into(),
                password: "pw".into(),
                sensitive_info: Some("secret".into()),
            })
            .await
            .unwrap();
        container.coordinator.upload(&alice, "hash1").await.unwrap();
        alice.id
    };

    let container = AppContainer::build(memory_config(&db)).await.unwrap();
    let alice = container
        .credentials
        .authenticate("alice@x.com", "pw")
        .await
        .unwrap();
    assert_eq!(alice.id, alice_id);

    let docs = container.store.documents_for_owner(alice.id).await.unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].fingerprint.as_str(), "hash1");
}

async fn http(addr: SocketAddr, request: String) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_auditor_added_after_registration_gains_access_on_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("provenance.db");

    let mut before = memory_config(&db);
    before.security.auditor_emails = Vec::new();
    {
        let container = AppContainer::build(before).await.unwrap();
        let dev = container
            .credentials
            .register(Registration {
                username: "dev".into(),
                email: "dev@x.com".into(),
                password: "pw".into(),
                sensitive_info: None,
            })
            .await
            .unwrap();
        assert!(!dev.can(Capability::ReadNotifications));
    }

    let mut runtime = NodeRuntime::new(memory_config(&db)).await.unwrap();
    let addr = runtime.start().await.unwrap();

    let body = r#"{"email":"dev@x.com","password":"pw"}"#;
    let login = http(
        addr,
        format!(
            "POST /login HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/json\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        ),
    )
    .await;
    assert!(login.starts_with("HTTP/1.1 200"), "{login}");
    let cookie = login
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("set-cookie")
                .then(|| value.trim().split(';').next().unwrap_or_default().to_string())
        })
        .expect("session cookie");

    let notifications = http(
        addr,
        format!(
            "GET /notifications HTTP/1.1\r\nHost: localhost\r\nCookie: {cookie}\r\n\
             Connection: close\r\n\r\n"
        ),
    )
    .await;
    assert!(notifications.starts_with("HTTP/1.1 200"), "{notifications}");

    tokio::time::timeout(Duration::from_secs(15), runtime.shutdown())
        .await
        .expect("shutdown hung");
}

#[tokio::test]
async fn test_build_rejects_missing_encryption_key() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = memory_config(&dir.path().join("provenance.db"));
    config.security.encryption_key = None;

    let err = AppContainer::build(config).await.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::MissingEncryptionKey)
    ));
}

#[tokio::test]
async fn test_runtime_serves_health_and_shuts_down() {
    let dir = tempfile::tempdir().unwrap();
    let mut runtime = NodeRuntime::new(memory_config(&dir.path().join("provenance.db")))
        .await
        .unwrap();
    let addr = runtime.start().await.unwrap();
    assert_ne!(addr.port(), 0);

    let response = http(
        addr,
        "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n".to_string(),
    )
    .await;
    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"status\":\"ok\""), "{response}");

    tokio::time::timeout(Duration::from_secs(15), runtime.shutdown())
        .await
        .expect("shutdown hung");
}
