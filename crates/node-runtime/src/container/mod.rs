//! # Application Container
//!
//! Builds every service once at startup and hands out `Arc` handles.
//!
//! ## Construction Order
//!
//! 1. Validate configuration
//! 2. Open the SQLite store and bring the schema up to date
//! 3. Select the ledger backend
//! 4. Credential service, then re-apply auditor roles to existing users
//! 5. Session store and lifecycle coordinator

pub mod config;

pub use config::{
    ConfigError, HttpSettings, LedgerBackend, LedgerConfig, NodeConfig, ReconcilerConfig,
    SecurityConfig, StorageConfig,
};

use anyhow::{Context, Result};
use pv_01_storage::{ProvenanceStore, SqliteStore};
use pv_02_credentials::{CredentialService, RolePolicy, SensitiveDataCipher, SessionStore};
use pv_03_ledger_client::{
    ConfirmationPolicy, InMemoryLedger, JsonRpcConfig, JsonRpcLedger, LedgerClient,
};
use pv_04_lifecycle::{LifecycleCoordinator, Reconciler};
use pv_05_api_gateway::{
    AppState, Coordinator, CorsConfig, Credentials, GatewayConfig, HttpConfig, SessionConfig,
};
use std::sync::Arc;
use tracing::{info, warn};

/// Reconciler over the runtime-selected store and ledger.
pub type DynReconciler = Reconciler<dyn ProvenanceStore, dyn LedgerClient>;

/// Every long-lived service, built once.
pub struct AppContainer {
    pub config: NodeConfig,
    pub store: Arc<dyn ProvenanceStore>,
    pub ledger: Arc<dyn LedgerClient>,
    pub credentials: Arc<Credentials>,
    pub coordinator: Arc<Coordinator>,
    pub sessions: Arc<SessionStore>,
}

impl AppContainer {
    /// Validate `config` and construct all services.
    pub async fn build(config: NodeConfig) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let sqlite = SqliteStore::connect(
            &config.storage.database_url,
            config.storage.max_connections,
        )
        .await
        .with_context(|| format!("Failed to open database {}", config.storage.database_url))?;
        let report = sqlite.migrate().await.context("Schema migration failed")?;
        if report.is_noop() {
            info!("Schema up to date");
        } else {
            info!(columns_added = ?report.columns_added, "Schema migrated");
        }
        let store: Arc<dyn ProvenanceStore> = Arc::new(sqlite);

        let ledger = build_ledger(&config.ledger)?;

        let key = config
            .security
            .encryption_key
            .as_deref()
            .map(str::trim)
            .unwrap_or_default();
        let cipher = SensitiveDataCipher::from_base64_key(key)
            .context("Failed to load the sensitive-data key")?;
        let policy = RolePolicy::new(config.security.auditor_emails.iter());
        if policy.auditor_count() == 0 {
            warn!("No auditor emails configured; verification and notifications are unreachable");
        }

        let credentials = Arc::new(CredentialService::new(store.clone(), cipher, policy));
        credentials
            .sync_roles()
            .await
            .context("Failed to apply auditor roles")?;
        let coordinator = Arc::new(LifecycleCoordinator::new(
            store.clone(),
            ledger.clone(),
            ConfirmationPolicy {
                timeout: config.ledger.confirmation_timeout,
                poll_interval: config.ledger.poll_interval,
            },
        ));
        let sessions = Arc::new(SessionStore::new(config.security.session_ttl));

        Ok(Self {
            config,
            store,
            ledger,
            credentials,
            coordinator,
            sessions,
        })
    }

    /// Gateway settings derived from the node configuration.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            http: HttpConfig {
                host: self.config.http.host,
                port: self.config.http.port,
                request_timeout: self.config.http.request_timeout,
                max_body_bytes: self.config.http.max_body_bytes,
            },
            session: SessionConfig {
                cookie_secure: self.config.security.cookie_secure,
                idle_ttl: self.config.security.session_ttl,
                ..SessionConfig::default()
            },
            cors: CorsConfig {
                allowed_origins: self.config.http.cors_origins.clone(),
            },
        }
    }

    /// Shared handler state for the gateway.
    pub fn gateway_state(&self) -> AppState {
        AppState {
            credentials: self.credentials.clone(),
            coordinator: self.coordinator.clone(),
            sessions: self.sessions.clone(),
            store: self.store.clone(),
            ledger: self.ledger.clone(),
            config: Arc::new(self.gateway_config()),
        }
    }

    /// Reconciler sharing the coordinator's per-fingerprint locks.
    pub fn reconciler(&self) -> DynReconciler {
        self.coordinator
            .reconciler(self.config.reconciler.max_intent_age)
    }
}

fn build_ledger(config: &LedgerConfig) -> Result<Arc<dyn LedgerClient>> {
    match config.backend {
        LedgerBackend::JsonRpc => {
            let contract_address = config
                .contract_address
                .context("PV_CONTRACT_ADDRESS is required for the jsonrpc backend")?;
            let ledger = JsonRpcLedger::new(JsonRpcConfig {
                rpc_url: config.rpc_url.clone(),
                contract_address,
                account: config.account,
                request_timeout: config.rpc_timeout,
                gas_limit: config.gas_limit,
            })
            .context("Failed to create JSON-RPC ledger client")?;
            info!(
                rpc_url = %config.rpc_url,
                contract = ?contract_address,
                "Using JSON-RPC ledger"
            );
            Ok(Arc::new(ledger))
        }
        LedgerBackend::Memory => {
            warn!("Using in-memory ledger; anchors are lost on restart");
            Ok(Arc::new(InMemoryLedger::new()))
        }
    }
}
