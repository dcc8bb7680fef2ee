//! # Node Configuration
//!
//! Defaults for every setting, overridden from `PV_*` environment variables.
//!
//! ## Security Requirements
//!
//! - `PV_ENCRYPTION_KEY` MUST be set: base64 of exactly 32 bytes
//! - The HTTP request timeout must outlast the ledger confirmation wait

use pv_02_credentials::SensitiveDataCipher;
use pv_03_ledger_client::Address;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete node configuration.
#[derive(Debug, Clone, Default)]
pub struct NodeConfig {
    /// HTTP listener configuration.
    pub http: HttpSettings,
    /// Local store configuration.
    pub storage: StorageConfig,
    /// Ledger backend configuration.
    pub ledger: LedgerConfig,
    /// Secrets, roles and sessions.
    pub security: SecurityConfig,
    /// Background reconciliation.
    pub reconciler: ReconcilerConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub host: IpAddr,
    pub port: u16,
    pub request_timeout: Duration,
    pub max_body_bytes: usize,
    pub cors_origins: Vec<String>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5000,
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 64 * 1024,
            cors_origins: Vec::new(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// sqlx SQLite URL.
    pub database_url: String,
    /// Pool size for file databases.
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://provenance.db".to_string(),
            max_connections: 8,
        }
    }
}

/// Which ledger implementation to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    JsonRpc,
    Memory,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jsonrpc" | "json-rpc" => Ok(LedgerBackend::JsonRpc),
            "memory" => Ok(LedgerBackend::Memory),
            other => Err(format!("unknown ledger backend '{other}'")),
        }
    }
}

/// Ledger configuration.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub rpc_url: String,
    /// Registry contract. Required for the JSON-RPC backend.
    pub contract_address: Option<Address>,
    /// Sender account. `None` uses the node's first account.
    pub account: Option<Address>,
    pub gas_limit: Option<u64>,
    /// Per-call HTTP timeout towards the node.
    pub rpc_timeout: Duration,
    /// Upper bound on waiting for a receipt.
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::JsonRpc,
            rpc_url: "http://127.0.0.1:7545".to_string(),
            contract_address: None,
            account: None,
            gas_limit: Some(300_000),
            rpc_timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Base64 AES-256 key for the sensitive-data field.
    /// MUST be provided; there is no default.
    pub encryption_key: Option<String>,
    /// Emails granted the auditor role at registration.
    pub auditor_emails: Vec<String>,
    pub cookie_secure: bool,
    pub session_ttl: Duration,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encryption_key: None,
            auditor_emails: Vec::new(),
            cookie_secure: false,
            session_ttl: Duration::from_secs(60 * 60 * 12),
        }
    }
}

/// Reconciler configuration.
#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub interval: Duration,
    /// Intents without a receipt are abandoned after this long.
    pub max_intent_age: Duration,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_intent_age: Duration::from_secs(60 * 60 * 24),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("PV_ENCRYPTION_KEY is not set; generate one with `openssl rand -base64 32`")]
    MissingEncryptionKey,

    #[error("PV_ENCRYPTION_KEY is invalid: {0}")]
    InvalidEncryptionKey(String),

    #[error(
        "request timeout ({request:?}) must exceed the confirmation timeout ({confirmation:?})"
    )]
    TimeoutOrdering {
        request: Duration,
        confirmation: Duration,
    },

    #[error("poll interval must be greater than zero")]
    ZeroPollInterval,

    #[error("PV_CONTRACT_ADDRESS is required for the jsonrpc ledger backend")]
    MissingContractAddress,

    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

impl NodeConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let env = Env(&lookup);

        if let Some(host) = env.parse("PV_HTTP_HOST")? {
            config.http.host = host;
        }
        if let Some(port) = env.parse("PV_HTTP_PORT")? {
            config.http.port = port;
        }
        if let Some(secs) = env.parse::<u64>("PV_REQUEST_TIMEOUT_SECS")? {
            config.http.request_timeout = Duration::from_secs(secs);
        }
        if let Some(origins) = env.get("PV_CORS_ORIGINS") {
            config.http.cors_origins = split_list(&origins);
        }

        if let Some(url) = env.get("PV_DATABASE_URL") {
            config.storage.database_url = url;
        }
        if let Some(n) = env.parse("PV_DATABASE_MAX_CONNECTIONS")? {
            config.storage.max_connections = n;
        }

        if let Some(backend) = env.parse("PV_LEDGER_BACKEND")? {
            config.ledger.backend = backend;
        }
        if let Some(url) = env.get("PV_LEDGER_RPC_URL") {
            config.ledger.rpc_url = url;
        }
        if let Some(address) = env.address("PV_CONTRACT_ADDRESS")? {
            config.ledger.contract_address = Some(address);
        }
        if let Some(account) = env.address("PV_LEDGER_ACCOUNT")? {
            config.ledger.account = Some(account);
        }
        if let Some(secs) = env.parse::<u64>("PV_CONFIRMATION_TIMEOUT_SECS")? {
            config.ledger.confirmation_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env.parse::<u64>("PV_POLL_INTERVAL_MS")? {
            config.ledger.poll_interval = Duration::from_millis(ms);
        }

        if let Some(key) = env.get("PV_ENCRYPTION_KEY") {
            config.security.encryption_key = Some(key);
        }
        if let Some(emails) = env.get("PV_AUDITOR_EMAILS") {
            config.security.auditor_emails = split_list(&emails);
        }
        if let Some(secure) = env.flag("PV_COOKIE_SECURE")? {
            config.security.cookie_secure = secure;
        }
        if let Some(secs) = env.parse::<u64>("PV_SESSION_TTL_SECS")? {
            config.security.session_ttl = Duration::from_secs(secs);
        }

        if let Some(secs) = env.parse::<u64>("PV_RECONCILE_INTERVAL_SECS")? {
            config.reconciler.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = env.parse::<u64>("PV_MAX_INTENT_AGE_SECS")? {
            config.reconciler.max_intent_age = Duration::from_secs(secs);
        }

        Ok(config)
    }

    /// Reject configurations the node cannot run safely with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let key = self
            .security
            .encryption_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ConfigError::MissingEncryptionKey)?;
        SensitiveDataCipher::from_base64_key(key.trim())
            .map_err(|e| ConfigError::InvalidEncryptionKey(e.to_string()))?;

        if self.http.request_timeout <= self.ledger.confirmation_timeout {
            return Err(ConfigError::TimeoutOrdering {
                request: self.http.request_timeout,
                confirmation: self.ledger.confirmation_timeout,
            });
        }

        if self.ledger.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }

        if self.ledger.backend == LedgerBackend::JsonRpc
            && self.ledger.contract_address.map_or(true, |a| a.is_zero())
        {
            return Err(ConfigError::MissingContractAddress);
        }

        Ok(())
    }
}

struct Env<'a, F>(&'a F);

impl<F> Env<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn parse<T>(&self, key: &'static str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|value| {
                value.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                    key,
                    reason: e.to_string(),
                    value,
                })
            })
            .transpose()
    }

    fn flag(&self, key: &'static str) -> Result<Option<bool>, ConfigError> {
        self.get(key)
            .map(|value| match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    key,
                    value,
                    reason: "expected true or false".to_string(),
                }),
            })
            .transpose()
    }

    fn address(&self, key: &'static str) -> Result<Option<Address>, ConfigError> {
        self.get(key)
            .map(|value| -> Result<Address, ConfigError> {
                let digits = value.trim().trim_start_matches("0x");
                let bytes: [u8; 20] = hex::decode(digits)
                    .map_err(|e| e.to_string())
                    .and_then(|b| {
                        b.try_into()
                            .map_err(|b: Vec<u8>| format!("expected 20 bytes, got {}", b.len()))
                    })
                    .map_err(|reason| ConfigError::InvalidValue {
                        key,
                        reason,
                        value: value.clone(),
                    })?;
                Ok(Address::from(bytes))
            })
            .transpose()
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "AAECAwQFBgcICQoLDA0ODxAREhMUFRYXGBkaGxwdHh8=";
    const CONTRACT: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    fn config(vars: &[(&str, &str)]) -> Result<NodeConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        NodeConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = config(&[]).unwrap();
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.ledger.backend, LedgerBackend::JsonRpc);
        assert_eq!(config.ledger.confirmation_timeout, Duration::from_secs(30));
        assert!(config.security.encryption_key.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = config(&[
            ("PV_HTTP_PORT", "8080"),
            ("PV_HTTP_HOST", "0.0.0.0"),
            ("PV_DATABASE_URL", "sqlite://data/pv.db"),
            ("PV_LEDGER_BACKEND", "memory"),
            ("PV_CONTRACT_ADDRESS", CONTRACT),
            ("PV_CONFIRMATION_TIMEOUT_SECS", "5"),
            ("PV_POLL_INTERVAL_MS", "100"),
            ("PV_AUDITOR_EMAILS", "dev@x.com, audit@x.com ,"),
            ("PV_COOKIE_SECURE", "true"),
            ("PV_SESSION_TTL_SECS", "600"),
            ("PV_RECONCILE_INTERVAL_SECS", "10"),
        ])
        .unwrap();

        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.storage.database_url, "sqlite://data/pv.db");
        assert_eq!(config.ledger.backend, LedgerBackend::Memory);
        assert!(config.ledger.contract_address.is_some());
        assert_eq!(config.ledger.poll_interval, Duration::from_millis(100));
        assert_eq!(config.security.auditor_emails, vec!["dev@x.com", "audit@x.com"]);
        assert!(config.security.cookie_secure);
        assert_eq!(config.security.session_ttl, Duration::from_secs(600));
        assert_eq!(config.reconciler.interval, Duration::from_secs(10));
    }

    #[test]
    fn test_malformed_values_rejected() {
        assert!(matches!(
            config(&[("PV_HTTP_PORT", "eighty")]),
            Err(ConfigError::InvalidValue { key: "PV_HTTP_PORT", .. })
        ));
        assert!(matches!(
            config(&[("PV_LEDGER_BACKEND", "ganache")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config(&[("PV_COOKIE_SECURE", "maybe")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            config(&[("PV_CONTRACT_ADDRESS", "0x1234")]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_validate_requires_key() {
        let config = config(&[("PV_CONTRACT_ADDRESS", CONTRACT)]).unwrap();
        assert_eq!(config.validate(), Err(ConfigError::MissingEncryptionKey));

        let short = self::config(&[
            ("PV_CONTRACT_ADDRESS", CONTRACT),
            ("PV_ENCRYPTION_KEY", "c2hvcnQ="),
        ])
        .unwrap();
        assert!(matches!(
            short.validate(),
            Err(ConfigError::InvalidEncryptionKey(_))
        ));
    }

    #[test]
    fn test_validate_timeouts_and_contract() {
        let ok = config(&[("PV_ENCRYPTION_KEY", KEY), ("PV_CONTRACT_ADDRESS", CONTRACT)]).unwrap();
        assert_eq!(ok.validate(), Ok(()));

        let mut bad = ok.clone();
        bad.ledger.confirmation_timeout = bad.http.request_timeout;
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::TimeoutOrdering { .. })
        ));

        let mut bad = ok.clone();
        bad.ledger.poll_interval = Duration::ZERO;
        assert_eq!(bad.validate(), Err(ConfigError::ZeroPollInterval));

        let no_contract = config(&[("PV_ENCRYPTION_KEY", KEY)]).unwrap();
        assert_eq!(
            no_contract.validate(),
            Err(ConfigError::MissingContractAddress)
        );

        let memory = config(&[("PV_ENCRYPTION_KEY", KEY), ("PV_LEDGER_BACKEND", "memory")]).unwrap();
        assert_eq!(memory.validate(), Ok(()));
    }
}
