//! Gateway configuration with validation.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

/// Main gateway configuration
#[derive(Debug, Clone, Default)]
pub struct GatewayConfig {
    /// HTTP listener
    pub http: HttpConfig,
    /// Session cookie settings
    pub session: SessionConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

impl GatewayConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.request_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "request timeout cannot be 0".into(),
            ));
        }

        if self.http.max_body_bytes == 0 {
            return Err(ConfigError::InvalidLimit("max_body_bytes cannot be 0".into()));
        }

        if self.session.idle_ttl.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "session idle ttl cannot be 0".into(),
            ));
        }

        let name = &self.session.cookie_name;
        if name.is_empty()
            || !name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
        {
            return Err(ConfigError::InvalidCookieName(name.clone()));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 5000)
    pub port: u16,
    /// Upper bound on a whole request, including the ledger confirmation wait
    pub request_timeout: Duration,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5000,
            request_timeout: Duration::from_secs(60),
            max_body_bytes: 64 * 1024,
        }
    }
}

/// Session cookie configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub cookie_name: String,
    /// Add the `Secure` attribute (set when served behind TLS)
    pub cookie_secure: bool,
    /// Sessions idle longer than this are dropped
    pub idle_ttl: Duration,
    /// How often expired sessions are swept
    pub purge_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "pv_session".to_string(),
            cookie_secure: false,
            idle_ttl: Duration::from_secs(60 * 60 * 12),
            purge_interval: Duration::from_secs(60),
        }
    }
}

/// CORS configuration
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Allowed origins. Empty disables cross-origin access; `*` is not
    /// accepted because session cookies require explicit origins.
    pub allowed_origins: Vec<String>,
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),

    #[error("invalid limit: {0}")]
    InvalidLimit(String),

    #[error("invalid cookie name: {0:?}")]
    InvalidCookieName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.http_addr().port(), 5000);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = GatewayConfig::default();
        config.http.request_timeout = Duration::ZERO;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidTimeout(_))
        ));
    }

    #[test]
    fn test_cookie_name_must_be_a_token() {
        let mut config = GatewayConfig::default();
        config.session.cookie_name = "pv session;".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCookieName(_))
        ));
    }
}
