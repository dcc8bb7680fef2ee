//! Gateway domain: configuration, errors, request/response bodies.

pub mod config;
pub mod correlation;
pub mod dto;
pub mod error;

pub use config::{ConfigError, CorsConfig, GatewayConfig, HttpConfig, SessionConfig};
pub use correlation::{CorrelationId, REQUEST_ID_HEADER};
pub use error::{ApiError, ApiResult, ErrorBody};
