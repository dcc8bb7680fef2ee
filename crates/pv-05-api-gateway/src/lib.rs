//! # API Gateway (pv-05)
//!
//! HTTP interface for the provenance service.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      API GATEWAY (pv-05)                     │
//! │                                                              │
//! │  RequestContext → Cors → Timeout → BodyLimit → Router        │
//! │                                                 │            │
//! │            CurrentUser (session cookie) ◄───────┤            │
//! │                                                 ▼            │
//! │        CredentialService        LifecycleCoordinator         │
//! └───────────────┬──────────────────────────┬───────────────────┘
//!                 ▼                          ▼
//!           pv-01 store               pv-03 ledger client
//! ```
//!
//! ## Routes
//!
//! | Method & Path | Auth | Success |
//! |---------------|------|---------|
//! | POST /register | none | `{"message":"User registered successfully"}` |
//! | POST /login | none | `{"message":"Logged in"}` + session cookie |
//! | GET /logout | session | 303 to `/`, cookie cleared |
//! | POST /upload | session | `{"message","hash","transaction_hash"}` |
//! | POST /revoke | session | `{"message","transaction_hash"}` |
//! | GET /verify_document?hash= | auditor | `{"exists"}` |
//! | GET /notifications | auditor | `{"notifications":[...]}` |
//! | GET / | none | service index |
//! | GET /health | none | `{"status","store","ledger"}`, 503 if the store is down |
//! | GET /metrics | none | Prometheus text |
//!
//! Every error body is `{"message": "..."}`.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod service;

pub use domain::{
    ApiError, ApiResult, ConfigError, CorrelationId, CorsConfig, GatewayConfig, HttpConfig,
    SessionConfig,
};
pub use middleware::CurrentUser;
pub use router::{build_router, AppState, Coordinator, Credentials};
pub use service::{spawn_session_purge, ApiGatewayService, GatewayError};
