//! Request and response bodies.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub sensitive_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of `POST /upload` and `POST /revoke`.
#[derive(Debug, Deserialize)]
pub struct DocumentRequest {
    pub hash: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub hash: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: &'static str,
    pub hash: String,
    pub transaction_hash: String,
}

#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    pub message: &'static str,
    pub transaction_hash: String,
}

#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub exists: bool,
}

#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: ComponentHealth,
    pub ledger: ComponentHealth,
}

#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}
