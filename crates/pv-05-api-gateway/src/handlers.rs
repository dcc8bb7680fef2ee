//! Route handlers.
//!
//! Each handler validates its input, calls one service operation and maps
//! the result. Response messages are part of the public interface.

use crate::domain::dto::{
    ComponentHealth, DocumentRequest, HealthResponse, IndexResponse, LoginRequest,
    MessageResponse, NotificationsResponse, RegisterRequest, RevokeResponse, UploadResponse,
    VerifyQuery, VerifyResponse,
};
use crate::domain::{ApiError, ApiResult};
use crate::middleware::{clear_session_cookie, session_cookie, CurrentUser};
use crate::router::AppState;
use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use provenance_telemetry::{
    encode_metrics, metrics_content_type, ACTIVE_SESSIONS, DOCUMENTS_REVOKED, DOCUMENTS_UPLOADED,
    LEDGER_FAILURES, LEDGER_WRITE_DURATION,
};
use pv_02_credentials::Registration;
use pv_04_lifecycle::LifecycleError;
use shared_types::Capability;
use tracing::{error, info, warn};

pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "provenance",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "POST /register",
            "POST /login",
            "GET /logout",
            "POST /upload",
            "POST /revoke",
            "GET /verify_document?hash=",
            "GET /notifications",
            "GET /health",
            "GET /metrics",
        ],
    })
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let req = json_body(payload)?;
    let identity = state
        .credentials
        .register(Registration {
            username: req.username,
            email: req.email,
            password: req.password,
            sensitive_info: req.sensitive_info,
        })
        .await?;

    info!(user_id = %identity.id, role = identity.role.as_str(), "Registered user");
    Ok(Json(MessageResponse {
        message: "User registered successfully",
    }))
}

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Response> {
    let req = json_body(payload)?;
    let identity = state.credentials.authenticate(&req.email, &req.password).await?;

    let token = state.sessions.create(identity.id);
    ACTIVE_SESSIONS.set(state.sessions.len() as f64);
    info!(user_id = %identity.id, session = ?token, "Logged in");

    let cookie = session_cookie(&state.config.session, &token);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(MessageResponse { message: "Logged in" }),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, user: CurrentUser) -> Response {
    state.sessions.destroy(&user.token);
    ACTIVE_SESSIONS.set(state.sessions.len() as f64);
    info!(user_id = %user.identity.id, "Logged out");

    (
        [(header::SET_COOKIE, clear_session_cookie(&state.config.session))],
        Redirect::to("/"),
    )
        .into_response()
}

pub async fn upload(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> ApiResult<Json<UploadResponse>> {
    let req = json_body(payload)?;
    let _timer = LEDGER_WRITE_DURATION
        .with_label_values(&["upload"])
        .start_timer();

    let outcome = state
        .coordinator
        .upload(&user.identity, &req.hash)
        .await
        .inspect_err(|e| record_failure("upload", e))?;

    DOCUMENTS_UPLOADED.inc();
    Ok(Json(UploadResponse {
        message: "Document uploaded",
        hash: outcome.fingerprint.as_str().to_string(),
        transaction_hash: outcome.tx_hash.to_hex(),
    }))
}

pub async fn revoke(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Result<Json<DocumentRequest>, JsonRejection>,
) -> ApiResult<Json<RevokeResponse>> {
    let req = json_body(payload)?;
    let _timer = LEDGER_WRITE_DURATION
        .with_label_values(&["revoke"])
        .start_timer();

    let outcome = state
        .coordinator
        .revoke(&user.identity, &req.hash)
        .await
        .inspect_err(|e| record_failure("revoke", e))?;

    DOCUMENTS_REVOKED.inc();
    Ok(Json(RevokeResponse {
        message: "Document revoked",
        transaction_hash: outcome.tx_hash.to_hex(),
    }))
}

pub async fn verify_document(
    State(state): State<AppState>,
    user: CurrentUser,
    query: Result<Query<VerifyQuery>, QueryRejection>,
) -> ApiResult<Json<VerifyResponse>> {
    // Role is checked before input so unprivileged callers learn nothing.
    if !user.identity.can(Capability::VerifyDocuments) {
        return Err(ApiError::Forbidden);
    }
    let hash = query
        .ok()
        .and_then(|Query(q)| q.hash)
        .filter(|h| !h.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing hash parameter"))?;

    match state.coordinator.verify(&user.identity, &hash).await {
        Ok(exists) => Ok(Json(VerifyResponse { exists })),
        Err(LifecycleError::Ledger(e)) => {
            error!(error = %e, "Error verifying document");
            LEDGER_FAILURES.with_label_values(&["verify", e.kind()]).inc();
            Err(ApiError::Internal("Verification failed".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

pub async fn notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<NotificationsResponse>> {
    let events = state.coordinator.notifications(&user.identity).await?;
    Ok(Json(NotificationsResponse {
        notifications: events.into_iter().map(|n| n.message).collect(),
    }))
}

pub async fn health(State(state): State<AppState>) -> Response {
    let store = match state.store.health_check().await {
        Ok(()) => ComponentHealth {
            healthy: true,
            backend: None,
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Store health check failed");
            ComponentHealth {
                healthy: false,
                backend: None,
                error: Some(e.to_string()),
            }
        }
    };

    let ledger = match state.ledger.health_check().await {
        Ok(()) => ComponentHealth {
            healthy: true,
            backend: Some(state.ledger.backend()),
            error: None,
        },
        Err(e) => {
            warn!(error = %e, "Ledger health check failed");
            ComponentHealth {
                healthy: false,
                backend: Some(state.ledger.backend()),
                error: Some(e.to_string()),
            }
        }
    };

    let (status_code, status) = match (store.healthy, ledger.healthy) {
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unavailable"),
        (true, false) => (StatusCode::OK, "degraded"),
        (true, true) => (StatusCode::OK, "ok"),
    };

    (
        status_code,
        Json(HealthResponse {
            status,
            store,
            ledger,
        }),
    )
        .into_response()
}

pub async fn metrics() -> Response {
    match encode_metrics() {
        Ok(text) => ([(header::CONTENT_TYPE, metrics_content_type())], text).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            ApiError::internal().into_response()
        }
    }
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

fn record_failure(operation: &'static str, e: &LifecycleError) {
    match e {
        LifecycleError::Ledger(inner) => {
            LEDGER_FAILURES
                .with_label_values(&[operation, inner.kind()])
                .inc();
        }
        LifecycleError::LocalCommitFailed { .. } => {
            LEDGER_FAILURES
                .with_label_values(&[operation, "local_commit"])
                .inc();
        }
        _ => {}
    }
}
