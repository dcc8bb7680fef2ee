//! Cookie-backed sessions.

use crate::domain::{ApiError, SessionConfig};
use crate::router::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use pv_02_credentials::{CredentialError, SessionToken};
use shared_types::UserIdentity;
use tracing::debug;

/// The authenticated caller.
///
/// Extraction fails with 401 `Authentication required` when the cookie is
/// missing, the session expired, or the user no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub identity: UserIdentity,
    pub token: String,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = read_cookie(&parts.headers, &state.config.session.cookie_name)
            .ok_or(ApiError::Unauthenticated)?;
        let user_id = state
            .sessions
            .resolve(&token)
            .ok_or(ApiError::Unauthenticated)?;

        match state.credentials.identity(user_id).await {
            Ok(identity) => Ok(Self { identity, token }),
            Err(CredentialError::UnknownUser(_)) => {
                debug!(user_id = %user_id, "Session refers to a missing user, dropping it");
                state.sessions.destroy(&token);
                Err(ApiError::Unauthenticated)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Value of the named cookie, across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, v)| *k == name && !v.is_empty())
        .map(|(_, v)| v.to_string())
}

/// `Set-Cookie` value establishing a session.
pub fn session_cookie(config: &SessionConfig, token: &SessionToken) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.cookie_name,
        token.as_str(),
        config.idle_ttl.as_secs()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser forget the session.
pub fn clear_session_cookie(config: &SessionConfig) -> String {
    let mut cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        config.cookie_name
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}
