//! # Session Store
//!
//! Opaque bearer tokens mapped to a user id with an idle expiry.
//!
//! ## Security Properties
//!
//! - Tokens are 256 bits from the OS RNG, hex encoded
//! - A token idle longer than the TTL resolves to nothing and is evicted
//! - Logout deletes the token; it never resolves again

use dashmap::DashMap;
use rand::rngs::OsRng;
use rand::RngCore;
use shared_types::UserId;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

const TOKEN_BYTES: usize = 32;

/// Opaque session token handed to the client in a cookie.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    fn generate() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Only a prefix, tokens are credentials.
        write!(f, "SessionToken({}..)", &self.0[..8.min(self.0.len())])
    }
}

#[derive(Debug, Clone)]
struct Session {
    user_id: UserId,
    last_seen: Instant,
}

/// Concurrent token → session map.
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    idle_ttl: Duration,
}

impl SessionStore {
    pub fn new(idle_ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_ttl,
        }
    }

    /// Establish a session for `user_id`.
    pub fn create(&self, user_id: UserId) -> SessionToken {
        let token = SessionToken::generate();
        self.sessions.insert(
            token.0.clone(),
            Session {
                user_id,
                last_seen: Instant::now(),
            },
        );
        token
    }

    /// Resolve a token and refresh its idle timer.
    pub fn resolve(&self, token: &str) -> Option<UserId> {
        let now = Instant::now();
        let mut entry = self.sessions.get_mut(token)?;
        if now.duration_since(entry.last_seen) > self.idle_ttl {
            drop(entry);
            self.sessions.remove(token);
            return None;
        }
        entry.last_seen = now;
        Some(entry.user_id)
    }

    /// Delete a session. Returns whether it existed.
    pub fn destroy(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Evict every idle-expired session. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, s| now.duration_since(s.last_seen) <= self.idle_ttl);
        before.saturating_sub(self.sessions.len())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn idle_ttl(&self) -> Duration {
        self.idle_ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_resolve() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(UserId(7));

        assert_eq!(token.as_str().len(), 64);
        assert_eq!(store.resolve(token.as_str()), Some(UserId(7)));
        assert_eq!(store.resolve("unknown"), None);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new(Duration::from_secs(60));
        let a = store.create(UserId(1));
        let b = store.create(UserId(1));
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_destroy() {
        let store = SessionStore::new(Duration::from_secs(60));
        let token = store.create(UserId(1));

        assert!(store.destroy(token.as_str()));
        assert!(!store.destroy(token.as_str()));
        assert_eq!(store.resolve(token.as_str()), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_expiry_and_refresh() {
        let store = SessionStore::new(Duration::from_secs(10));
        let token = store.create(UserId(1));

        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(store.resolve(token.as_str()), Some(UserId(1)));

        // Refreshed at t=8, so still alive at t=16.
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(store.resolve(token.as_str()), Some(UserId(1)));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.resolve(token.as_str()), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = SessionStore::new(Duration::from_secs(10));
        let stale = store.create(UserId(1));

        tokio::time::advance(Duration::from_secs(6)).await;
        let fresh = store.create(UserId(2));

        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.resolve(stale.as_str()), None);
        assert_eq!(store.resolve(fresh.as_str()), Some(UserId(2)));
    }

    #[test]
    fn test_debug_hides_token() {
        let token = SessionToken("abcdef0123456789".into());
        assert_eq!(format!("{:?}", token), "SessionToken(abcdef01..)");
    }
}
