//! Per-fingerprint async mutual exclusion.
//!
//! Upload, revoke and reconciliation of one fingerprint run one at a time
//! within the process; different fingerprints never wait on each other.
//! A map entry lives only while someone holds or waits for it.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shared_types::Fingerprint;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

struct Slot {
    mutex: Arc<Mutex<()>>,
    /// Holders plus waiters.
    users: usize,
}

#[derive(Default)]
pub struct FingerprintLocks {
    inner: DashMap<String, Slot>,
}

/// Lock on one fingerprint, held or awaited. Released on drop, including
/// when the acquiring future is cancelled while still waiting.
pub struct FingerprintGuard<'a> {
    locks: &'a FingerprintLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl FingerprintLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, fingerprint: &Fingerprint) -> FingerprintGuard<'_> {
        let key = fingerprint.as_str().to_string();
        let mutex = {
            let mut slot = self.inner.entry(key.clone()).or_insert_with(|| Slot {
                mutex: Arc::new(Mutex::new(())),
                users: 0,
            });
            slot.users += 1;
            slot.mutex.clone()
        };

        let mut held = FingerprintGuard {
            locks: self,
            key,
            guard: None,
        };
        held.guard = Some(mutex.lock_owned().await);
        held
    }

    /// Fingerprints currently locked or awaited.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl Drop for FingerprintGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        if let Entry::Occupied(mut slot) = self.locks.inner.entry(self.key.clone()) {
            slot.get_mut().users -= 1;
            if slot.get().users == 0 {
                slot.remove();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = FingerprintLocks::new();
        {
            let _g = locks.acquire(&fp("a")).await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_leaves_no_entry() {
        let locks = FingerprintLocks::new();
        let held = locks.acquire(&fp("a")).await;

        let key = fp("a");
        let mut waiting = Box::pin(locks.acquire(&key));
        assert!(tokio::time::timeout(Duration::from_millis(10), &mut waiting)
            .await
            .is_err());

        drop(held);
        assert_eq!(locks.len(), 1);
        drop(waiting);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_fingerprint_serialized() {
        let locks = Arc::new(FingerprintLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            tasks.push(tokio::spawn(async move {
                let _g = locks.acquire(&fp("same")).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for t in tasks {
            t.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_fingerprints_do_not_block() {
        let locks = FingerprintLocks::new();
        let _a = locks.acquire(&fp("a")).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(&fp("b"))).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}
