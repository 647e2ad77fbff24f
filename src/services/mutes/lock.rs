//! Named, awaitable mutual exclusion keyed by resource.
//!
//! Every change to a member's roles happens while holding the member's
//! lock, so a manual command, the expiry sweeper and gateway events can
//! never interleave role mutations for the same member.

use std::sync::Arc;

use dashmap::DashMap;
use serenity::all::{GuildId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

type Registry = DashMap<String, Arc<Mutex<()>>>;

/// Lock key guarding a member's role set
pub fn member_roles_lock(guild_id: GuildId, user_id: UserId) -> String {
    format!("member-roles:{}:{}", guild_id, user_id)
}

/// Issues lock handles. Cloning shares the same registry.
#[derive(Clone, Default)]
pub struct LockManager {
    locks: Arc<Registry>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no one else holds `key`, then take it.
    ///
    /// Waiters are served in FIFO order.
    pub async fn acquire(&self, key: impl Into<String>) -> LockHandle {
        let key = key.into();
        // The registry shard lock is released before awaiting the mutex
        let mutex = Arc::clone(self.locks.entry(key.clone()).or_default().value());

        let guard = mutex.lock_owned().await;
        debug!("Acquired lock {}", key);

        LockHandle {
            key,
            guard: Some(guard),
            registry: Arc::clone(&self.locks),
        }
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.locks
            .get(key)
            .map(|mutex| mutex.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of keys currently held or waited on
    pub fn active_keys(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive hold on one key. Released on drop, so every exit path
/// (including `?` and panics) gives the key back.
pub struct LockHandle {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Arc<Registry>,
}

impl LockHandle {
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Release explicitly. Equivalent to dropping the handle.
    pub fn release(self) {}
}

impl Drop for LockHandle {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Forget the key once nobody holds or waits on it
        self.registry
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
        debug!("Released lock {}", self.key);
    }
}

impl std::fmt::Debug for LockHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockHandle").field("key", &self.key).finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_pending, assert_ready, task};

    #[test]
    fn test_member_roles_lock_key() {
        assert_eq!(
            member_roles_lock(GuildId::new(1), UserId::new(2)),
            "member-roles:1:2"
        );
    }

    #[tokio::test]
    async fn test_second_acquire_waits_for_release() {
        let locks = LockManager::new();
        let first = locks.acquire("member-roles:1:2").await;

        let mut second = task::spawn(locks.acquire("member-roles:1:2"));
        assert_pending!(second.poll());
        assert_pending!(second.poll());

        first.release();
        assert!(second.is_woken());
        let handle = assert_ready!(second.poll());
        assert_eq!(handle.key(), "member-roles:1:2");
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = LockManager::new();
        let _first = locks.acquire("member-roles:1:2").await;

        let mut other = task::spawn(locks.acquire("member-roles:1:3"));
        assert_ready!(other.poll());
    }

    #[tokio::test]
    async fn test_registry_forgets_released_keys() {
        let locks = LockManager::new();
        let handle = locks.acquire("member-roles:1:2").await;
        assert!(locks.is_locked("member-roles:1:2"));
        assert_eq!(locks.active_keys(), 1);

        drop(handle);
        assert!(!locks.is_locked("member-roles:1:2"));
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_key_kept_while_someone_waits() {
        let locks = LockManager::new();
        let first = locks.acquire("k").await;
        let mut waiter = task::spawn(locks.acquire("k"));
        assert_pending!(waiter.poll());

        drop(first);
        // The waiter still references the mutex, so the key must survive
        assert_eq!(locks.active_keys(), 1);
        let second = assert_ready!(waiter.poll());
        assert!(locks.is_locked("k"));
        drop(second);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_released_on_error_path() {
        async fn failing(locks: &LockManager) -> Result<(), &'static str> {
            let _lock = locks.acquire("k").await;
            let update: Result<(), &'static str> = Err("role update failed");
            update?;
            Ok(())
        }

        let locks = LockManager::new();
        assert!(failing(&locks).await.is_err());
        assert!(!locks.is_locked("k"));

        let mut next = task::spawn(locks.acquire("k"));
        assert_ready!(next.poll());
    }

    #[tokio::test]
    async fn test_concurrent_holders_never_overlap() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let locks = LockManager::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let mut tasks = Vec::new();

        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            tasks.push(tokio::spawn(async move {
                let _lock = locks.acquire("member-roles:1:2").await;
                assert_eq!(inside.fetch_add(1, Ordering::SeqCst), 0);
                tokio::task::yield_now().await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert_eq!(locks.active_keys(), 0);
    }
}
