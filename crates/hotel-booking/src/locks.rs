//! # Entity Locks
//!
//! Per-id async mutexes. Holding the guard for a room serializes every
//! check-then-act sequence on that room (availability → insert) without
//! blocking any other room.
//!
//! ```text
//!   create_reservation(room 3)   create_reservation(room 3)   create_reservation(room 9)
//!          │                            │                            │
//!     lock(3) ✓                    lock(3) … waits              lock(9) ✓
//!     check + insert + commit           │                       check + insert + commit
//!     drop guard ───────────────► lock(3) ✓
//!                                  check → RoomUnavailable
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Prune idle entries once the map grows past this many ids.
const PRUNE_THRESHOLD: usize = 1024;

/// A lazily populated map of `id → mutex`.
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<i64, Arc<Mutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `id`. Released when the guard drops.
    pub async fn lock(&self, id: i64) -> OwnedMutexGuard<()> {
        let entry = {
            let mut locks = self.locks.lock().await;

            if locks.len() > PRUNE_THRESHOLD {
                // Only the map holds these; nobody is waiting on them.
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }

            locks.entry(id).or_default().clone()
        };

        entry.lock_owned().await
    }

    /// Number of ids currently tracked.
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let registry = Arc::new(LockRegistry::new());
        let guard = registry.lock(1).await;

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.lock(1).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let registry = LockRegistry::new();
        let _first = registry.lock(1).await;

        let second = tokio::time::timeout(Duration::from_millis(100), registry.lock(2)).await;
        assert!(second.is_ok());
        assert_eq!(registry.len().await, 2);
    }

    #[tokio::test]
    async fn test_idle_entries_are_pruned() {
        let registry = LockRegistry::new();
        for id in 0..=(PRUNE_THRESHOLD as i64) {
            drop(registry.lock(id).await);
        }
        assert_eq!(registry.len().await, PRUNE_THRESHOLD + 1);

        let _held = registry.lock(-1).await;
        assert_eq!(registry.len().await, 1);
    }
}
