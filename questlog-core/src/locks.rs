//! Per-user serialization of stats read-modify-write.
//!
//! Operations on different users proceed in parallel; operations on the
//! same user queue behind one async mutex. A user's entry is dropped from
//! the table once the last holder or waiter releases it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::UserId;

type LockTable = HashMap<UserId, Arc<Mutex<()>>>;

/// Shared table of per-user locks. Cloning shares the table.
#[derive(Clone, Default)]
pub struct UserLocks {
    // Only held for map lookups, never across an await.
    locks: Arc<StdMutex<LockTable>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s stats.
    pub async fn acquire(&self, user_id: UserId) -> UserLockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(user_id).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;

        UserLockGuard {
            user_id,
            table: self.locks.clone(),
            lock,
            guard: Some(guard),
        }
    }

    /// Number of users currently held or waited on.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive access to one user's stats, released on drop.
pub struct UserLockGuard {
    user_id: UserId,
    table: Arc<StdMutex<LockTable>>,
    lock: Arc<Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        // Waiters clone the lock under the table mutex, so a count of two
        // (table + this guard) means nobody else wants it.
        let mut locks = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.user_id);
        }
    }
}
