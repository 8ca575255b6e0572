//! Per-user critical sections

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::UserId;

/// Serialises read-then-write operations on one user's shadow records.
///
/// Distinct users never contend. An entry is dropped from the table once no
/// task holds or waits on it.
#[derive(Debug, Default)]
pub struct UserLocks {
    table: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`'s records
    pub async fn lock(&self, user_id: &UserId) -> UserGuard<'_> {
        let entry = {
            let mut table = self.table.lock().unwrap_or_else(|e| e.into_inner());
            table.entry(user_id.clone()).or_default().clone()
        };

        UserGuard {
            locks: self,
            user_id: user_id.clone(),
            guard: Some(entry.lock_owned().await),
        }
    }

    /// Number of users with a live lock entry
    pub fn len(&self) -> usize {
        self.table.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Held for the duration of a per-user operation
#[derive(Debug)]
pub struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut table = self.locks.table.lock().unwrap_or_else(|e| e.into_inner());
        if table
            .get(&self.user_id)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            table.remove(&self.user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    #[tokio::test]
    async fn test_entry_pruned_after_release() {
        let locks = UserLocks::new();

        {
            let _guard = locks.lock(&user("a@x.io")).await;
            assert_eq!(locks.len(), 1);
        }

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_users_do_not_contend() {
        let locks = UserLocks::new();

        let _a = locks.lock(&user("a@x.io")).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock(&user("b@x.io"))).await;

        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_same_user_waits_for_release() {
        let locks = Arc::new(UserLocks::new());
        let guard = locks.lock(&user("a@x.io")).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&user("a@x.io")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(locks.len(), 1);

        drop(guard);
        waiter.await.unwrap();
        assert!(locks.is_empty());
    }
}
