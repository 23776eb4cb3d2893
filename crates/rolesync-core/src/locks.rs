use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-user async locks. Work for one user id runs one at a time, in the
/// order it asked for the lock; different users never wait on each other.
///
/// Entries are held weakly, so a user's lock disappears once nothing holds
/// or waits on it.
#[derive(Default)]
pub struct UserLocks {
    inner: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

pub type UserGuard = OwnedMutexGuard<()>;

impl UserLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `user_id`. Released when the guard drops.
    pub async fn acquire(&self, user_id: &str) -> UserGuard {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
            map.retain(|_, weak| weak.strong_count() > 0);
            let existing = map.get(user_id).and_then(Weak::upgrade);
            match existing {
                Some(existing) => existing,
                None => {
                    let fresh = Arc::new(AsyncMutex::new(()));
                    map.insert(user_id.to_string(), Arc::downgrade(&fresh));
                    fresh
                }
            }
        };
        lock.lock_owned().await
    }

    /// Number of users with a live lock.
    pub fn active(&self) -> usize {
        let map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        map.values().filter(|weak| weak.strong_count() > 0).count()
    }
}
