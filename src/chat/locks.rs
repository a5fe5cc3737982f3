//! Per-session locking
//!
//! Every operation that reads or writes a session's messages runs inside
//! [`SessionLocks::run_exclusive`], so turns, saves and deletes on the same
//! session happen one after another. Different sessions never contend.
//!
//! An entry lives only while someone holds or waits for it; the map does not
//! grow with the number of sessions ever seen.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

/// Keyed async mutexes, one per active session id
#[derive(Default)]
pub struct SessionLocks {
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a session
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.write().await;
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the entry for `session_id` unless a holder or waiter still has it.
    ///
    /// The map's own reference is the only one left when the count is 1, so a
    /// mutex that is still in use is never replaced by a fresh one.
    pub async fn release(&self, session_id: &str) {
        let mut locks = self.locks.write().await;
        if locks
            .get(session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(session_id);
        }
    }

    /// Run `work` while holding the session's lock, then release the entry
    pub async fn run_exclusive<F, T>(&self, session_id: &str, work: F) -> T
    where
        F: Future<Output = T>,
    {
        let guard = self.acquire(session_id).await;
        let output = work.await;
        drop(guard);
        self.release(session_id).await;
        output
    }

    /// Number of sessions currently held or awaited
    pub async fn active(&self) -> usize {
        self.locks.read().await.len()
    }
}
