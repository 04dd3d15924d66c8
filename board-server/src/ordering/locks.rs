//! Per-list write locks
//!
//! Serializes position writes inside one list across all in-flight requests
//! of this process. Locks are always taken in ascending id order so two moves
//! between the same pair of lists cannot deadlock.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct ListLocks {
    locks: Arc<DashMap<i64, Arc<Mutex<()>>>>,
}

/// Held locks; dropping releases them all
pub struct ListGuards {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl ListLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every list in `list_ids` (duplicates collapse to one lock)
    pub async fn acquire(&self, list_ids: &[i64]) -> ListGuards {
        let mut ids = list_ids.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in ids {
            // Clone the Arc out so the DashMap shard is not held across await
            let lock = self.locks.entry(id).or_default().clone();
            guards.push(lock.lock_owned().await);
        }
        ListGuards { _guards: guards }
    }

    /// Drop the lock entry of a deleted list
    pub fn forget(&self, list_id: i64) {
        self.locks
            .remove_if(&list_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}
