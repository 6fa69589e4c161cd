use std::sync::Arc;

use chatrelay_common::ThreadId;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per thread. Holding the guard serializes a whole turn
/// (history read, completion, recording, delivery) against other turns on the
/// same thread while leaving other threads free to run.
#[derive(Default)]
pub struct TurnLocks {
    locks: DashMap<ThreadId, Arc<Mutex<()>>>,
}

impl TurnLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, thread_id: &ThreadId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(thread_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Number of threads that have ever taken a turn.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
