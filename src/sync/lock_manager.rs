//! Per-Object Lock Manager
//!
//! Multiple-reader / single-writer locking for the **local** node. The
//! coherence engine builds the cluster-wide lock out of these by taking the
//! local lock on an object's home and backup nodes (remote ones via the
//! lock RPCs, which block inside this manager on the remote side).
//!
//! ## Policy
//! - A writer is granted when there are no readers and no active writer.
//! - A reader is granted when there is no active writer **and no queued
//!   writer**; readers never overtake a waiting writer, which bounds
//!   writer wait under continuous reader traffic.
//! - Wake-ups broadcast; reader-vs-reader and writer-vs-writer order is
//!   whatever the condvar delivers.

use dashmap::DashMap;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use crate::dsm::object_id::ObjectId;

#[derive(Debug, Default)]
struct LockState {
    readers: u32,
    writer_active: bool,
    write_waiters: u32,
}

#[derive(Debug, Default)]
struct ObjectLock {
    state: Mutex<LockState>,
    cv: Condvar,
}

/// Lock table for every object this node coordinates or accesses.
///
/// Entries are created on first use and kept for the process lifetime;
/// the table is bounded by the set of object ids this node ever touches.
#[derive(Debug, Default)]
pub struct LockManager {
    locks: DashMap<ObjectId, Arc<ObjectLock>>,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the requested lock is granted.
    pub fn acquire(&self, id: &ObjectId, is_write: bool) {
        tracing::debug!("lock acquire requested for {} (write={})", id, is_write);
        let lock = self.object_lock(id);

        let mut state = lock.state.lock().unwrap_or_else(PoisonError::into_inner);
        if is_write {
            state.write_waiters += 1;
            while state.readers > 0 || state.writer_active {
                state = lock.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            state.write_waiters -= 1;
            state.writer_active = true;
        } else {
            while state.writer_active || state.write_waiters > 0 {
                state = lock.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
            }
            state.readers += 1;
        }
        drop(state);

        tracing::debug!("lock acquired for {} (write={})", id, is_write);
    }

    /// Give the lock back and wake waiters. Non-blocking.
    pub fn release(&self, id: &ObjectId, is_write: bool) {
        let lock = self.object_lock(id);

        {
            let mut state = lock.state.lock().unwrap_or_else(PoisonError::into_inner);
            if is_write {
                state.writer_active = false;
            } else {
                state.readers = state.readers.saturating_sub(1);
            }
        }
        // Broadcast: only the last reader strictly needs to, but a spurious
        // wake-up re-checks the predicate and goes back to sleep.
        lock.cv.notify_all();

        tracing::debug!("lock released for {} (write={})", id, is_write);
    }

    /// Entry lookup, creating on demand. The map shard lock is dropped
    /// before anyone waits on the condvar.
    fn object_lock(&self, id: &ObjectId) -> Arc<ObjectLock> {
        self.locks.entry(id.clone()).or_default().clone()
    }
}
