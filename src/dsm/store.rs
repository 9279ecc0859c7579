//! Local Object Store
//!
//! Thread-safe map from [`ObjectId`] to serialized bytes. Home and backup
//! nodes keep canonical data here; every other node keeps fetched replicas
//! in the same structure. The store never interprets the bytes it holds.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use super::object_id::ObjectId;

/// Coarse-grained store: one mutex over the whole map. Operations are
/// short (no I/O, no waiting) so contention stays negligible next to the
/// distributed locking that wraps every access.
#[derive(Debug, Default)]
pub struct ObjectStore {
    objects: Mutex<HashMap<ObjectId, Vec<u8>>>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes stored for `id`, or `None` when absent. Never allocates an
    /// entry for a missing id.
    pub fn get(&self, id: &ObjectId) -> Option<Vec<u8>> {
        self.lock().get(id).cloned()
    }

    /// Insert or overwrite.
    pub fn put(&self, id: ObjectId, bytes: Vec<u8>) {
        self.lock().insert(id, bytes);
    }

    pub fn exists(&self, id: &ObjectId) -> bool {
        self.lock().contains_key(id)
    }

    /// Remove the entry, reporting whether one was present.
    pub fn erase(&self, id: &ObjectId) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Deep copy of the whole store, for monitoring. Nothing in the result
    /// aliases internal state.
    pub fn snapshot(&self) -> HashMap<ObjectId, Vec<u8>> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ObjectId, Vec<u8>>> {
        self.objects.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
