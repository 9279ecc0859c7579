//! Coherence Engine
//!
//! Home-based, cached, object-granular shared memory. For every object the
//! cluster designates a **home** and a **backup** via [`Placement`]; the
//! pair holds canonical state and coordinates the object's distributed
//! lock, while every other node keeps a fetched replica that the pair
//! refreshes on commit.
//!
//! ## Responsibilities
//! - Acquire and release the distributed reader/writer lock across
//!   (home, backup).
//! - Serve handle acquisition: local cache hit, or fetch from home with
//!   fallback to backup.
//! - Commit writes to home and backup and broadcast cache updates to every
//!   registered cacher.
//! - Answer the seven incoming RPCs the transport delivers.
//!
//! The peer messenger is injected; the engine never references transport
//! types.

use dashmap::DashMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::codec::ObjectCodec;
use super::error::DsmError;
use super::handle::DsmHandle;
use super::object_id::ObjectId;
use super::placement::Placement;
use super::store::ObjectStore;
use crate::cluster::types::{NodeId, NodeIdentity, ObjectRole};
use crate::net::messenger::PeerMessenger;
use crate::sync::lock_manager::LockManager;

/// Core DSM state for one node.
///
/// Owns the local store, the local lock manager and the cacher metadata;
/// uses the injected messenger for everything remote. Handles borrow the
/// engine for their whole lifetime, so the engine outlives every live
/// handle by construction.
pub struct DsmCore {
    identity: NodeIdentity,
    placement: Placement,
    store: ObjectStore,
    locks: LockManager,
    /// Nodes caching each object this node is home or backup for. Grows on
    /// fetch; cleared only when the object is removed.
    cachers: DashMap<ObjectId, HashSet<NodeId>>,
    messenger: Arc<dyn PeerMessenger>,
}

impl DsmCore {
    pub fn new(identity: NodeIdentity, messenger: Arc<dyn PeerMessenger>) -> Self {
        Self {
            identity,
            placement: Placement::new(identity.total_nodes),
            store: ObjectStore::new(),
            locks: LockManager::new(),
            cachers: DashMap::new(),
            messenger,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Role of the local node for `id`.
    pub fn role_for(&self, id: &ObjectId) -> ObjectRole {
        self.placement.role_for(&self.identity, id)
    }

    // ------------------------- Public surface ------------------------- //

    /// Acquire a shared lock on `id` cluster-wide and materialize its
    /// current value. The returned handle is read-only; dropping it
    /// releases the lock.
    pub fn read_handle<T: ObjectCodec>(&self, id: ObjectId) -> Result<DsmHandle<'_, T>, DsmError> {
        self.acquire_distributed(&id, false)?;
        match self.materialize(&id) {
            Ok(value) => Ok(DsmHandle::new(self, id, value, false)),
            Err(e) => {
                self.release_distributed(&id, false);
                Err(e)
            }
        }
    }

    /// Acquire an exclusive lock on `id` cluster-wide and materialize its
    /// current value for read-modify-write. Dropping the handle commits
    /// the new value (if it was mutated) and releases the lock.
    pub fn write_handle<T: ObjectCodec>(&self, id: ObjectId) -> Result<DsmHandle<'_, T>, DsmError> {
        self.acquire_distributed(&id, true)?;
        match self.materialize(&id) {
            Ok(value) => Ok(DsmHandle::new(self, id, value, true)),
            Err(e) => {
                self.release_distributed(&id, true);
                Err(e)
            }
        }
    }

    /// Delete `id` across the cluster: home, backup, and every cacher.
    pub fn remove(&self, id: &ObjectId) -> Result<(), DsmError> {
        self.acquire_distributed(id, true)?;

        let (home, backup) = self.placement.locate(id);
        let me = self.identity.my_id;

        if me == home || me == backup {
            self.store.erase(id);
            self.broadcast_cache_remove(id);

            // Mirror the commit path: the other half of the pair holds a
            // canonical copy too and must drop it.
            let other = if me == home { backup } else { home };
            if other != me {
                if let Err(e) = self.messenger.remove_to_home(other, id) {
                    tracing::warn!("remove of '{}' not delivered to {}: {}", id, other, e);
                }
            }
        } else {
            for peer in [home, backup] {
                if let Err(e) = self.messenger.remove_to_home(peer, id) {
                    tracing::warn!("remove of '{}' not delivered to {}: {}", id, peer, e);
                }
            }
            self.store.erase(id);
        }

        self.release_distributed(id, true);
        Ok(())
    }

    /// Whether the local store currently holds `id`. Checks local state
    /// only; no fetch is implied.
    pub fn exists(&self, id: &ObjectId) -> bool {
        self.store.exists(id)
    }

    /// Deep copy of the local store for monitoring.
    pub fn snapshot(&self) -> HashMap<ObjectId, Vec<u8>> {
        self.store.snapshot()
    }

    // --------------------- Distributed locking ------------------------ //

    /// Serialize access to `id` cluster-wide by taking its local lock on
    /// both the home and the backup, always home first.
    ///
    /// The fixed (home, backup) order gives every acquirer one global order
    /// per object, so two concurrent clients cannot deadlock against each
    /// other. Holding handles for several objects at once is outside the
    /// contract: overlapping (home, backup) pairs may then lock in
    /// conflicting orders.
    fn acquire_distributed(&self, id: &ObjectId, is_write: bool) -> Result<(), DsmError> {
        let (home, backup) = self.placement.locate(id);
        let me = self.identity.my_id;

        if me == home {
            self.locks.acquire(id, is_write);
            if backup != me {
                if let Err(e) = self.messenger.lock_acquire(backup, id, is_write) {
                    self.locks.release(id, is_write);
                    return Err(e);
                }
            }
        } else if me == backup {
            self.messenger.lock_acquire(home, id, is_write)?;
            self.locks.acquire(id, is_write);
        } else {
            self.messenger.lock_acquire(home, id, is_write)?;
            if let Err(e) = self.messenger.lock_acquire(backup, id, is_write) {
                // Unwind the half-taken lock; nothing more we can do if
                // that fails too.
                if let Err(e2) = self.messenger.lock_release(home, id, is_write) {
                    tracing::error!("lock unwind for '{}' failed on {}: {}", id, home, e2);
                }
                return Err(e);
            }
        }
        Ok(())
    }

    /// Release the distributed lock, same targets, same order as acquire.
    /// Failures are logged: the caller is usually a destructor and there
    /// is no one left to recover.
    pub(crate) fn release_distributed(&self, id: &ObjectId, is_write: bool) {
        let (home, backup) = self.placement.locate(id);
        let me = self.identity.my_id;

        if me == home {
            self.locks.release(id, is_write);
            if backup != me {
                self.log_release_failure(backup, id, is_write);
            }
        } else if me == backup {
            self.log_release_failure(home, id, is_write);
            self.locks.release(id, is_write);
        } else {
            self.log_release_failure(home, id, is_write);
            self.log_release_failure(backup, id, is_write);
        }
    }

    fn log_release_failure(&self, peer: NodeId, id: &ObjectId, is_write: bool) {
        if let Err(e) = self.messenger.lock_release(peer, id, is_write) {
            tracing::error!("lock release for '{}' failed on {}: {}", id, peer, e);
        }
    }

    // -------------------------- Fetch path ---------------------------- //

    /// Decode the object's current bytes, fetching them first if needed.
    /// Must run under the distributed lock.
    fn materialize<T: ObjectCodec>(&self, id: &ObjectId) -> Result<T, DsmError> {
        let bytes = self.fetch_raw(id);
        T::decode_or_default(&bytes)
    }

    /// Current bytes of `id`: local store if present, otherwise fetched
    /// from home with fallback to backup. Transport failures fall through
    /// to the next source and finally to empty bytes ("absent").
    fn fetch_raw(&self, id: &ObjectId) -> Vec<u8> {
        if let Some(bytes) = self.store.get(id) {
            tracing::debug!("fetch '{}': local hit", id);
            return bytes;
        }

        let (home, backup) = self.placement.locate(id);
        let me = self.identity.my_id;

        // Home or backup with no local entry ask the other half of the
        // pair, the only remaining authority; everyone else tries the home
        // first and falls back to the backup.
        let sources = if me != home && me != backup {
            vec![home, backup]
        } else if me == home && backup != me {
            vec![backup]
        } else if me == backup && home != me {
            vec![home]
        } else {
            Vec::new()
        };

        for peer in sources {
            match self.messenger.fetch_from_home(peer, id) {
                Ok(bytes) if !bytes.is_empty() => {
                    tracing::debug!("fetch '{}': got {} byte(s) from {}", id, bytes.len(), peer);
                    self.store.put(id.clone(), bytes.clone());
                    return bytes;
                }
                Ok(_) => {
                    tracing::debug!("fetch '{}': absent on {}", id, peer);
                }
                Err(e) => {
                    tracing::warn!("fetch '{}' from {} failed: {}", id, peer, e);
                }
            }
        }

        Vec::new()
    }

    // -------------------------- Commit path --------------------------- //

    /// Persist committed bytes cluster-wide. Called from a writable
    /// handle's drop, still under the exclusive lock.
    ///
    /// On home or backup: write locally, refresh every registered cacher,
    /// and forward to the other half of the pair. On a plain client: push
    /// to both home and backup, then update the local cache so the writer
    /// reads its own write.
    ///
    /// All sends are best-effort; one unreachable peer does not abort the
    /// commit.
    pub(crate) fn commit_raw(&self, id: &ObjectId, bytes: &[u8]) {
        let (home, backup) = self.placement.locate(id);
        let me = self.identity.my_id;

        if me == home || me == backup {
            self.store.put(id.clone(), bytes.to_vec());
            self.broadcast_cache_update(id, bytes);

            let other = if me == home { backup } else { home };
            if other != me {
                if let Err(e) = self.messenger.write_to_home(other, id, bytes) {
                    tracing::error!("commit of '{}' not replicated to {}: {}", id, other, e);
                }
            }
        } else {
            for peer in [home, backup] {
                if let Err(e) = self.messenger.write_to_home(peer, id, bytes) {
                    tracing::error!("commit of '{}' not delivered to {}: {}", id, peer, e);
                }
            }
            // Optimistic local update: the committing node reads its own
            // writes without another fetch.
            self.store.put(id.clone(), bytes.to_vec());
        }
    }

    // ----------------------- Cacher metadata -------------------------- //

    fn register_cacher(&self, id: &ObjectId, node: NodeId) {
        if node == self.identity.my_id {
            return;
        }
        self.cachers.entry(id.clone()).or_default().insert(node);
    }

    /// Copy of the cacher set; taken so no map lock is held across sends.
    fn cachers_of(&self, id: &ObjectId) -> Vec<NodeId> {
        self.cachers
            .get(id)
            .map(|entry| entry.iter().copied().collect())
            .unwrap_or_default()
    }

    fn broadcast_cache_update(&self, id: &ObjectId, bytes: &[u8]) {
        for cacher in self.cachers_of(id) {
            if cacher == self.identity.my_id {
                continue;
            }
            if let Err(e) = self.messenger.cache_update(cacher, id, bytes) {
                tracing::warn!("cache update of '{}' to {} failed: {}", id, cacher, e);
            }
        }
    }

    fn broadcast_cache_remove(&self, id: &ObjectId) {
        for cacher in self.cachers_of(id) {
            if cacher == self.identity.my_id {
                continue;
            }
            if let Err(e) = self.messenger.cache_remove(cacher, id) {
                tracing::warn!("cache remove of '{}' to {} failed: {}", id, cacher, e);
            }
        }
        self.cachers.remove(id);
    }

    fn is_home_or_backup(&self, id: &ObjectId) -> bool {
        let (home, backup) = self.placement.locate(id);
        self.identity.my_id == home || self.identity.my_id == backup
    }

    // ----------------------- Incoming handlers ------------------------ //
    //
    // Entry points invoked by the transport adapter when the matching RPC
    // arrives. They run on transport worker threads and may block (lock
    // acquisition does, by design).

    /// A peer wants the current bytes of `id`. Registers the requester as
    /// a cacher when this node is home or backup. Empty bytes mean the
    /// object is absent here; that is not an error.
    pub fn on_fetch_from_home(&self, from: NodeId, id: &ObjectId) -> Vec<u8> {
        if self.is_home_or_backup(id) {
            self.register_cacher(id, from);
        }
        self.store.get(id).unwrap_or_default()
    }

    /// A peer committed new bytes for an object this node is home or
    /// backup for. Stores them and refreshes every registered cacher.
    pub fn on_write_to_home(&self, from: NodeId, id: &ObjectId, bytes: &[u8]) {
        if !self.is_home_or_backup(id) {
            tracing::warn!(
                "write of '{}' from {} landed on {} which is neither home nor backup; dropped",
                id,
                from,
                self.identity.my_id
            );
            return;
        }
        self.store.put(id.clone(), bytes.to_vec());
        self.broadcast_cache_update(id, bytes);
    }

    /// New bytes for a replica this node caches. Last write wins.
    pub fn on_cache_update(&self, id: &ObjectId, bytes: &[u8]) {
        self.store.put(id.clone(), bytes.to_vec());
    }

    /// A peer removed an object this node is home or backup for.
    pub fn on_remove_to_home(&self, from: NodeId, id: &ObjectId) {
        if !self.is_home_or_backup(id) {
            tracing::warn!(
                "remove of '{}' from {} landed on {} which is neither home nor backup; dropped",
                id,
                from,
                self.identity.my_id
            );
            return;
        }
        self.store.erase(id);
        self.broadcast_cache_remove(id);
    }

    /// Drop the locally cached replica of a removed object.
    pub fn on_cache_remove(&self, id: &ObjectId) {
        self.store.erase(id);
    }

    /// Remote side of the distributed lock: blocks the incoming RPC until
    /// the local lock manager grants the lock to `from`.
    pub fn on_lock_acquire(&self, from: NodeId, id: &ObjectId, is_write: bool) {
        tracing::debug!("{} asks for lock on '{}' (write={})", from, id, is_write);
        self.locks.acquire(id, is_write);
    }

    pub fn on_lock_release(&self, from: NodeId, id: &ObjectId, is_write: bool) {
        tracing::debug!("{} gives back lock on '{}' (write={})", from, id, is_write);
        self.locks.release(id, is_write);
    }
}
