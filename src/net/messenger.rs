//! Peer Messenger Interface
//!
//! The narrow seam between the coherence engine and whatever carries its
//! RPCs. The engine calls these seven operations and is driven in return
//! through the `on_*` entry points on
//! [`DsmCore`](crate::dsm::engine::DsmCore); it never sees transport types.
//!
//! All calls block until the peer has answered. In particular
//! [`lock_acquire`](PeerMessenger::lock_acquire) blocks until the remote
//! lock manager grants the lock, which is what turns per-node locks into a
//! distributed one.

use crate::cluster::types::NodeId;
use crate::dsm::error::DsmError;
use crate::dsm::object_id::ObjectId;

pub trait PeerMessenger: Send + Sync {
    /// Ask `peer` for its current bytes of `id`, registering the local node
    /// as a cacher there. Empty bytes mean the peer does not hold the
    /// object; that is not an error.
    fn fetch_from_home(&self, peer: NodeId, id: &ObjectId) -> Result<Vec<u8>, DsmError>;

    /// Push committed bytes to `peer` (an object's home or backup).
    fn write_to_home(&self, peer: NodeId, id: &ObjectId, bytes: &[u8]) -> Result<(), DsmError>;

    /// Refresh the replica a cacher holds.
    fn cache_update(&self, peer: NodeId, id: &ObjectId, bytes: &[u8]) -> Result<(), DsmError>;

    /// Tell `peer` (home or backup) to drop the object and notify cachers.
    fn remove_to_home(&self, peer: NodeId, id: &ObjectId) -> Result<(), DsmError>;

    /// Tell a cacher to drop its replica.
    fn cache_remove(&self, peer: NodeId, id: &ObjectId) -> Result<(), DsmError>;

    /// Take the named lock on `peer`'s local lock manager. Blocks until
    /// granted there.
    fn lock_acquire(&self, peer: NodeId, id: &ObjectId, is_write: bool) -> Result<(), DsmError>;

    /// Release the named lock on `peer`'s local lock manager.
    fn lock_release(&self, peer: NodeId, id: &ObjectId, is_write: bool) -> Result<(), DsmError>;
}
