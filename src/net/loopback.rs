//! Loopback Transport
//!
//! In-process cluster: every node's engine is registered with a shared
//! hub, and peer calls become direct method calls on the target engine.
//! Blocking semantics are preserved exactly: a `lock_acquire` against a
//! busy peer parks the calling thread inside that peer's lock manager,
//! just as the HTTP transport would park it inside a pending request.
//!
//! Used by the test suite; also handy for single-process experiments.

use dashmap::DashMap;
use std::sync::Arc;

use super::messenger::PeerMessenger;
use crate::cluster::types::{NodeId, NodeIdentity};
use crate::dsm::engine::DsmCore;
use crate::dsm::error::DsmError;
use crate::dsm::object_id::ObjectId;
use crate::cluster::node::DsmNode;

/// Registry of in-process engines, shared by all loopback messengers.
#[derive(Default)]
pub struct LoopbackHub {
    nodes: DashMap<NodeId, Arc<DsmCore>>,
}

impl LoopbackHub {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn register(&self, id: NodeId, core: Arc<DsmCore>) {
        self.nodes.insert(id, core);
    }

    /// Drop a node from the hub. Peers calling it afterwards observe
    /// transport failures, which the tests use to exercise failure paths.
    pub fn disconnect(&self, id: NodeId) {
        self.nodes.remove(&id);
    }

    fn node(&self, id: NodeId) -> Result<Arc<DsmCore>, DsmError> {
        // Clone the Arc out so no map shard lock is held while the peer
        // call blocks.
        self.nodes
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| DsmError::transport(id, "peer not registered on loopback hub"))
    }
}

/// Per-node messenger handing calls straight to the target engine.
pub struct LoopbackMessenger {
    my_id: NodeId,
    hub: Arc<LoopbackHub>,
}

impl LoopbackMessenger {
    pub fn new(my_id: NodeId, hub: Arc<LoopbackHub>) -> Self {
        Self { my_id, hub }
    }
}

impl PeerMessenger for LoopbackMessenger {
    fn fetch_from_home(&self, peer: NodeId, id: &ObjectId) -> Result<Vec<u8>, DsmError> {
        Ok(self.hub.node(peer)?.on_fetch_from_home(self.my_id, id))
    }

    fn write_to_home(&self, peer: NodeId, id: &ObjectId, bytes: &[u8]) -> Result<(), DsmError> {
        self.hub.node(peer)?.on_write_to_home(self.my_id, id, bytes);
        Ok(())
    }

    fn cache_update(&self, peer: NodeId, id: &ObjectId, bytes: &[u8]) -> Result<(), DsmError> {
        self.hub.node(peer)?.on_cache_update(id, bytes);
        Ok(())
    }

    fn remove_to_home(&self, peer: NodeId, id: &ObjectId) -> Result<(), DsmError> {
        self.hub.node(peer)?.on_remove_to_home(self.my_id, id);
        Ok(())
    }

    fn cache_remove(&self, peer: NodeId, id: &ObjectId) -> Result<(), DsmError> {
        self.hub.node(peer)?.on_cache_remove(id);
        Ok(())
    }

    fn lock_acquire(&self, peer: NodeId, id: &ObjectId, is_write: bool) -> Result<(), DsmError> {
        self.hub.node(peer)?.on_lock_acquire(self.my_id, id, is_write);
        Ok(())
    }

    fn lock_release(&self, peer: NodeId, id: &ObjectId, is_write: bool) -> Result<(), DsmError> {
        self.hub.node(peer)?.on_lock_release(self.my_id, id, is_write);
        Ok(())
    }
}

/// Build an `n`-node in-process cluster wired through one hub.
pub fn loopback_cluster(n: u32) -> (Arc<LoopbackHub>, Vec<DsmNode>) {
    let hub = LoopbackHub::new();
    let nodes: Vec<DsmNode> = (0..n)
        .map(|i| {
            let identity = NodeIdentity::new(NodeId(i), n);
            let messenger = Arc::new(LoopbackMessenger::new(NodeId(i), hub.clone()));
            let node = DsmNode::new(identity, messenger);
            hub.register(NodeId(i), node.core().clone());
            node
        })
        .collect();
    (hub, nodes)
}
