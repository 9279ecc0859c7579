//! Cluster Node Assembly
//!
//! Wires identity, placement, store, lock manager and an injected peer
//! messenger into one [`DsmNode`], the only surface applications depend
//! on. The transport adapter reaches the engine through
//! [`DsmNode::core`] to deliver incoming RPCs.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{NodeIdentity, ObjectRole};
use crate::dsm::codec::ObjectCodec;
use crate::dsm::engine::DsmCore;
use crate::dsm::error::DsmError;
use crate::dsm::handle::DsmHandle;
use crate::dsm::object_id::ObjectId;
use crate::net::messenger::PeerMessenger;

/// One member of the DSM cluster.
pub struct DsmNode {
    core: Arc<DsmCore>,
}

impl DsmNode {
    pub fn new(identity: NodeIdentity, messenger: Arc<dyn PeerMessenger>) -> Self {
        tracing::info!(
            "DSM node {} up ({} node cluster)",
            identity.my_id,
            identity.total_nodes
        );
        Self {
            core: Arc::new(DsmCore::new(identity, messenger)),
        }
    }

    /// The engine, for transport adapters delivering incoming RPCs.
    pub fn core(&self) -> &Arc<DsmCore> {
        &self.core
    }

    pub fn identity(&self) -> &NodeIdentity {
        self.core.identity()
    }

    /// Shared-locked view of an object. See [`DsmHandle`].
    pub fn read_handle<T: ObjectCodec>(&self, id: ObjectId) -> Result<DsmHandle<'_, T>, DsmError> {
        self.core.read_handle(id)
    }

    /// Exclusively-locked view of an object; commits on drop if mutated.
    pub fn write_handle<T: ObjectCodec>(&self, id: ObjectId) -> Result<DsmHandle<'_, T>, DsmError> {
        self.core.write_handle(id)
    }

    /// One-shot read: fetch under a shared lock and return a copy of the
    /// value, or [`DsmError::NotFound`] when no node holds the object.
    pub fn read<T: ObjectCodec + Clone>(&self, id: ObjectId) -> Result<T, DsmError> {
        let handle = self.read_handle::<T>(id.clone())?;
        if !self.core.exists(&id) {
            return Err(DsmError::NotFound(id));
        }
        Ok(handle.value().clone())
    }

    /// One-shot write: store `value` under an exclusive lock.
    pub fn write<T: ObjectCodec>(&self, id: ObjectId, value: T) -> Result<(), DsmError> {
        let mut handle = self.write_handle::<T>(id)?;
        handle.set(value)?;
        Ok(())
    }

    /// Delete the object cluster-wide.
    pub fn remove(&self, id: &ObjectId) -> Result<(), DsmError> {
        self.core.remove(id)
    }

    /// Whether the local store holds the object (canonical copy or cached
    /// replica). No fetch is performed.
    pub fn exists(&self, id: &ObjectId) -> bool {
        self.core.exists(id)
    }

    /// Role of this node for the given object.
    pub fn role_for(&self, id: &ObjectId) -> ObjectRole {
        self.core.role_for(id)
    }

    /// Deep copy of the local store keyed by object name, for monitoring.
    pub fn snapshot(&self) -> HashMap<String, Vec<u8>> {
        self.core
            .snapshot()
            .into_iter()
            .map(|(id, bytes)| (id.as_str().to_string(), bytes))
            .collect()
    }
}
