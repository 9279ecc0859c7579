//! Object Placement
//!
//! Maps every object name onto the pair of nodes that coordinate it: the
//! **home** (canonical owner) and the **backup** (secondary replica).
//!
//! ## Mechanism
//! - **Hashing**: names are hashed with 32-bit FNV-1a and mapped onto node
//!   ids with modulo arithmetic.
//! - **Determinism**: every node runs this computation independently, so the
//!   hash function is part of the inter-node contract and must match
//!   bit-for-bit everywhere.

use super::object_id::ObjectId;
use crate::cluster::types::{NodeId, NodeIdentity, ObjectRole};

const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// 32-bit FNV-1a. Fixed by the wire contract; do not swap for a different
/// hasher without rolling the whole cluster at once.
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for &byte in bytes {
        hash ^= u32::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Deterministic object-to-node assignment.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    total_nodes: u32,
}

impl Placement {
    pub fn new(total_nodes: u32) -> Self {
        debug_assert!(total_nodes >= 1, "cluster must have at least one node");
        Self { total_nodes }
    }

    /// The node holding the canonical copy of `id`.
    pub fn home(&self, id: &ObjectId) -> NodeId {
        NodeId(fnv1a_32(id.as_bytes()) % self.total_nodes)
    }

    /// The secondary replica paired with the home.
    ///
    /// Distinct from the home whenever the cluster has two or more nodes;
    /// on a single-node cluster both collapse onto node 0 and backup
    /// traffic degrades to a no-op.
    pub fn backup(&self, id: &ObjectId) -> NodeId {
        NodeId((fnv1a_32(id.as_bytes()).wrapping_add(1)) % self.total_nodes)
    }

    /// `(home, backup)` in one go; most call sites need both.
    pub fn locate(&self, id: &ObjectId) -> (NodeId, NodeId) {
        let hash = fnv1a_32(id.as_bytes());
        (
            NodeId(hash % self.total_nodes),
            NodeId(hash.wrapping_add(1) % self.total_nodes),
        )
    }

    /// Role of `identity.my_id` with respect to `id`.
    pub fn role_for(&self, identity: &NodeIdentity, id: &ObjectId) -> ObjectRole {
        let (home, backup) = self.locate(id);
        if identity.my_id == home {
            ObjectRole::Home
        } else if identity.my_id == backup {
            ObjectRole::Backup
        } else {
            ObjectRole::Cache
        }
    }
}
