use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a node in the cluster.
///
/// Node ids are small integers assigned by the cluster config file and are
/// required to be contiguous (`0..total_nodes`), because object placement
/// maps hashes onto them with modulo arithmetic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node-{}", self.0)
    }
}

/// Identity of the local node, fixed at startup.
///
/// Every node computes object placement independently from `total_nodes`,
/// so this value must agree across the whole cluster.
#[derive(Debug, Clone, Copy)]
pub struct NodeIdentity {
    /// Id of the local node.
    pub my_id: NodeId,
    /// Number of nodes in the cluster (fixed for the process lifetime).
    pub total_nodes: u32,
}

impl NodeIdentity {
    pub fn new(my_id: NodeId, total_nodes: u32) -> Self {
        Self { my_id, total_nodes }
    }
}

/// Role the local node plays for a particular object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectRole {
    /// Canonical owner of the object.
    Home,
    /// Secondary replica paired with the home.
    Backup,
    /// Holds a fetched copy only.
    Cache,
}

impl fmt::Display for ObjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectRole::Home => write!(f, "HOME"),
            ObjectRole::Backup => write!(f, "BACKUP"),
            ObjectRole::Cache => write!(f, "CACHE"),
        }
    }
}
