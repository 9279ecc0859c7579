//! DSM Network Protocol
//!
//! Defines the API endpoints and Data Transfer Objects (DTOs) used for
//! internode coherence traffic (fetch, write, cache update/remove, lock).
//!
//! These structures are serialized via JSON and sent over HTTP. Object
//! payloads travel as raw byte vectors; the protocol layer never decodes
//! them.

use serde::{Deserialize, Serialize};

// --- Internal API Endpoints ---

/// Fetch the current bytes of an object from its home or backup.
pub const ENDPOINT_DSM_FETCH: &str = "/internal/dsm/fetch";
/// Push a committed write to an object's home or backup.
pub const ENDPOINT_DSM_WRITE: &str = "/internal/dsm/write";
/// Refresh the replica held by a caching node.
pub const ENDPOINT_DSM_CACHE_UPDATE: &str = "/internal/dsm/cache_update";
/// Delete an object at its home or backup.
pub const ENDPOINT_DSM_REMOVE: &str = "/internal/dsm/remove";
/// Drop the replica held by a caching node.
pub const ENDPOINT_DSM_CACHE_REMOVE: &str = "/internal/dsm/cache_remove";
/// Take an object's lock on the receiving node. Blocks until granted.
pub const ENDPOINT_LOCK_ACQUIRE: &str = "/internal/lock/acquire";
/// Release an object's lock on the receiving node.
pub const ENDPOINT_LOCK_RELEASE: &str = "/internal/lock/release";

// --- Public API Endpoints ---

/// Application-facing object access (GET/PUT/DELETE).
pub const ENDPOINT_OBJECT: &str = "/object";
/// Node and store statistics for monitoring.
pub const ENDPOINT_STATS: &str = "/health/stats";

// --- Data Transfer Objects ---

/// Request for the current value of an object.
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Name of the requested object.
    pub object_name: String,
    /// Id of the requesting node; the receiver registers it as a cacher.
    pub requester_node_id: u32,
}

/// Reply to a [`FetchRequest`].
#[derive(Debug, Serialize, Deserialize)]
pub struct FetchReply {
    /// False when the receiver holds no bytes for the object.
    pub found: bool,
    pub object_name: String,
    /// Serialized object bytes; empty when `found` is false.
    #[serde(default)]
    pub data: Vec<u8>,
}

/// Carries new object bytes: writes to home/backup and cache updates.
#[derive(Debug, Serialize, Deserialize)]
pub struct UpdateMsg {
    pub object_name: String,
    pub data: Vec<u8>,
    /// Informational on cache updates; identifies the writer on writes.
    pub sender_node_id: u32,
}

/// Object deletion: removes at home/backup and cache drops.
#[derive(Debug, Serialize, Deserialize)]
pub struct RemoveMsg {
    pub object_name: String,
    pub sender_node_id: u32,
}

/// Lock traffic for the distributed reader/writer lock.
#[derive(Debug, Serialize, Deserialize)]
pub struct LockRequest {
    /// Node asking for (or giving back) the lock.
    pub client_id: u32,
    pub object_id: String,
    pub is_write_lock: bool,
}

/// Standard acknowledgment for fire-and-forget style RPCs.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
}

// --- Public (application-facing) DTOs ---

/// Write request against the public object API. Values on this surface are
/// plain strings; typed access goes through the library API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectPutRequest {
    pub key: String,
    pub value: String,
}

/// Read reply from the public object API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectGetResponse {
    pub found: bool,
    pub value: Option<String>,
}

/// Per-object line in the stats report.
#[derive(Debug, Serialize, Deserialize)]
pub struct ObjectStat {
    pub key: String,
    /// HOME, BACKUP or CACHE from the reporting node's point of view.
    pub role: String,
    pub size_bytes: usize,
}

/// Node statistics served under [`ENDPOINT_STATS`].
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub node_id: u32,
    pub total_nodes: u32,
    pub object_count: usize,
    pub objects: Vec<ObjectStat>,
}
