use thiserror::Error;

use super::object_id::ObjectId;
use crate::cluster::types::NodeId;

/// Errors surfaced by the DSM core.
///
/// Fetch-path transport failures are *not* represented here: the fetch path
/// recovers by falling back (home, then backup, then an empty decode), so
/// they are logged and swallowed. Lock traffic has no such fallback; a
/// failed lock RPC aborts the current handle operation with `Transport`.
#[derive(Debug, Error)]
pub enum DsmError {
    /// The object is absent after consulting the responsible nodes.
    #[error("object '{0}' not found")]
    NotFound(ObjectId),

    /// A peer RPC failed in a position where the core cannot recover.
    #[error("transport failure talking to {peer}: {reason}")]
    Transport { peer: NodeId, reason: String },

    /// Write access was attempted through a read-only handle.
    #[error("write access through a read-only handle")]
    ReadOnlyHandle,

    /// Stored bytes do not decode into the requested type.
    #[error("codec mismatch: expected {expected} byte(s), got {actual}")]
    Codec { expected: usize, actual: usize },
}

impl DsmError {
    pub fn transport(peer: NodeId, reason: impl ToString) -> Self {
        Self::Transport {
            peer,
            reason: reason.to_string(),
        }
    }
}
