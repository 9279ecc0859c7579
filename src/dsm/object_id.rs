use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque name of a shared object.
///
/// Equality and hashing are by value, so an `ObjectId` can be used as a map
/// key on any node and travels over the wire as its plain name. The id
/// carries no placement information itself; homes are derived from it by
/// [`Placement`](crate::dsm::placement::Placement).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
