//! Scoped Access Handle
//!
//! A [`DsmHandle`] is the only way application code touches an object's
//! value. Constructing one acquires the object's distributed lock and
//! materializes the value; dropping it releases the lock and, for a
//! writable handle whose value was touched, commits the new bytes first.
//! There is no explicit commit or release call; lifetime alone drives
//! both, so a handle can never leak a lock on an early return or panic of
//! the surrounding code.

use super::codec::ObjectCodec;
use super::engine::DsmCore;
use super::error::DsmError;
use super::object_id::ObjectId;

/// Scoped accessor for one object.
///
/// Read access is always available through [`value`](Self::value) or
/// `Deref`. Write access goes through [`value_mut`](Self::value_mut) /
/// [`set`](Self::set), which fail on a read-only handle and mark a
/// writable one as modified. Holding a handle means holding the
/// distributed lock: keep its scope tight.
///
/// The handle borrows the engine, so the borrow checker enforces that the
/// engine outlives it.
#[must_use = "a handle holds the distributed lock until dropped"]
pub struct DsmHandle<'core, T: ObjectCodec> {
    core: &'core DsmCore,
    id: ObjectId,
    /// Always `Some` until drop takes the value out to commit it.
    value: Option<T>,
    writable: bool,
    modified: bool,
}

impl<'core, T: ObjectCodec> DsmHandle<'core, T> {
    pub(crate) fn new(core: &'core DsmCore, id: ObjectId, value: T, writable: bool) -> Self {
        Self {
            core,
            id,
            value: Some(value),
            writable,
            modified: false,
        }
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Shared access to the value.
    pub fn value(&self) -> &T {
        self.value.as_ref().expect("value present until drop")
    }

    /// Mutable access to the value. Fails on a read-only handle; on a
    /// writable one the value counts as modified from here on and will be
    /// committed on drop.
    pub fn value_mut(&mut self) -> Result<&mut T, DsmError> {
        if !self.writable {
            return Err(DsmError::ReadOnlyHandle);
        }
        self.modified = true;
        Ok(self.value.as_mut().expect("value present until drop"))
    }

    /// Replace the value outright. Equivalent to `*handle.value_mut()? = v`.
    pub fn set(&mut self, new_value: T) -> Result<(), DsmError> {
        *self.value_mut()? = new_value;
        Ok(())
    }
}

impl<T: ObjectCodec> std::ops::Deref for DsmHandle<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.value()
    }
}

impl<T: ObjectCodec> Drop for DsmHandle<'_, T> {
    fn drop(&mut self) {
        let Some(value) = self.value.take() else {
            return;
        };

        if self.writable && self.modified {
            let bytes = value.encode();
            tracing::debug!("committing {} byte(s) to '{}'", bytes.len(), self.id);
            self.core.commit_raw(&self.id, &bytes);
        }

        self.core.release_distributed(&self.id, self.writable);
    }
}
