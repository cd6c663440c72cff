//! Object identities
//!
//! Every node that joins a scene, and every layer attached to a manager, gets
//! an [`ObjectId`] from the engine's [`IdentityAllocator`]. Ids are small,
//! never reused, and are the keys of the layer membership index.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

/// Stable identity of a scene object or layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ObjectId(u32);

impl ObjectId {
    /// Placeholder for objects that never joined a scene
    pub const UNASSIGNED: Self = Self(0);

    /// Raw id value
    pub fn value(self) -> u32 {
        self.0
    }

    /// Whether an allocator handed out this id
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Monotonic id source shared by every scene of the process
///
/// Owned by [`EngineContext`](crate::EngineContext) and handed to scenes at
/// construction. There is nothing to tear down.
#[derive(Debug)]
pub struct IdentityAllocator {
    next: AtomicU32,
}

impl IdentityAllocator {
    /// Create an allocator whose first id is 1
    pub fn new() -> Self {
        Self { next: AtomicU32::new(1) }
    }

    /// Hand out the next id
    pub fn allocate(&self) -> ObjectId {
        let id = self.next.fetch_add(1, Ordering::Relaxed);
        assert!(id != 0, "object id space exhausted");
        ObjectId(id)
    }

    /// Assign an id to `slot` unless it already has one
    pub fn ensure(&self, slot: &mut ObjectId) -> ObjectId {
        if !slot.is_assigned() {
            *slot = self.allocate();
        }
        *slot
    }
}

impl Default for IdentityAllocator {
    fn default() -> Self {
        Self::new()
    }
}
