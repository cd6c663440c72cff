//! Specialized collection types

pub use slotmap::{SlotMap, Key};

slotmap::new_key_type! {
    /// Generational handle to a node stored in a scene graph arena
    ///
    /// A key stays valid until its node is destroyed; afterwards lookups with
    /// the stale key return `None` instead of aliasing a recycled slot.
    pub struct NodeKey;
}

/// Arena of scene nodes addressed by [`NodeKey`]
pub type NodeArena<T> = SlotMap<NodeKey, T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_key_after_reuse() {
        let mut arena: NodeArena<&str> = NodeArena::with_key();
        let first = arena.insert("first");
        arena.remove(first);
        let second = arena.insert("second");

        assert!(arena.get(first).is_none());
        assert_eq!(arena.get(second), Some(&"second"));
        assert!(NodeKey::null().is_null());
    }
}
