//! Change descriptors carried by scene notifications

use bitflags::bitflags;

bitflags! {
    /// What changed on an object
    ///
    /// Listeners test with [`is_any`](Self::is_any): composite flags such as
    /// [`SCENE_ADD`](Self::SCENE_ADD) also satisfy a test for
    /// [`PARENT`](Self::PARENT).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeDescriptor: u32 {
        /// Visibility flag toggled
        const VISIBILITY = 1 << 0;
        /// Parent changed
        const PARENT = 1 << 1;
        /// Local transform set
        const TRANSFORM = 1 << 2;
        /// Render-relevant state (materials) touched
        const RENDER = 1 << 3;
        /// Marker bit of [`SCENE_ADD`](Self::SCENE_ADD)
        const ADDED = 1 << 4;
        /// Marker bit of [`SCENE_REMOVE`](Self::SCENE_REMOVE)
        const REMOVED = 1 << 5;

        /// Object just became reachable from the scene root
        const SCENE_ADD = Self::PARENT.bits() | Self::ADDED.bits();
        /// Object is no longer reachable from the scene root
        const SCENE_REMOVE = Self::PARENT.bits() | Self::REMOVED.bits();
    }
}

impl ChangeDescriptor {
    /// Nothing specific; consumers should re-evaluate everything they track
    pub const UNSPECIFIED: Self = Self::empty();

    /// True when any bit of `flags` is set
    pub fn is_any(self, flags: Self) -> bool {
        self.intersects(flags)
    }

    /// True when every bit of `flags` is set
    pub fn is(self, flags: Self) -> bool {
        self.contains(flags)
    }
}
