//! Scene graph and change propagation
//!
//! ## Architecture
//!
//! ```text
//! Scene API (mutations)
//!      ↓
//! SceneGraph (arena, world matrices)
//!      ↓  notify_changed
//! LayerManager → layers → membership index
//!      ↓
//! ChangeListeners (renderer, editor, physics)
//! ```
//!
//! The scene owns its nodes outright. Layers and listeners only ever see
//! node handles and shared borrows of the graph.

pub mod change;
pub mod graph;
pub mod identity;
pub mod listener;
pub mod material;
pub mod node;
#[allow(clippy::module_inception)]
pub mod scene;

#[cfg(test)]
mod tests;

pub use change::ChangeDescriptor;
pub use graph::{Ancestors, Reparent, SceneGraph};
pub use identity::{IdentityAllocator, ObjectId};
pub use listener::{ChangeListener, Notification, NotificationLog};
pub use material::{Material, ShaderId};
pub use node::{Camera, Light, LightType, Mesh, NodeKind, NodeVariant, SceneNode};
pub use scene::Scene;
