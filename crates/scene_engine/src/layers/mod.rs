//! Derived layers
//!
//! Layers are incrementally maintained subsets of scene objects. The
//! [`LayerManager`] forwards every scene notification to each of them and
//! keeps the `(layer, object)` membership index that makes "is this object
//! already in that layer" a constant-time question.

pub mod auto_layer;
pub mod layer;
pub mod manager;
pub mod shader_layers;

pub use auto_layer::{AnyOfType, AutoLayer, LayerPredicate, ShaderLayer, TypeLayer, UsesShader, VisibleLayer, VisibleOnly};
pub use layer::{Attachment, Layer, LayerChange, LayerChangeKind, LayerContent, LayerId, LayerState, Member, Members};
pub use manager::{LayerManager, MembershipIndex};
pub use shader_layers::{LayerBuilder, ShaderLayerBuilder};
