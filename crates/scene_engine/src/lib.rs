//! # Scene Engine
//!
//! A scene graph that keeps derived views of itself up to date as it changes.
//!
//! ## Features
//!
//! - **Scene Graph**: Arena-backed hierarchy with cached world matrices
//! - **Change Notifications**: One descriptor per affected node, delivered in
//!   a fixed order
//! - **Layers**: Incrementally maintained subsets of scene objects (by type,
//!   by visibility, by shader) with a constant-time membership index
//! - **Owning-Thread Dispatch**: Mutations from other threads are queued
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_engine::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = EngineContext::new(EngineConfig::default())?;
//!     let mut scene = engine.create_scene();
//!
//!     let sun = Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0);
//!     let light = scene.spawn(scene.root(), NodeKind::Light(sun));
//!
//!     let lights = scene.type_layer::<Light>().map(|layer| layer.content().len());
//!     assert_eq!(lights, Some(1));
//!     assert!(scene.node(light).in_scene());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod dispatch;
pub mod error;
pub mod foundation;
pub mod layers;
pub mod scene;

mod engine;

pub use engine::{EngineContext, EngineError};
pub use error::SceneError;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        EngineContext, EngineError, SceneError,
        config::{Config, ConfigError, EngineConfig, SceneConfig},
        dispatch::{DispatchHandle, Dispatcher, SceneTask, SceneTaskQueue},
        foundation::{
            collections::NodeKey,
            math::{LocalTransform, Mat4, Quat, Transform, Vec3},
        },
        layers::{AutoLayer, Layer, LayerChange, LayerChangeKind, LayerId, LayerManager, ShaderLayer, TypeLayer, VisibleLayer},
        scene::{
            Camera, ChangeDescriptor, ChangeListener, Light, Material, Mesh, NodeKind, ObjectId, Scene,
            SceneNode, ShaderId,
        },
    };
}
