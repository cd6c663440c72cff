//! Scene: graph, layers and listeners behind one mutation API
//!
//! Every mutation made through [`Scene`] that matters to a consumer ends in
//! [`Scene::notify_changed`], which runs one notification round:
//!
//! 1. the scene version is bumped and the layers' recorded transitions from
//!    the previous round are cleared
//! 2. every layer re-evaluates the changed object
//! 3. layer builders run; new layers are attached and the same notification
//!    is replayed into them
//! 4. external listeners run, in registration order, against the settled
//!    scene
//!
//! Nodes that are not reachable from the root can be edited freely without
//! any notification. They are reported once, with
//! [`SCENE_ADD`](ChangeDescriptor::SCENE_ADD), when they join.

use crate::config::SceneConfig;
use crate::error::SceneError;
use crate::foundation::collections::NodeKey;
use crate::foundation::math::LocalTransform;
use crate::layers::auto_layer::TypeLayer;
use crate::layers::layer::{Layer, LayerId};
use crate::layers::manager::LayerManager;
use crate::layers::shader_layers::{LayerBuilder, ShaderLayerBuilder};
use crate::scene::change::ChangeDescriptor;
use crate::scene::graph::{Reparent, SceneGraph};
use crate::scene::identity::{IdentityAllocator, ObjectId};
use crate::scene::listener::ChangeListener;
use crate::scene::material::{Material, ShaderId};
use crate::scene::node::{Camera, Light, Mesh, NodeKind, NodeVariant, SceneNode};
use std::fmt;
use std::sync::Arc;

/// A scene graph with derived layers kept in sync
pub struct Scene {
    graph: SceneGraph,
    layers: LayerManager,
    builtin: Vec<LayerId>,
    builders: Vec<Box<dyn LayerBuilder>>,
    listeners: Vec<Box<dyn ChangeListener>>,
    version: u64,
    config: SceneConfig,
}

impl Scene {
    /// Create an empty scene
    ///
    /// Registers the built-in type layers and the per-shader builder when the
    /// configuration asks for them.
    pub fn new(identities: Arc<IdentityAllocator>, config: SceneConfig) -> Self {
        let graph = SceneGraph::new(Arc::clone(&identities));
        let mut layers = LayerManager::new(graph.scene_id(), identities);
        let mut builders: Vec<Box<dyn LayerBuilder>> = Vec::new();
        let mut builtin = Vec::new();

        if config.builtin_type_layers {
            builtin.push(layers.add(Box::new(TypeLayer::<Light>::of_type())));
            builtin.push(layers.add(Box::new(TypeLayer::<Camera>::of_type())));
            builtin.push(layers.add(Box::new(TypeLayer::<Mesh>::of_type())));
            builtin.push(layers.add(Box::new(TypeLayer::<SceneNode>::of_type())));
        }
        if config.group_by_shader {
            builders.push(Box::new(ShaderLayerBuilder::new()));
        }

        log::debug!(
            "Created scene {} with {} layers and {} layer builders",
            graph.scene_id(),
            layers.len(),
            builders.len()
        );

        Self {
            graph,
            layers,
            builtin,
            builders,
            listeners: Vec::new(),
            version: 0,
            config,
        }
    }

    /// Scene identity
    pub fn id(&self) -> ObjectId {
        self.graph.scene_id()
    }

    /// Root group
    pub fn root(&self) -> NodeKey {
        self.graph.root()
    }

    /// Number of notification rounds run so far
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Settings this scene was created with
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Read access to the hierarchy
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Look up a node that must exist
    ///
    /// # Panics
    /// When `key` is stale or belongs to another scene.
    pub fn node(&self, key: NodeKey) -> &SceneNode {
        self.graph.node(key)
    }

    /// Look up a node
    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.graph.get(key)
    }

    /// Layers of this scene
    pub fn layers(&self) -> &LayerManager {
        &self.layers
    }

    /// The built-in layer holding every object of kind `T`
    pub fn type_layer<T: NodeVariant>(&self) -> Option<&TypeLayer<T>> {
        self.layers.find::<TypeLayer<T>>()
    }

    /// Identity of the built-in layer for kind `T`
    pub fn type_layer_id<T: NodeVariant>(&self) -> Option<LayerId> {
        self.type_layer::<T>().map(Layer::id)
    }

    /// Layer grouping the visible meshes drawn with `shader`
    ///
    /// `None` until some mesh in the scene has used the shader.
    pub fn shader_layer(&self, shader: ShaderId) -> Option<LayerId> {
        self.builders
            .iter()
            .filter_map(|builder| builder.downcast_ref::<ShaderLayerBuilder>())
            .find_map(|builder| builder.layer_for(shader))
    }

    /// Attach a custom layer and catch it up with the current scene
    pub fn add_layer(&mut self, layer: Box<dyn Layer>) -> LayerId {
        let id = self.layers.add(layer);
        for key in self.graph.descendants(self.graph.root()) {
            self.layers.replay(id, &self.graph, key, ChangeDescriptor::SCENE_ADD);
        }
        id
    }

    /// Detach a custom layer and hand it back
    ///
    /// Built-in type layers and layers created by a builder live as long as
    /// the scene; for those, as for unknown ids, nothing is detached and
    /// `None` is returned.
    pub fn remove_layer(&mut self, id: LayerId) -> Option<Box<dyn Layer>> {
        if self.builtin.contains(&id) || self.builders.iter().any(|builder| builder.owns(id)) {
            log::warn!("Refusing to detach layer {id}, it is owned by scene {}", self.id());
            return None;
        }
        self.layers.remove(id)
    }

    /// Show or hide a layer; returns false for unknown layers
    pub fn set_layer_visible(&mut self, id: LayerId, visible: bool) -> bool {
        match self.layers.get_mut(id) {
            Some(layer) => {
                layer.set_visible(visible);
                true
            }
            None => false,
        }
    }

    /// Register a source of layers created on demand
    ///
    /// The builder is first shown every node already in the scene, as if it
    /// had just been added. The layers it creates are attached and caught up
    /// the same way as [`add_layer`](Self::add_layer) does. Nothing is
    /// reported to listeners.
    pub fn add_layer_builder(&mut self, mut builder: Box<dyn LayerBuilder>) {
        let Self { graph, layers, .. } = self;
        let existing = graph.descendants(graph.root());

        let mut created = Vec::new();
        for &key in &existing {
            created.extend(builder.on_changed(graph, key, ChangeDescriptor::SCENE_ADD));
        }
        for layer in created {
            let id = layers.add(layer);
            for &key in &existing {
                layers.replay(id, graph, key, ChangeDescriptor::SCENE_ADD);
            }
        }

        log::debug!("Registered layer builder {:?} over {} nodes", builder, existing.len());
        self.builders.push(builder);
        self.check_index();
    }

    /// Register an external listener; it runs after all earlier ones
    pub fn add_listener(&mut self, listener: Box<dyn ChangeListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Allocate a detached node
    pub fn create_node(&mut self, kind: NodeKind) -> NodeKey {
        self.graph.create_node(kind)
    }

    /// Allocate a node directly under `parent`
    pub fn spawn(&mut self, parent: NodeKey, kind: NodeKind) -> NodeKey {
        let key = self.graph.create_node(kind);
        self.add_child(parent, key)
    }

    /// Set the debug name of a node
    pub fn set_name(&mut self, key: NodeKey, name: impl Into<String>) {
        self.graph.set_name(key, name);
    }

    /// Reparent `child` under `parent`
    ///
    /// Returns `child`. A no-op, without notification, when `child` already
    /// sits under `parent`.
    ///
    /// # Panics
    /// On unknown keys, a non-group parent, reparenting the root, or a cycle.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> NodeKey {
        self.try_add_child(parent, child).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reparent `child` under `parent`, reporting misuse as an error
    pub fn try_add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<NodeKey, SceneError> {
        let report = self.graph.try_add_child(parent, child)?;
        self.notify_reparent(child, report);
        Ok(child)
    }

    /// Detach `child` from `parent`; returns whether anything changed
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> bool {
        let report = self.graph.remove_child(parent, child);
        let changed = report.changed;
        self.notify_reparent(child, report);
        changed
    }

    /// Remove a node and its subtree from the scene and free them
    ///
    /// Layers are told about the removal before the nodes are dropped.
    pub fn destroy(&mut self, key: NodeKey) -> Vec<SceneNode> {
        if let Some(parent) = self.graph.parent(key) {
            self.remove_child(parent, key);
        }
        self.graph.destroy(key)
    }

    /// Replace the local transform of a node
    pub fn set_local_transform(&mut self, key: NodeKey, transform: impl Into<LocalTransform>) {
        self.graph.set_local_transform(key, transform);
        if self.graph.node(key).in_scene() {
            self.notify_changed(key, ChangeDescriptor::TRANSFORM);
        }
    }

    /// Set the own visibility flag of a node
    ///
    /// Emits one notification per node of the subtree whose visibility in
    /// the hierarchy actually changed.
    pub fn set_visible(&mut self, key: NodeKey, visible: bool) {
        let node = self.graph.node(key);
        if node.is_visible() == visible {
            return;
        }
        if !node.in_scene() {
            self.graph.set_visible(key, visible);
            return;
        }

        let subtree = self.graph.subtree(key);
        let before: Vec<bool> = subtree.iter().map(|&k| self.graph.is_visible_in_hierarchy(k)).collect();
        self.graph.set_visible(key, visible);

        let mut changed = Vec::new();
        for (&k, was_visible) in subtree.iter().zip(before) {
            if self.graph.is_visible_in_hierarchy(k) != was_visible {
                changed.push(k);
            }
        }
        for k in changed {
            self.notify_changed(k, ChangeDescriptor::VISIBILITY);
        }
    }

    /// Replace the materials of a mesh
    ///
    /// # Panics
    /// When `key` is not a mesh.
    pub fn set_materials(&mut self, key: NodeKey, materials: Vec<Material>) {
        self.graph.set_materials(key, materials);
        if self.graph.node(key).in_scene() {
            self.notify_changed(key, ChangeDescriptor::RENDER);
        }
    }

    /// Recompute cached world matrices; see [`SceneGraph::update_world_matrix`]
    pub fn update_world_matrix(&mut self, key: NodeKey, update_children: bool, update_parent: bool) -> bool {
        self.graph.update_world_matrix(key, update_children, update_parent)
    }

    /// Settle every world matrix reachable from the root
    pub fn update_world_matrices(&mut self) {
        let root = self.graph.root();
        self.graph.update_world_matrix(root, true, false);
    }

    /// Run one notification round for `node`
    ///
    /// Keys that no longer name a live node are passed on; layers ignore
    /// them.
    pub fn notify_changed(&mut self, node: NodeKey, change: ChangeDescriptor) {
        self.version += 1;
        log::trace!("Scene {} v{}: {:?} on {:?}", self.graph.scene_id(), self.version, change, node);

        let Self { graph, layers, builders, .. } = self;
        layers.clear_changes();
        layers.notify_changed(graph, node, change);

        let mut created = Vec::new();
        for builder in builders.iter_mut() {
            created.extend(builder.on_changed(graph, node, change));
        }
        for layer in created {
            let id = layers.add(layer);
            layers.replay(id, graph, node, change);
        }

        self.check_index();

        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            listener.notify_changed(self, node, change);
        }
        self.listeners = listeners;
    }

    fn notify_reparent(&mut self, child: NodeKey, report: Reparent) {
        if !report.changed {
            return;
        }

        let moved_within_scene = report.entered_scene.is_empty()
            && report.left_scene.is_empty()
            && self.graph.node(child).in_scene();

        for key in report.left_scene {
            self.notify_changed(key, ChangeDescriptor::SCENE_REMOVE);
        }
        for key in report.entered_scene {
            self.notify_changed(key, ChangeDescriptor::SCENE_ADD);
        }
        if moved_within_scene {
            // Hierarchy visibility may differ under the new parent
            for key in self.graph.subtree(child) {
                self.notify_changed(key, ChangeDescriptor::PARENT);
            }
        }
    }

    fn check_index(&self) {
        if cfg!(debug_assertions) && self.config.validate_index {
            if let Err(err) = self.layers.validate() {
                panic!("membership index out of sync after v{}: {err}", self.version);
            }
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Arc::new(IdentityAllocator::new()), SceneConfig::default())
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id())
            .field("version", &self.version)
            .field("nodes", &self.graph.len())
            .field("layers", &self.layers.len())
            .field("builders", &self.builders)
            .field("listeners", &self.listeners.len())
            .finish_non_exhaustive()
    }
}
