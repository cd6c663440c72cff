//! Predicate-driven layers
//!
//! [`AutoLayer`] keeps the set of scene objects of one node kind that satisfy
//! a predicate. It re-evaluates only the object named by each notification,
//! so the cost of a notification is one tag check plus, for matching kinds,
//! one predicate call.

use crate::foundation::collections::NodeKey;
use crate::layers::layer::{Layer, LayerState, Member};
use crate::layers::manager::MembershipIndex;
use crate::scene::change::ChangeDescriptor;
use crate::scene::graph::SceneGraph;
use crate::scene::material::ShaderId;
use crate::scene::node::{Mesh, NodeVariant, SceneNode};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

/// Membership rule of an [`AutoLayer`]
///
/// Must only read the graph. Invoked on every relevant notification, so it
/// should be cheap.
pub trait LayerPredicate<T: NodeVariant>: 'static {
    /// Whether `item` (the payload of node `key`) belongs to the layer
    fn belongs_to_layer(&self, graph: &SceneGraph, key: NodeKey, item: &T) -> bool;
}

impl<T, F> LayerPredicate<T> for F
where
    T: NodeVariant,
    F: Fn(&SceneGraph, NodeKey, &T) -> bool + 'static,
{
    fn belongs_to_layer(&self, graph: &SceneGraph, key: NodeKey, item: &T) -> bool {
        self(graph, key, item)
    }
}

/// Every object of the kind belongs
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyOfType;

impl<T: NodeVariant> LayerPredicate<T> for AnyOfType {
    fn belongs_to_layer(&self, _graph: &SceneGraph, _key: NodeKey, _item: &T) -> bool {
        true
    }
}

/// Objects visible in the hierarchy belong
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleOnly;

impl<T: NodeVariant> LayerPredicate<T> for VisibleOnly {
    fn belongs_to_layer(&self, graph: &SceneGraph, key: NodeKey, _item: &T) -> bool {
        graph.is_visible_in_hierarchy(key)
    }
}

/// Visible meshes drawn with one shader belong
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsesShader {
    /// Shader the layer groups by
    pub shader: ShaderId,
}

impl LayerPredicate<Mesh> for UsesShader {
    fn belongs_to_layer(&self, graph: &SceneGraph, key: NodeKey, item: &Mesh) -> bool {
        item.uses_shader(self.shader) && graph.is_visible_in_hierarchy(key)
    }
}

/// Layer whose membership is a predicate over objects of kind `T`
pub struct AutoLayer<T: NodeVariant, P: LayerPredicate<T>> {
    state: LayerState,
    predicate: P,
    _kind: PhantomData<fn() -> T>,
}

/// All objects of kind `T` reachable from the scene root
pub type TypeLayer<T> = AutoLayer<T, AnyOfType>;

/// Visible objects of kind `T`
pub type VisibleLayer<T> = AutoLayer<T, VisibleOnly>;

/// Visible meshes sharing one shader
pub type ShaderLayer = AutoLayer<Mesh, UsesShader>;

impl<T: NodeVariant, P: LayerPredicate<T>> AutoLayer<T, P> {
    /// Detached, empty layer
    pub fn new(name: impl Into<String>, predicate: P) -> Self {
        Self {
            state: LayerState::new(name),
            predicate,
            _kind: PhantomData,
        }
    }

    /// Membership rule
    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    /// Whether `node` should currently be a member
    ///
    /// Nodes outside the scene never belong, whatever the predicate says.
    pub fn belongs_to_layer(&self, graph: &SceneGraph, key: NodeKey, node: &SceneNode, item: &T) -> bool {
        node.in_scene() && self.predicate.belongs_to_layer(graph, key, item)
    }
}

impl<T: NodeVariant> AutoLayer<T, AnyOfType> {
    /// Layer of every object of kind `T`, named after the kind
    pub fn of_type() -> Self {
        Self::new(T::NAME, AnyOfType)
    }
}

impl<T: NodeVariant> Default for AutoLayer<T, AnyOfType> {
    fn default() -> Self {
        Self::of_type()
    }
}

impl<T: NodeVariant> AutoLayer<T, VisibleOnly> {
    /// Layer of the visible objects of kind `T`
    pub fn visible() -> Self {
        Self::new(format!("visible {}", T::NAME), VisibleOnly)
    }
}

impl AutoLayer<Mesh, UsesShader> {
    /// Layer of the visible meshes drawn with `shader`
    pub fn for_shader(shader: ShaderId) -> Self {
        Self::new(format!("meshes using {shader}"), UsesShader { shader })
    }

    /// Shader this layer groups by
    pub fn shader(&self) -> ShaderId {
        self.predicate.shader
    }
}

impl<T: NodeVariant, P: LayerPredicate<T>> Layer for AutoLayer<T, P> {
    fn state(&self) -> &LayerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut LayerState {
        &mut self.state
    }

    fn notify_changed(
        &mut self,
        graph: &SceneGraph,
        key: NodeKey,
        _change: ChangeDescriptor,
        index: &mut MembershipIndex,
    ) {
        if !self.is_attached() {
            return;
        }
        // Stale key: the object is gone, nothing to evaluate
        let Some(node) = graph.get(key) else {
            return;
        };
        let Some(item) = T::extract(node) else {
            return;
        };

        let layer = self.state.id;
        let object = node.id();
        let is_member = index.contains(layer, object);
        let belongs = self.belongs_to_layer(graph, key, node, item);

        if belongs && !is_member {
            log::trace!("{} joins layer '{}'", object, self.state.name());
            self.state.add_member(Member { key, id: object }, index);
        } else if !belongs && is_member {
            log::trace!("{} leaves layer '{}'", object, self.state.name());
            self.state.remove_member(object, index);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl<T: NodeVariant, P: LayerPredicate<T>> fmt::Debug for AutoLayer<T, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AutoLayer")
            .field("kind", &T::NAME)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::layer::Attachment;
    use crate::scene::identity::{IdentityAllocator, ObjectId};
    use crate::scene::material::Material;
    use crate::scene::node::{Light, NodeKind};
    use crate::foundation::math::Vec3;
    use std::sync::Arc;

    fn attach<L: Layer>(layer: &mut L, graph: &SceneGraph) {
        let id = graph.identities().allocate();
        layer.attach(Attachment { manager: graph.scene_id(), layer: id });
    }

    fn mesh(shader: u32) -> NodeKind {
        NodeKind::Mesh(Mesh::new("cube", Material::new("m", ShaderId::new(shader))))
    }

    #[test]
    fn test_detached_layer_ignores_notifications() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let node = graph.create_node(mesh(1));
        graph.add_child(graph.root(), node);
        let mut index = MembershipIndex::default();
        let mut layer = TypeLayer::<Mesh>::of_type();

        layer.notify_changed(&graph, node, ChangeDescriptor::SCENE_ADD, &mut index);

        assert!(layer.content().is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_type_filter_and_transitions() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let light = graph.create_node(NodeKind::Light(Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0)));
        let cube = graph.create_node(mesh(1));
        graph.add_child(graph.root(), light);
        graph.add_child(graph.root(), cube);

        let mut index = MembershipIndex::default();
        let mut lights = TypeLayer::<Light>::of_type();
        attach(&mut lights, &graph);

        lights.notify_changed(&graph, cube, ChangeDescriptor::SCENE_ADD, &mut index);
        assert!(lights.content().is_empty());

        lights.notify_changed(&graph, light, ChangeDescriptor::SCENE_ADD, &mut index);
        lights.notify_changed(&graph, light, ChangeDescriptor::PARENT, &mut index);
        assert_eq!(lights.content().len(), 1);
        assert_eq!(lights.version(), 1);
        assert!(index.contains(lights.id(), graph.node(light).id()));

        graph.remove_child(graph.root(), light);
        lights.notify_changed(&graph, light, ChangeDescriptor::SCENE_REMOVE, &mut index);
        assert!(lights.content().is_empty());
        assert!(!index.contains(lights.id(), graph.node(light).id()));
    }

    #[test]
    fn test_shader_predicate_respects_visibility() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let cube = graph.create_node(mesh(3));
        graph.add_child(graph.root(), cube);

        let mut index = MembershipIndex::default();
        let mut layer = ShaderLayer::for_shader(ShaderId::new(3));
        attach(&mut layer, &graph);
        assert_eq!(layer.shader(), ShaderId::new(3));

        layer.notify_changed(&graph, cube, ChangeDescriptor::SCENE_ADD, &mut index);
        assert!(layer.content().contains_key(cube));

        graph.set_visible(cube, false);
        layer.notify_changed(&graph, cube, ChangeDescriptor::VISIBILITY, &mut index);
        assert!(!layer.content().contains_key(cube));
    }

    #[test]
    fn test_closure_predicate() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let dim = graph.create_node(NodeKind::Light(Light::point(Vec3::new(1.0, 1.0, 1.0), 0.5, 4.0)));
        let bright = graph.create_node(NodeKind::Light(Light::point(Vec3::new(1.0, 1.0, 1.0), 5.0, 4.0)));
        graph.add_child(graph.root(), dim);
        graph.add_child(graph.root(), bright);

        let mut index = MembershipIndex::default();
        let mut layer = AutoLayer::<Light, _>::new("bright lights", |_: &SceneGraph, _: NodeKey, light: &Light| light.intensity > 1.0);
        attach(&mut layer, &graph);

        for key in [dim, bright] {
            layer.notify_changed(&graph, key, ChangeDescriptor::SCENE_ADD, &mut index);
        }

        assert_eq!(layer.content().keys().collect::<Vec<_>>(), vec![bright]);
        assert_ne!(layer.id(), ObjectId::UNASSIGNED);
    }

    #[test]
    fn test_stale_key_is_ignored() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let cube = graph.create_node(mesh(1));
        graph.destroy(cube);

        let mut index = MembershipIndex::default();
        let mut layer = VisibleLayer::<Mesh>::visible();
        attach(&mut layer, &graph);
        layer.notify_changed(&graph, cube, ChangeDescriptor::UNSPECIFIED, &mut index);

        assert!(layer.content().is_empty());
    }
}
