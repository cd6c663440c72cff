//! Layers created on demand
//!
//! A [`LayerBuilder`] watches the notification stream and hands back new
//! layers when it sees a key it has no layer for yet. The scene attaches the
//! returned layers and replays the triggering notification into them, so the
//! object that caused the creation is already a member when listeners run.

use crate::foundation::collections::NodeKey;
use crate::layers::auto_layer::ShaderLayer;
use crate::layers::layer::{Layer, LayerId};
use crate::scene::change::ChangeDescriptor;
use crate::scene::graph::SceneGraph;
use crate::scene::material::ShaderId;
use crate::scene::node::{Mesh, NodeVariant};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;

/// Source of layers created in response to scene changes
pub trait LayerBuilder: Any + fmt::Debug {
    /// Layers to attach after `change` on `node`
    ///
    /// Returned layers should already carry an identity so the builder can
    /// remember them. Must only read the graph.
    fn on_changed(&mut self, graph: &SceneGraph, node: NodeKey, change: ChangeDescriptor) -> Vec<Box<dyn Layer>>;

    /// Whether `layer` was created by this builder
    ///
    /// The scene refuses to detach such layers while the builder still
    /// refers to them.
    fn owns(&self, layer: LayerId) -> bool;

    /// Downcasting support for typed lookups
    fn as_any(&self) -> &dyn Any;
}

impl dyn LayerBuilder {
    /// Typed view of this builder
    pub fn downcast_ref<B: LayerBuilder>(&self) -> Option<&B> {
        self.as_any().downcast_ref::<B>()
    }
}

/// One [`ShaderLayer`] per shader used by any mesh seen in the scene
///
/// Layers are memoized for the lifetime of the scene and never removed, even
/// when the last mesh using a shader goes away.
#[derive(Debug, Default)]
pub struct ShaderLayerBuilder {
    layers: HashMap<ShaderId, LayerId>,
}

impl ShaderLayerBuilder {
    /// Builder that has not created anything yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer grouping `shader`, if one has been created
    pub fn layer_for(&self, shader: ShaderId) -> Option<LayerId> {
        self.layers.get(&shader).copied()
    }

    /// Number of layers created so far
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layer has been created yet
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// `(shader, layer)` pairs, unordered
    pub fn iter(&self) -> impl Iterator<Item = (ShaderId, LayerId)> + '_ {
        self.layers.iter().map(|(&shader, &layer)| (shader, layer))
    }
}

impl LayerBuilder for ShaderLayerBuilder {
    fn on_changed(&mut self, graph: &SceneGraph, node: NodeKey, change: ChangeDescriptor) -> Vec<Box<dyn Layer>> {
        if !change.is_any(ChangeDescriptor::ADDED | ChangeDescriptor::RENDER) {
            return Vec::new();
        }
        let Some(scene_node) = graph.get(node) else {
            return Vec::new();
        };
        if !scene_node.in_scene() {
            return Vec::new();
        }
        let Some(mesh) = Mesh::extract(scene_node) else {
            return Vec::new();
        };

        let mut created: Vec<Box<dyn Layer>> = Vec::new();
        for shader in mesh.shaders() {
            if self.layers.contains_key(&shader) {
                continue;
            }
            let mut layer = ShaderLayer::for_shader(shader);
            let id = graph.identities().ensure(&mut layer.state_mut().id);
            self.layers.insert(shader, id);

            log::debug!("Created layer {} for {}", id, shader);
            created.push(Box::new(layer));
        }
        created
    }

    fn owns(&self, layer: LayerId) -> bool {
        self.layers.values().any(|&id| id == layer)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::identity::IdentityAllocator;
    use crate::scene::material::Material;
    use crate::scene::node::NodeKind;
    use std::sync::Arc;

    fn material(shader: u32) -> Material {
        Material::new(format!("material {shader}"), ShaderId::new(shader))
    }

    #[test]
    fn test_one_layer_per_shader() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let a = graph.create_node(NodeKind::Mesh(Mesh::new("a", material(1))));
        let b = graph.create_node(NodeKind::Mesh(Mesh::new("b", material(1))));
        graph.add_child(graph.root(), a);
        graph.add_child(graph.root(), b);

        let mut builder = ShaderLayerBuilder::new();
        let first = builder.on_changed(&graph, a, ChangeDescriptor::SCENE_ADD);
        let second = builder.on_changed(&graph, b, ChangeDescriptor::SCENE_ADD);

        assert_eq!(first.len(), 1);
        assert!(second.is_empty());
        assert_eq!(builder.layer_for(ShaderId::new(1)), Some(first[0].id()));
        assert!(first[0].id().is_assigned());
        assert!(builder.owns(first[0].id()));
        assert!(!builder.owns(graph.scene_id()));
    }

    #[test]
    fn test_material_change_adds_layer() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let cube = graph.create_node(NodeKind::Mesh(Mesh::new("cube", material(1))));
        graph.add_child(graph.root(), cube);

        let mut builder = ShaderLayerBuilder::new();
        builder.on_changed(&graph, cube, ChangeDescriptor::SCENE_ADD);

        graph.set_materials(cube, vec![material(1), material(2), material(2)]);
        let created = builder.on_changed(&graph, cube, ChangeDescriptor::RENDER);

        assert_eq!(created.len(), 1);
        assert_eq!(builder.len(), 2);
        assert_ne!(builder.layer_for(ShaderId::new(1)), builder.layer_for(ShaderId::new(2)));
    }

    #[test]
    fn test_ignores_irrelevant_changes() {
        let mut graph = SceneGraph::new(Arc::new(IdentityAllocator::new()));
        let detached = graph.create_node(NodeKind::Mesh(Mesh::new("ghost", material(4))));
        let group = graph.create_node(NodeKind::Group);
        graph.add_child(graph.root(), group);

        let mut builder = ShaderLayerBuilder::new();
        assert!(builder.on_changed(&graph, detached, ChangeDescriptor::RENDER).is_empty());
        assert!(builder.on_changed(&graph, group, ChangeDescriptor::SCENE_ADD).is_empty());

        graph.add_child(graph.root(), detached);
        assert!(builder.on_changed(&graph, detached, ChangeDescriptor::TRANSFORM).is_empty());
        assert!(builder.on_changed(&graph, detached, ChangeDescriptor::VISIBILITY).is_empty());
        assert!(builder.is_empty());
    }
}
