//! Layer manager and membership index
//!
//! The manager owns every layer of one scene, fans each notification out to
//! all of them in attach order, and keeps a `(layer, object)` index so a
//! layer can ask "am I already holding this object" without scanning its
//! content or re-running its state machine.

use crate::error::SceneError;
use crate::foundation::collections::NodeKey;
use crate::layers::layer::{Attachment, Layer, LayerContent, LayerId};
use crate::scene::change::ChangeDescriptor;
use crate::scene::graph::SceneGraph;
use crate::scene::identity::{IdentityAllocator, ObjectId};
use std::collections::HashSet;
use std::sync::Arc;

/// Set of `(layer, object)` memberships
///
/// Written only through [`notify_object_added`](Self::notify_object_added)
/// and [`notify_object_removed`](Self::notify_object_removed).
#[derive(Debug, Clone, Default)]
pub struct MembershipIndex {
    entries: HashSet<(LayerId, ObjectId)>,
}

impl MembershipIndex {
    /// Whether `object` is recorded as a member of `layer`
    pub fn contains(&self, layer: LayerId, object: ObjectId) -> bool {
        self.entries.contains(&(layer, object))
    }

    /// Record `object` joining `layer`
    pub fn notify_object_added(&mut self, layer: LayerId, object: ObjectId) {
        self.entries.insert((layer, object));
    }

    /// Record `object` leaving `layer`
    pub fn notify_object_removed(&mut self, layer: LayerId, object: ObjectId) {
        self.entries.remove(&(layer, object));
    }

    /// Number of memberships across all layers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no layer has any member
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All recorded memberships, unordered
    pub fn iter(&self) -> impl Iterator<Item = (LayerId, ObjectId)> + '_ {
        self.entries.iter().copied()
    }
}

/// Owner of the layers of one scene
#[derive(Debug)]
pub struct LayerManager {
    owner: ObjectId,
    identities: Arc<IdentityAllocator>,
    layers: Vec<Box<dyn Layer>>,
    index: MembershipIndex,
}

impl LayerManager {
    /// Empty manager for the scene identified by `owner`
    pub fn new(owner: ObjectId, identities: Arc<IdentityAllocator>) -> Self {
        Self {
            owner,
            identities,
            layers: Vec::new(),
            index: MembershipIndex::default(),
        }
    }

    /// Identity of the owning scene
    pub fn owner(&self) -> ObjectId {
        self.owner
    }

    /// Attach a layer
    ///
    /// Returns the layer's identity. If a layer with that identity is already
    /// attached here, nothing changes. Objects the layer already holds are
    /// entered into the index so it starts out consistent.
    pub fn add(&mut self, mut layer: Box<dyn Layer>) -> LayerId {
        let existing = layer.id();
        if existing.is_assigned() && self.position(existing).is_some() {
            return existing;
        }

        let id = self.identities.ensure(&mut layer.state_mut().id);
        layer.attach(Attachment { manager: self.owner, layer: id });
        for member in layer.content() {
            self.index.notify_object_added(id, member.id);
        }

        log::debug!("Attached layer '{}' ({}) with {} objects", layer.name(), id, layer.content().len());
        self.layers.push(layer);
        id
    }

    /// Detach a layer and hand it back
    ///
    /// Its memberships are removed from the index first.
    pub fn remove(&mut self, id: LayerId) -> Option<Box<dyn Layer>> {
        let position = self.position(id)?;
        let mut layer = self.layers.remove(position);

        for member in layer.content() {
            self.index.notify_object_removed(id, member.id);
        }
        layer.detach();

        log::debug!("Detached layer '{}' ({})", layer.name(), id);
        Some(layer)
    }

    /// Whether `object` is a member of `layer`
    pub fn contains(&self, layer: LayerId, object: ObjectId) -> bool {
        self.index.contains(layer, object)
    }

    /// Forward a notification to every layer, in attach order
    pub fn notify_changed(&mut self, graph: &SceneGraph, node: NodeKey, change: ChangeDescriptor) {
        let Self { layers, index, .. } = self;
        for layer in layers.iter_mut() {
            layer.notify_changed(graph, node, change, index);
        }
    }

    /// Clear the recorded membership transitions of every layer
    pub fn clear_changes(&mut self) {
        for layer in &mut self.layers {
            layer.state_mut().clear_changes();
        }
    }

    /// Deliver a notification to one layer only
    ///
    /// Used to catch a freshly created layer up with the notification that
    /// caused its creation. Returns false when no such layer is attached.
    pub fn replay(&mut self, id: LayerId, graph: &SceneGraph, node: NodeKey, change: ChangeDescriptor) -> bool {
        let Some(position) = self.position(id) else {
            return false;
        };
        self.layers[position].notify_changed(graph, node, change, &mut self.index);
        true
    }

    /// Layer by identity
    pub fn get(&self, id: LayerId) -> Option<&dyn Layer> {
        let position = self.position(id)?;
        Some(self.layers[position].as_ref())
    }

    /// Layer by identity, mutable
    ///
    /// Callers may toggle visibility; content is owned by the layer itself.
    pub fn get_mut(&mut self, id: LayerId) -> Option<&mut dyn Layer> {
        let position = self.position(id)?;
        Some(self.layers[position].as_mut())
    }

    /// Content of a layer
    pub fn content(&self, id: LayerId) -> Option<&LayerContent> {
        self.get(id).map(|layer| layer.content())
    }

    /// First attached layer of type `L`
    pub fn find<L: Layer>(&self) -> Option<&L> {
        self.layers.iter().find_map(|layer| layer.downcast_ref::<L>())
    }

    /// Every attached layer of type `L`, in attach order
    pub fn find_all<L: Layer>(&self) -> impl Iterator<Item = &L> + '_ {
        self.layers.iter().filter_map(|layer| layer.downcast_ref::<L>())
    }

    /// Layer by display name
    pub fn find_by_name(&self, name: &str) -> Option<&dyn Layer> {
        self.iter().find(|layer| layer.name() == name)
    }

    /// Attached layers in attach order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Layer> + '_ {
        self.layers.iter().map(|layer| -> &dyn Layer { layer.as_ref() })
    }

    /// Number of attached layers
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// Whether no layer is attached
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Membership index
    pub fn index(&self) -> &MembershipIndex {
        &self.index
    }

    /// Check that the index and the layers' content agree
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut members = 0;
        for layer in &self.layers {
            for member in layer.content() {
                if !self.index.contains(layer.id(), member.id) {
                    return Err(SceneError::IndexMismatch { layer: layer.id(), object: member.id });
                }
                members += 1;
            }
        }

        if members != self.index.len() {
            for (layer, object) in self.index.iter() {
                let present = self.content(layer).is_some_and(|content| content.contains_id(object));
                if !present {
                    return Err(SceneError::IndexMismatch { layer, object });
                }
            }
        }
        Ok(())
    }

    fn position(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|layer| layer.id() == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::auto_layer::TypeLayer;
    use crate::foundation::math::Vec3;
    use crate::scene::node::{Camera, Light, NodeKind, SceneNode};

    struct Fixture {
        graph: SceneGraph,
        manager: LayerManager,
    }

    impl Fixture {
        fn new() -> Self {
            let identities = Arc::new(IdentityAllocator::new());
            let graph = SceneGraph::new(Arc::clone(&identities));
            let manager = LayerManager::new(graph.scene_id(), identities);
            Self { graph, manager }
        }

        fn add_light(&mut self) -> NodeKey {
            let light = self.graph.create_node(NodeKind::Light(Light::directional(Vec3::new(1.0, 1.0, 1.0), 1.0)));
            let root = self.graph.root();
            self.graph.add_child(root, light);
            self.manager.notify_changed(&self.graph, light, ChangeDescriptor::SCENE_ADD);
            light
        }
    }

    #[test]
    fn test_fan_out_reaches_every_layer() {
        let mut fx = Fixture::new();
        let lights = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        let cameras = fx.manager.add(Box::new(TypeLayer::<Camera>::of_type()));
        let objects = fx.manager.add(Box::new(TypeLayer::<SceneNode>::of_type()));

        let light = fx.add_light();
        let id = fx.graph.node(light).id();

        assert!(fx.manager.contains(lights, id));
        assert!(!fx.manager.contains(cameras, id));
        assert!(fx.manager.contains(objects, id));
        assert_eq!(fx.manager.index().len(), 2);
        assert!(fx.manager.validate().is_ok());
    }

    #[test]
    fn test_add_is_idempotent_per_identity() {
        let mut fx = Fixture::new();
        let id = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        let layer = fx.manager.remove(id).unwrap();
        assert!(!layer.is_attached());

        // Re-attaching keeps the identity
        assert_eq!(fx.manager.add(layer), id);
        assert_eq!(fx.manager.len(), 1);
        assert_eq!(fx.manager.get(id).unwrap().attachment().map(|a| a.manager), Some(fx.graph.scene_id()));
    }

    #[test]
    fn test_late_layer_is_seeded_from_content() {
        let mut fx = Fixture::new();
        let first = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        let light = fx.add_light();
        let id = fx.graph.node(light).id();

        // Move the populated layer to a fresh manager
        let layer = fx.manager.remove(first).unwrap();
        assert!(!fx.manager.contains(first, id));
        assert!(fx.manager.index().is_empty());

        let mut other = LayerManager::new(fx.graph.scene_id(), Arc::clone(fx.graph.identities()));
        let moved = other.add(layer);
        assert_eq!(moved, first);
        assert!(other.contains(moved, id));
        assert!(other.validate().is_ok());
    }

    #[test]
    fn test_replay_targets_one_layer() {
        let mut fx = Fixture::new();
        let light = fx.add_light();
        let a = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        let b = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));

        assert!(fx.manager.replay(b, &fx.graph, light, ChangeDescriptor::SCENE_ADD));
        assert!(!fx.manager.replay(ObjectId::UNASSIGNED, &fx.graph, light, ChangeDescriptor::SCENE_ADD));

        assert!(fx.manager.content(a).unwrap().is_empty());
        assert!(fx.manager.content(b).unwrap().contains_key(light));
    }

    #[test]
    fn test_typed_lookup() {
        let mut fx = Fixture::new();
        fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        fx.manager.add(Box::new(TypeLayer::<Camera>::of_type()));

        assert!(fx.manager.find::<TypeLayer<Camera>>().is_some());
        assert_eq!(fx.manager.find_all::<TypeLayer<Light>>().count(), 1);
        assert!(fx.manager.find::<TypeLayer<SceneNode>>().is_none());
        assert_eq!(fx.manager.find_by_name("cameras").map(|layer| layer.name()), Some("cameras"));
    }

    #[test]
    fn test_changes_accumulate_until_cleared() {
        let mut fx = Fixture::new();
        let lights = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        let cameras = fx.manager.add(Box::new(TypeLayer::<Camera>::of_type()));
        let first = fx.add_light();
        let second = fx.add_light();

        let keys: Vec<NodeKey> = fx.manager.get(lights).unwrap().changes().iter().map(|c| c.member.key).collect();
        assert_eq!(keys, vec![first, second]);
        assert!(fx.manager.get(cameras).unwrap().changes().is_empty());

        fx.manager.clear_changes();
        assert!(fx.manager.iter().all(|layer| layer.changes().is_empty()));
        // Content and index are untouched
        assert_eq!(fx.manager.content(lights).unwrap().len(), 2);
        assert_eq!(fx.manager.index().len(), 2);
    }

    #[test]
    fn test_validate_detects_drift() {
        let mut fx = Fixture::new();
        let lights = fx.manager.add(Box::new(TypeLayer::<Light>::of_type()));
        let light = fx.add_light();
        let id = fx.graph.node(light).id();

        fx.manager.index.notify_object_removed(lights, id);
        assert_eq!(fx.manager.validate(), Err(SceneError::IndexMismatch { layer: lights, object: id }));

        fx.manager.index.notify_object_added(lights, id);
        fx.manager.index.notify_object_added(lights, ObjectId::UNASSIGNED);
        assert_eq!(
            fx.manager.validate(),
            Err(SceneError::IndexMismatch { layer: lights, object: ObjectId::UNASSIGNED })
        );
    }
}
