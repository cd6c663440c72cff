//! Scene graph arena
//!
//! Owns every node of one scene. Ownership flows parent → child through the
//! `children` lists; the `parent` field is a lookup-only back reference, so
//! the whole hierarchy is plain data addressed by [`NodeKey`].
//!
//! Structural edits here never notify anyone. [`Scene`](crate::scene::Scene)
//! wraps them and turns the returned [`Reparent`] reports into notifications.

use crate::error::SceneError;
use crate::foundation::collections::{NodeArena, NodeKey};
use crate::foundation::math::{LocalTransform, Mat4};
use crate::scene::identity::{IdentityAllocator, ObjectId};
use crate::scene::material::Material;
use crate::scene::node::{NodeKind, SceneNode};
use std::sync::Arc;

/// Outcome of a structural edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reparent {
    /// False when the call was a no-op
    pub changed: bool,
    /// Nodes that just became reachable from the root, parents first
    pub entered_scene: Vec<NodeKey>,
    /// Nodes that are no longer reachable from the root, parents first
    pub left_scene: Vec<NodeKey>,
}

impl Reparent {
    fn unchanged() -> Self {
        Self::default()
    }
}

/// Arena of scene nodes rooted at one group
#[derive(Debug)]
pub struct SceneGraph {
    nodes: NodeArena<SceneNode>,
    root: NodeKey,
    identities: Arc<IdentityAllocator>,
}

impl SceneGraph {
    /// Create a graph holding only its root group
    ///
    /// The root's identity doubles as the scene identity stamped on every
    /// reachable node.
    pub fn new(identities: Arc<IdentityAllocator>) -> Self {
        let mut root = SceneNode::new(NodeKind::Group);
        root.id = identities.allocate();
        root.scene = Some(root.id);
        root.name = Some("root".to_string());

        let mut nodes = NodeArena::with_key();
        let root = nodes.insert(root);

        Self { nodes, root, identities }
    }

    /// Root node handle
    pub fn root(&self) -> NodeKey {
        self.root
    }

    /// Identity of the scene this graph belongs to
    pub fn scene_id(&self) -> ObjectId {
        self.nodes[self.root].id
    }

    /// Shared identity allocator
    pub fn identities(&self) -> &Arc<IdentityAllocator> {
        &self.identities
    }

    /// Number of live nodes, including the root and detached nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root is never removed
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `key` names a live node
    pub fn contains(&self, key: NodeKey) -> bool {
        self.nodes.contains_key(key)
    }

    /// Look up a node
    pub fn get(&self, key: NodeKey) -> Option<&SceneNode> {
        self.nodes.get(key)
    }

    /// Look up a node that must exist
    ///
    /// # Panics
    /// When `key` is stale or belongs to another graph.
    pub fn node(&self, key: NodeKey) -> &SceneNode {
        self.try_node(key).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Look up a node, reporting unknown keys as an error
    pub fn try_node(&self, key: NodeKey) -> Result<&SceneNode, SceneError> {
        self.nodes.get(key).ok_or(SceneError::UnknownNode(key))
    }

    fn try_node_mut(&mut self, key: NodeKey) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(key).ok_or(SceneError::UnknownNode(key))
    }

    fn node_mut(&mut self, key: NodeKey) -> &mut SceneNode {
        self.try_node_mut(key).unwrap_or_else(|e| panic!("{e}"))
    }

    /// All live nodes in arena order
    pub fn iter(&self) -> impl Iterator<Item = (NodeKey, &SceneNode)> {
        self.nodes.iter()
    }

    /// Allocate a detached node
    pub fn create_node(&mut self, kind: NodeKind) -> NodeKey {
        self.nodes.insert(SceneNode::new(kind))
    }

    /// Set the debug name of a node
    pub fn set_name(&mut self, key: NodeKey, name: impl Into<String>) {
        self.node_mut(key).name = Some(name.into());
    }

    /// First node in depth-first order from the root carrying `name`
    pub fn find_by_name(&self, name: &str) -> Option<NodeKey> {
        self.subtree(self.root)
            .into_iter()
            .find(|&key| self.nodes[key].name() == Some(name))
    }

    /// Parent of `key`, if any
    pub fn parent(&self, key: NodeKey) -> Option<NodeKey> {
        self.nodes.get(key).and_then(SceneNode::parent)
    }

    /// Children of `key` in insertion order
    pub fn children(&self, key: NodeKey) -> &[NodeKey] {
        self.nodes.get(key).map_or(&[][..], |node| node.children())
    }

    /// Ancestors of `key`, nearest first
    pub fn ancestors(&self, key: NodeKey) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.parent(key),
        }
    }

    /// Whether `ancestor` is `key` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeKey, key: NodeKey) -> bool {
        key == ancestor || self.ancestors(key).any(|k| k == ancestor)
    }

    /// `key` and all its descendants, depth-first in insertion order
    pub fn subtree(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut out = Vec::new();
        if !self.nodes.contains_key(key) {
            return out;
        }

        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            out.push(current);
            // Reverse so the first child is visited first
            stack.extend(self.nodes[current].children.iter().rev().copied());
        }
        out
    }

    /// Descendants of `key`, depth-first in insertion order, excluding `key`
    pub fn descendants(&self, key: NodeKey) -> Vec<NodeKey> {
        let mut keys = self.subtree(key);
        if !keys.is_empty() {
            keys.remove(0);
        }
        keys
    }

    /// Own flag of `key` and of every ancestor
    pub fn is_visible_in_hierarchy(&self, key: NodeKey) -> bool {
        match self.nodes.get(key) {
            Some(node) => node.visible && self.ancestors(key).all(|k| self.nodes[k].visible),
            None => false,
        }
    }

    /// Reparent `child` under `parent`
    ///
    /// # Panics
    /// On unknown keys, a non-group parent, reparenting the root, or a cycle.
    pub fn add_child(&mut self, parent: NodeKey, child: NodeKey) -> Reparent {
        self.try_add_child(parent, child).unwrap_or_else(|e| panic!("{e}"))
    }

    /// Reparent `child` under `parent`, reporting misuse as an error
    ///
    /// A no-op when `child` already sits under `parent`. Otherwise `child` is
    /// removed from its previous parent before being appended here. World
    /// matrices are only marked dirty; call
    /// [`update_world_matrix`](Self::update_world_matrix) to settle them.
    pub fn try_add_child(&mut self, parent: NodeKey, child: NodeKey) -> Result<Reparent, SceneError> {
        let parent_node = self.try_node(parent)?;
        let child_node = self.try_node(child)?;

        if child_node.parent == Some(parent) {
            return Ok(Reparent::unchanged());
        }
        if child == self.root {
            return Err(SceneError::RootReparent);
        }
        if !parent_node.kind.is_group() {
            return Err(SceneError::NotAGroup(parent));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle { parent, child });
        }

        let target_scene = parent_node.scene;
        let was_in_scene = child_node.in_scene();

        if let Some(old_parent) = child_node.parent {
            self.nodes[old_parent].children.retain(|&k| k != child);
        }

        let identities = Arc::clone(&self.identities);
        {
            let node = &mut self.nodes[child];
            identities.ensure(&mut node.id);
            node.parent = Some(parent);
        }
        self.nodes[parent].children.push(child);
        self.mark_world_dirty(child);

        let mut report = Reparent {
            changed: true,
            ..Reparent::default()
        };
        match (was_in_scene, target_scene) {
            (false, Some(scene)) => report.entered_scene = self.stamp_scene(child, Some(scene)),
            (true, None) => report.left_scene = self.stamp_scene(child, None),
            _ => {}
        }
        Ok(report)
    }

    /// Detach `child` from `parent`
    ///
    /// A no-op when `child` is not a child of `parent`.
    pub fn remove_child(&mut self, parent: NodeKey, child: NodeKey) -> Reparent {
        match self.nodes.get(child) {
            Some(node) if node.parent == Some(parent) => {}
            _ => return Reparent::unchanged(),
        }

        self.nodes[parent].children.retain(|&k| k != child);
        let was_in_scene = {
            let node = &mut self.nodes[child];
            node.parent = None;
            node.in_scene()
        };
        self.mark_world_dirty(child);

        Reparent {
            changed: true,
            entered_scene: Vec::new(),
            left_scene: if was_in_scene { self.stamp_scene(child, None) } else { Vec::new() },
        }
    }

    /// Drop a node and its subtree from the arena
    ///
    /// The node is detached from its parent first. Returns the removed keys,
    /// parents first. The root cannot be destroyed.
    pub fn destroy(&mut self, key: NodeKey) -> Vec<SceneNode> {
        if key == self.root || !self.nodes.contains_key(key) {
            return Vec::new();
        }
        if let Some(parent) = self.nodes[key].parent {
            self.remove_child(parent, key);
        }

        self.subtree(key)
            .into_iter()
            .filter_map(|k| self.nodes.remove(k))
            .collect()
    }

    /// Replace the local transform and invalidate cached world matrices
    pub fn set_local_transform(&mut self, key: NodeKey, transform: impl Into<LocalTransform>) {
        self.node_mut(key).local = transform.into();
        self.mark_world_dirty(key);
    }

    /// Set the own visibility flag; returns whether it changed
    pub fn set_visible(&mut self, key: NodeKey, visible: bool) -> bool {
        let node = self.node_mut(key);
        if node.visible == visible {
            return false;
        }
        node.visible = visible;
        true
    }

    /// Replace the materials of a mesh node
    ///
    /// # Panics
    /// When `key` is not a mesh.
    pub fn set_materials(&mut self, key: NodeKey, materials: Vec<Material>) {
        match &mut self.node_mut(key).kind {
            NodeKind::Mesh(mesh) => mesh.materials = materials,
            other => panic!("node {key:?} is a {}, not a mesh", other.label()),
        }
    }

    /// Cached world matrix of `key`
    pub fn world_matrix(&self, key: NodeKey) -> Option<&Mat4> {
        self.nodes.get(key).map(SceneNode::world_matrix)
    }

    /// Recompute the world matrix of `key`
    ///
    /// With `update_parent`, the ancestor chain is settled first. With
    /// `update_children`, every child whose input changed (or that is itself
    /// dirty further down) is recomputed recursively with `(true, false)`.
    /// Returns whether the world matrix of `key` changed numerically.
    pub fn update_world_matrix(&mut self, key: NodeKey, update_children: bool, update_parent: bool) -> bool {
        let Some(node) = self.nodes.get(key) else {
            return false;
        };
        let parent = node.parent;

        if update_parent {
            if let Some(parent) = parent {
                self.update_world_matrix(parent, false, true);
            }
        }

        let parent_world = parent.map(|p| self.nodes[p].world);
        let node = &mut self.nodes[key];
        let local = node.local.to_matrix();
        let world = match parent_world {
            Some(parent_world) => parent_world * local,
            None => local,
        };

        let changed = world != node.world;
        node.world = world;
        node.world_dirty = false;

        if update_children {
            node.descendant_dirty = false;
            let count = node.children.len();
            for i in 0..count {
                let child_key = self.nodes[key].children[i];
                let child = &self.nodes[child_key];
                if changed || child.world_dirty || child.descendant_dirty {
                    self.update_world_matrix(child_key, true, false);
                }
            }
        }

        changed
    }

    /// Mark `key` and its subtree dirty and flag the ancestors
    fn mark_world_dirty(&mut self, key: NodeKey) {
        for k in self.subtree(key) {
            self.nodes[k].world_dirty = true;
        }

        let mut next = self.nodes[key].parent;
        while let Some(k) = next {
            let node = &mut self.nodes[k];
            if node.descendant_dirty {
                break;
            }
            node.descendant_dirty = true;
            next = node.parent;
        }
    }

    /// Set the scene reference on a subtree; returns the touched keys
    fn stamp_scene(&mut self, key: NodeKey, scene: Option<ObjectId>) -> Vec<NodeKey> {
        let keys = self.subtree(key);
        for &k in &keys {
            let node = &mut self.nodes[k];
            if scene.is_some() {
                self.identities.ensure(&mut node.id);
            }
            node.scene = scene;
        }
        keys
    }
}

/// Iterator over the ancestors of a node, nearest first
#[derive(Debug)]
pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeKey>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeKey;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.graph.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Transform, Vec3};
    use crate::scene::node::{Light, Mesh};
    use crate::scene::material::ShaderId;
    use approx::assert_relative_eq;

    fn graph() -> SceneGraph {
        SceneGraph::new(Arc::new(IdentityAllocator::new()))
    }

    fn offset(x: f32) -> Transform {
        Transform::from_position(Vec3::new(x, 0.0, 0.0))
    }

    #[test]
    fn test_root_is_in_scene() {
        let graph = graph();
        let root = graph.node(graph.root());

        assert!(root.in_scene());
        assert_eq!(root.scene(), Some(graph.scene_id()));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_transform_chain_propagation() {
        let mut graph = graph();
        let mut chain = vec![graph.root()];
        for i in 0..5 {
            let node = graph.create_node(NodeKind::Group);
            graph.set_local_transform(node, offset(1.0 + i as f32));
            graph.add_child(*chain.last().unwrap(), node);
            chain.push(node);
        }
        graph.update_world_matrix(graph.root(), true, true);

        graph.set_local_transform(graph.root(), Transform::from_position(Vec3::new(0.0, 2.0, 0.0)).with_uniform_scale(2.0));
        assert!(graph.update_world_matrix(graph.root(), true, true));

        let mut expected = Mat4::identity();
        for &key in &chain {
            expected *= graph.node(key).local_transform().to_matrix();
            assert!(!graph.node(key).is_world_dirty());
            assert_relative_eq!(*graph.world_matrix(key).unwrap(), expected, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_orphan_world_equals_local() {
        let mut graph = graph();
        let node = graph.create_node(NodeKind::Group);
        graph.set_local_transform(node, offset(3.0));

        assert!(graph.update_world_matrix(node, false, true));
        assert_eq!(*graph.world_matrix(node).unwrap(), offset(3.0).to_matrix());
        // Second pass: nothing moved
        assert!(!graph.update_world_matrix(node, false, true));
    }

    #[test]
    fn test_deep_dirty_node_reached_from_root() {
        let mut graph = graph();
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        graph.add_child(graph.root(), a);
        graph.add_child(a, b);
        graph.update_world_matrix(graph.root(), true, false);

        graph.set_local_transform(b, offset(4.0));
        assert!(graph.node(b).is_world_dirty());
        assert!(!graph.node(a).is_world_dirty());

        // Root and `a` are unchanged, yet `b` must still be recomputed
        assert!(!graph.update_world_matrix(graph.root(), true, false));
        assert!(!graph.node(b).is_world_dirty());
        assert_eq!(*graph.world_matrix(b).unwrap(), offset(4.0).to_matrix());
    }

    #[test]
    fn test_update_parent_settles_ancestors() {
        let mut graph = graph();
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        graph.add_child(graph.root(), a);
        graph.add_child(a, b);
        graph.set_local_transform(a, offset(1.0));
        graph.set_local_transform(b, offset(2.0));

        graph.update_world_matrix(b, false, true);

        assert_relative_eq!(*graph.world_matrix(b).unwrap(), offset(3.0).to_matrix(), epsilon = 1e-6);
        assert!(!graph.node(a).is_world_dirty());
    }

    #[test]
    fn test_reparent_exclusivity() {
        let mut graph = graph();
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        let x = graph.create_node(NodeKind::Group);
        graph.add_child(graph.root(), a);
        graph.add_child(graph.root(), b);

        assert!(graph.add_child(a, x).changed);
        let report = graph.add_child(b, x);

        assert!(report.changed);
        assert!(report.entered_scene.is_empty());
        assert_eq!(graph.parent(x), Some(b));
        assert!(!graph.children(a).contains(&x));
        assert_eq!(graph.children(b), &[x]);

        // Same parent again: nothing happens
        assert_eq!(graph.add_child(b, x), Reparent::default());
        assert_eq!(graph.children(b), &[x]);
    }

    #[test]
    fn test_subtree_enters_and_leaves_scene() {
        let mut graph = graph();
        let group = graph.create_node(NodeKind::Group);
        let light = graph.create_node(NodeKind::Light(Light::point(Vec3::new(1.0, 1.0, 1.0), 1.0, 5.0)));
        graph.add_child(group, light);
        assert!(graph.node(light).id().is_assigned());
        assert!(!graph.node(group).id().is_assigned());

        let entered = graph.add_child(graph.root(), group);
        assert_eq!(entered.entered_scene, vec![group, light]);
        assert!(graph.node(group).id().is_assigned());
        assert!(graph.node(light).in_scene());

        let left = graph.remove_child(graph.root(), group);
        assert_eq!(left.left_scene, vec![group, light]);
        assert!(!graph.node(light).in_scene());
        // Identities survive leaving the scene
        assert!(graph.node(light).id().is_assigned());
    }

    #[test]
    fn test_remove_child_requires_parent() {
        let mut graph = graph();
        let a = graph.create_node(NodeKind::Group);
        let x = graph.create_node(NodeKind::Group);
        graph.add_child(graph.root(), x);

        assert!(!graph.remove_child(a, x).changed);
        assert_eq!(graph.parent(x), Some(graph.root()));
    }

    #[test]
    fn test_misuse_is_reported() {
        let mut graph = graph();
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        let mesh = graph.create_node(NodeKind::Mesh(Mesh::default()));
        graph.add_child(a, b);

        assert_eq!(graph.try_add_child(b, a), Err(SceneError::Cycle { parent: b, child: a }));
        assert_eq!(graph.try_add_child(a, a), Err(SceneError::Cycle { parent: a, child: a }));
        assert_eq!(graph.try_add_child(mesh, b), Err(SceneError::NotAGroup(mesh)));
        assert_eq!(graph.try_add_child(a, graph.root()), Err(SceneError::RootReparent));
    }

    #[test]
    #[should_panic(expected = "cycle")]
    fn test_cycle_panics() {
        let mut graph = graph();
        let a = graph.create_node(NodeKind::Group);
        let b = graph.create_node(NodeKind::Group);
        graph.add_child(a, b);
        graph.add_child(b, a);
    }

    #[test]
    fn test_hierarchy_visibility_and_lookup() {
        let mut graph = graph();
        let group = graph.create_node(NodeKind::Group);
        let mesh = graph.create_node(NodeKind::Mesh(Mesh::default()));
        graph.set_name(mesh, "hull");
        graph.add_child(graph.root(), group);
        graph.add_child(group, mesh);

        assert_eq!(graph.find_by_name("hull"), Some(mesh));
        assert!(graph.is_visible_in_hierarchy(mesh));
        assert!(graph.set_visible(group, false));
        assert!(!graph.set_visible(group, false));
        assert!(graph.node(mesh).is_visible());
        assert!(!graph.is_visible_in_hierarchy(mesh));
    }

    #[test]
    fn test_destroy_removes_subtree() {
        let mut graph = graph();
        let group = graph.create_node(NodeKind::Group);
        let mesh = graph.create_node(NodeKind::Mesh(Mesh::default()));
        graph.add_child(graph.root(), group);
        graph.add_child(group, mesh);

        let removed = graph.destroy(group);

        assert_eq!(removed.len(), 2);
        assert!(!graph.contains(mesh));
        assert!(graph.children(graph.root()).is_empty());
        assert!(graph.destroy(graph.root()).is_empty());
    }

    #[test]
    fn test_set_materials() {
        let mut graph = graph();
        let mesh = graph.create_node(NodeKind::Mesh(Mesh::default()));
        graph.set_materials(mesh, vec![Material::new("steel", ShaderId::new(7))]);

        match graph.node(mesh).kind() {
            NodeKind::Mesh(m) => assert!(m.uses_shader(ShaderId::new(7))),
            other => panic!("unexpected kind {other:?}"),
        }
    }
}
