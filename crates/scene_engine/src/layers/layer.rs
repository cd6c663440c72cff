//! Layer capability
//!
//! A layer is a named, incrementally maintained subset of scene objects.
//! Concrete layers embed a [`LayerState`] and implement
//! [`notify_changed`](Layer::notify_changed); everything else has default
//! implementations on top of that state.

use crate::foundation::collections::NodeKey;
use crate::layers::manager::MembershipIndex;
use crate::scene::change::ChangeDescriptor;
use crate::scene::graph::SceneGraph;
use crate::scene::identity::ObjectId;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::iter::Flatten;
use std::slice;

/// Identity of a layer
pub type LayerId = ObjectId;

/// Link between an attached layer and its manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attachment {
    /// Identity of the scene whose manager owns the layer
    pub manager: ObjectId,
    /// Identity the manager assigned to the layer
    pub layer: LayerId,
}

/// One object in a layer's content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Arena handle
    pub key: NodeKey,
    /// Identity, the membership index key
    pub id: ObjectId,
}

/// Iterator over the members of a layer
pub type Members<'a> = Flatten<slice::Iter<'a, Option<Member>>>;

/// Members of a layer in insertion order
///
/// Lookups go through hash maps. A removal leaves a hole in the ordered
/// slots; holes are compacted away once they outnumber the members.
#[derive(Debug, Clone, Default)]
pub struct LayerContent {
    slots: Vec<Option<Member>>,
    positions: HashMap<ObjectId, usize>,
    keys: HashMap<NodeKey, ObjectId>,
}

impl LayerContent {
    /// Member handles in insertion order
    pub fn keys(&self) -> impl Iterator<Item = NodeKey> + '_ {
        self.iter().map(|m| m.key)
    }

    /// Members in insertion order
    pub fn iter(&self) -> Members<'_> {
        self.slots.iter().flatten()
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the layer is empty
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Whether `key` is a member
    pub fn contains_key(&self, key: NodeKey) -> bool {
        self.keys.contains_key(&key)
    }

    /// Whether the object with identity `id` is a member
    pub fn contains_id(&self, id: ObjectId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Member holding the identity `id`
    pub fn get(&self, id: ObjectId) -> Option<&Member> {
        let position = *self.positions.get(&id)?;
        self.slots[position].as_ref()
    }

    fn push(&mut self, member: Member) -> bool {
        if self.positions.contains_key(&member.id) {
            return false;
        }
        self.positions.insert(member.id, self.slots.len());
        self.keys.insert(member.key, member.id);
        self.slots.push(Some(member));
        true
    }

    fn remove(&mut self, id: ObjectId) -> Option<Member> {
        let position = self.positions.remove(&id)?;
        let member = self.slots[position].take()?;
        self.keys.remove(&member.key);

        if self.slots.len() - self.positions.len() > self.positions.len() {
            self.compact();
        }
        Some(member)
    }

    fn compact(&mut self) {
        self.slots.retain(Option::is_some);
        for (position, member) in self.slots.iter().flatten().enumerate() {
            self.positions.insert(member.id, position);
        }
    }
}

impl<'a> IntoIterator for &'a LayerContent {
    type Item = &'a Member;
    type IntoIter = Members<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Direction of a membership transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerChangeKind {
    /// The object joined the layer
    Added,
    /// The object left the layer
    Removed,
}

/// One membership transition of a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerChange {
    /// Object that joined or left
    pub member: Member,
    /// Which way it went
    pub kind: LayerChangeKind,
}

/// State shared by every layer implementation
#[derive(Debug, Clone)]
pub struct LayerState {
    pub(crate) id: LayerId,
    name: String,
    visible: bool,
    attachment: Option<Attachment>,
    content: LayerContent,
    changes: Vec<LayerChange>,
    version: u64,
}

impl LayerState {
    /// Detached, visible, empty layer state
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: LayerId::UNASSIGNED,
            name: name.into(),
            visible: true,
            attachment: None,
            content: LayerContent::default(),
            changes: Vec::new(),
            version: 0,
        }
    }

    /// Identity, unassigned until first attached
    pub fn id(&self) -> LayerId {
        self.id
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record `member` as added and update the manager's index
    ///
    /// Adding an object that is already a member changes nothing.
    pub fn add_member(&mut self, member: Member, index: &mut MembershipIndex) {
        if self.content.push(member) {
            index.notify_object_added(self.id, member.id);
            self.changes.push(LayerChange { member, kind: LayerChangeKind::Added });
            self.version += 1;
        }
    }

    /// Record the object `id` as removed and update the manager's index
    pub fn remove_member(&mut self, id: ObjectId, index: &mut MembershipIndex) {
        if let Some(member) = self.content.remove(id) {
            index.notify_object_removed(self.id, id);
            self.changes.push(LayerChange { member, kind: LayerChangeKind::Removed });
            self.version += 1;
        }
    }

    /// Forget the recorded transitions
    pub fn clear_changes(&mut self) {
        self.changes.clear();
    }
}

/// A derived view over the scene
pub trait Layer: Any + fmt::Debug {
    /// Shared state
    fn state(&self) -> &LayerState;

    /// Shared state, mutable
    fn state_mut(&mut self) -> &mut LayerState;

    /// Re-evaluate membership of `node` after `change`
    ///
    /// Called for every notification the scene receives. Implementations must
    /// reject nodes they do not track cheaply, and must only touch `index`
    /// through [`LayerState::add_member`] / [`LayerState::remove_member`].
    fn notify_changed(
        &mut self,
        graph: &SceneGraph,
        node: NodeKey,
        change: ChangeDescriptor,
        index: &mut MembershipIndex,
    );

    /// Downcasting support for typed lookups
    fn as_any(&self) -> &dyn Any;

    /// Downcasting support for typed lookups
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Identity, unassigned until first attached
    fn id(&self) -> LayerId {
        self.state().id
    }

    /// Display name
    fn name(&self) -> &str {
        &self.state().name
    }

    /// Whether consumers should draw this layer
    fn is_visible(&self) -> bool {
        self.state().visible
    }

    /// Show or hide the layer; membership is unaffected
    fn set_visible(&mut self, visible: bool) {
        self.state_mut().visible = visible;
    }

    /// Objects currently believed to be members
    fn content(&self) -> &LayerContent {
        &self.state().content
    }

    /// Whether the node `key` is currently a member
    fn contains_node(&self, key: NodeKey) -> bool {
        self.content().contains_key(key)
    }

    /// Membership transitions since the changes were last cleared
    ///
    /// Inside a scene this is cleared at the start of every notification
    /// round, so listeners see exactly what the current round did to the
    /// layer. Entries are in the order the transitions happened.
    fn changes(&self) -> &[LayerChange] {
        &self.state().changes
    }

    /// Incremented on every membership transition
    fn version(&self) -> u64 {
        self.state().version
    }

    /// Manager link while attached
    fn attachment(&self) -> Option<Attachment> {
        self.state().attachment
    }

    /// Whether the layer currently belongs to a manager
    fn is_attached(&self) -> bool {
        self.state().attachment.is_some()
    }

    /// Called by the manager when the layer is added
    fn attach(&mut self, attachment: Attachment) {
        let state = self.state_mut();
        state.id = attachment.layer;
        state.attachment = Some(attachment);
    }

    /// Called by the manager when the layer is removed
    fn detach(&mut self) {
        self.state_mut().attachment = None;
    }
}

impl dyn Layer {
    /// Typed view of this layer
    pub fn downcast_ref<L: Layer>(&self) -> Option<&L> {
        self.as_any().downcast_ref::<L>()
    }

    /// Typed mutable view of this layer
    pub fn downcast_mut<L: Layer>(&mut self) -> Option<&mut L> {
        self.as_any_mut().downcast_mut::<L>()
    }
}
