//! External change listeners
//!
//! Listeners run after every layer has settled for a notification, in the
//! order they were registered. They only get shared access to the scene; a
//! listener that wants to react with a mutation queues it through a
//! [`Dispatcher`](crate::dispatch::Dispatcher).

use crate::foundation::collections::NodeKey;
use crate::scene::change::ChangeDescriptor;
use crate::scene::scene::Scene;
use std::cell::RefCell;
use std::rc::Rc;

/// Consumer of scene change notifications
pub trait ChangeListener {
    /// Called once per notification
    fn notify_changed(&mut self, scene: &Scene, node: NodeKey, change: ChangeDescriptor);
}

impl<F> ChangeListener for F
where
    F: FnMut(&Scene, NodeKey, ChangeDescriptor),
{
    fn notify_changed(&mut self, scene: &Scene, node: NodeKey, change: ChangeDescriptor) {
        self(scene, node, change);
    }
}

/// A delivered notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    /// Node the change applies to
    pub node: NodeKey,
    /// What changed
    pub change: ChangeDescriptor,
    /// Scene version after the change
    pub version: u64,
}

/// Listener that records every notification it receives
///
/// Clones share the same log, so one clone can be handed to the scene and
/// another kept for inspection.
#[derive(Debug, Clone, Default)]
pub struct NotificationLog {
    entries: Rc<RefCell<Vec<Notification>>>,
}

impl NotificationLog {
    /// Empty log
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded notifications, oldest first
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.borrow().clone()
    }

    /// Number of recorded notifications
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    /// Whether nothing has been recorded
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Notifications recorded for `node`
    pub fn for_node(&self, node: NodeKey) -> Vec<ChangeDescriptor> {
        self.entries
            .borrow()
            .iter()
            .filter(|n| n.node == node)
            .map(|n| n.change)
            .collect()
    }

    /// Drop everything recorded so far
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl ChangeListener for NotificationLog {
    fn notify_changed(&mut self, scene: &Scene, node: NodeKey, change: ChangeDescriptor) {
        self.entries.borrow_mut().push(Notification {
            node,
            change,
            version: scene.version(),
        });
    }
}
