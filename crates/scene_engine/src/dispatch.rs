//! Hand-off of scene mutations to the owning thread
//!
//! A scene is only ever touched by the thread that owns it. Other threads,
//! and listeners that want to react to a change with a mutation of their
//! own, submit closures through a [`Dispatcher`]; the owning thread drains
//! them with [`SceneTaskQueue::run_pending`] once per tick.

use crate::scene::scene::Scene;
use crossbeam_channel::{unbounded, Receiver, Sender};

/// Deferred mutation of a scene
pub type SceneTask = Box<dyn FnOnce(&mut Scene) + Send>;

/// Something that can schedule work on the scene-owning thread
pub trait Dispatcher {
    /// Queue `task`; it runs on the owning thread, after earlier tasks
    fn execute(&self, task: SceneTask);
}

/// Task queue drained by the scene-owning thread
#[derive(Debug)]
pub struct SceneTaskQueue {
    sender: Sender<SceneTask>,
    receiver: Receiver<SceneTask>,
}

impl SceneTaskQueue {
    /// Empty queue
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    /// Cloneable, sendable submission handle
    pub fn handle(&self) -> DispatchHandle {
        DispatchHandle {
            sender: self.sender.clone(),
        }
    }

    /// Number of tasks waiting
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }

    /// Run every queued task against `scene`, in submission order
    ///
    /// Tasks queued while draining (for example by listeners reacting to a
    /// task's mutation) run in the same call. Returns how many ran.
    pub fn run_pending(&self, scene: &mut Scene) -> usize {
        let mut count = 0;
        while let Ok(task) = self.receiver.try_recv() {
            task(scene);
            count += 1;
        }
        if count > 0 {
            log::trace!("Ran {} queued tasks on scene {}", count, scene.id());
        }
        count
    }
}

impl Default for SceneTaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher for SceneTaskQueue {
    fn execute(&self, task: SceneTask) {
        // The queue holds its own receiver, so this cannot fail
        let _ = self.sender.send(task);
    }
}

/// Submission side of a [`SceneTaskQueue`]
#[derive(Debug, Clone)]
pub struct DispatchHandle {
    sender: Sender<SceneTask>,
}

impl Dispatcher for DispatchHandle {
    fn execute(&self, task: SceneTask) {
        if self.sender.send(task).is_err() {
            log::warn!("Scene task dropped: the owning queue is gone");
        }
    }
}
