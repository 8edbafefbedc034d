//! Deferred structural changes.
//!
//! The [`Scheduler`] is a thread-safe FIFO of [`Command`]s. It is the only
//! way to request a structural change while a query is iterating or from a
//! thread other than the owning one.
//!
//! ## Usage
//! - `enqueue_*` may be called from anywhere, including rayon workers running
//!   a parallel visit. The handle is cheap to clone and is `Send + Sync`.
//! - The owner applies the queue once per frame with
//!   [`Scene::drain`](crate::engine::scene::Scene::drain), after every query
//!   of the frame has finished.
//!
//! Operations enqueued while draining are applied by the same drain.

use std::{collections::VecDeque, sync::Arc};

use parking_lot::Mutex;

use crate::engine::commands::Command;
use crate::engine::component::Component;
use crate::engine::types::EntityId;


/// Shared queue of deferred operations.

#[derive(Clone, Default)]
pub struct Scheduler {
    queue: Arc<Mutex<VecDeque<Command>>>,
}

impl Scheduler {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an arbitrary command.
    pub fn enqueue(&self, command: Command) {
        self.queue.lock().push_back(command);
    }

    /// Schedules removal of `entity`.
    pub fn enqueue_remove(&self, entity: EntityId) {
        self.enqueue(Command::remove_entity(entity));
    }

    /// Schedules adding a zero-valued `T` to `entity`.
    pub fn enqueue_add_component<T: Component>(&self, entity: EntityId) {
        self.enqueue(Command::add_component::<T>(entity));
    }

    /// Schedules adding `T` with `value` to `entity`.
    pub fn enqueue_add_component_with<T: Component>(&self, entity: EntityId, value: T) {
        self.enqueue(Command::add_component_with(entity, value));
    }

    /// Schedules removing `T` from `entity`.
    pub fn enqueue_remove_component<T: Component>(&self, entity: EntityId) {
        self.enqueue(Command::remove_component::<T>(entity));
    }

    /// Number of pending commands.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }

    /// Drops every pending command.
    pub fn clear(&self) {
        self.queue.lock().clear();
    }

    /// Takes the oldest pending command.
    pub(crate) fn pop(&self) -> Option<Command> {
        self.queue.lock().pop_front()
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").field("pending", &self.len()).finish()
    }
}
