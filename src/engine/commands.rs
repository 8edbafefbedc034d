//! # Deferred commands
//!
//! A [`Command`] describes one structural change recorded for later:
//! removing an entity, or adding or removing one component type.
//!
//! ## Design
//! - Commands carry *what* to change, not *how*. Applying one calls the same
//!   scene entry point a direct call would use, so migrations and removal
//!   callbacks behave identically.
//! - The component type is captured at enqueue time as a monomorphized
//!   function pointer, keeping the queue free of generics.
//! - Commands are `Send`: they are produced on any thread and applied on the
//!   owning one.
//!
//! ## Invariants
//! - Commands are applied in the order they were recorded.
//! - The target entity is resolved at apply time, not at enqueue time.

use std::{
    any::{type_name, Any},
    fmt,
};

use crate::engine::component::Component;
use crate::engine::error::{ECSResult, InvariantError};
use crate::engine::scene::{Scene, SceneOwner};
use crate::engine::types::EntityId;


type ApplyFn = fn(&Scene, &SceneOwner, EntityId) -> ECSResult<()>;
type ApplyValueFn = fn(&Scene, &SceneOwner, EntityId, Box<dyn Any + Send>) -> ECSResult<()>;

enum CommandKind {
    RemoveEntity,
    AddComponent { apply: ApplyFn },
    AddComponentWith { value: Box<dyn Any + Send>, apply: ApplyValueFn },
    RemoveComponent { apply: ApplyFn },
}

/// A deferred structural change targeting one entity.

pub struct Command {
    entity: EntityId,
    component: Option<&'static str>,
    kind: CommandKind,
}

impl Command {
    /// Removes `entity` and its components.
    pub fn remove_entity(entity: EntityId) -> Self {
        Self { entity, component: None, kind: CommandKind::RemoveEntity }
    }

    /// Adds a zero-valued `T` to `entity`.
    pub fn add_component<T: Component>(entity: EntityId) -> Self {
        Self {
            entity,
            component: Some(type_name::<T>()),
            kind: CommandKind::AddComponent { apply: apply_add::<T> },
        }
    }

    /// Adds `T` to `entity` and sets it to `value`.
    pub fn add_component_with<T: Component>(entity: EntityId, value: T) -> Self {
        Self {
            entity,
            component: Some(type_name::<T>()),
            kind: CommandKind::AddComponentWith {
                value: Box::new(value),
                apply: apply_add_with::<T>,
            },
        }
    }

    /// Removes `T` from `entity`.
    pub fn remove_component<T: Component>(entity: EntityId) -> Self {
        Self {
            entity,
            component: Some(type_name::<T>()),
            kind: CommandKind::RemoveComponent { apply: apply_remove::<T> },
        }
    }

    /// Target entity.
    #[inline]
    pub fn entity(&self) -> EntityId {
        self.entity
    }

    /// Component type name, for component commands.
    #[inline]
    pub fn component_name(&self) -> Option<&'static str> {
        self.component
    }

    /// Applies the command through the scene's structural entry points.
    pub(crate) fn apply(self, scene: &Scene, owner: &SceneOwner) -> ECSResult<()> {
        match self.kind {
            CommandKind::RemoveEntity => scene.remove_entity(owner, self.entity),
            CommandKind::AddComponent { apply } => apply(scene, owner, self.entity),
            CommandKind::AddComponentWith { value, apply } => apply(scene, owner, self.entity, value),
            CommandKind::RemoveComponent { apply } => apply(scene, owner, self.entity),
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.kind {
            CommandKind::RemoveEntity => "RemoveEntity",
            CommandKind::AddComponent { .. } => "AddComponent",
            CommandKind::AddComponentWith { .. } => "AddComponentWith",
            CommandKind::RemoveComponent { .. } => "RemoveComponent",
        };
        f.debug_struct("Command")
            .field("op", &op)
            .field("entity", &self.entity)
            .field("component", &self.component)
            .finish()
    }
}

fn apply_add<T: Component>(scene: &Scene, owner: &SceneOwner, entity: EntityId) -> ECSResult<()> {
    scene.add_component::<T>(owner, entity)
}

fn apply_add_with<T: Component>(
    scene: &Scene,
    owner: &SceneOwner,
    entity: EntityId,
    value: Box<dyn Any + Send>,
) -> ECSResult<()> {
    let value = value.downcast::<T>().map_err(|_| InvariantError::TypeMismatch {
        expected: type_name::<T>(),
        actual: "<other type>",
    })?;
    scene.add_component_with::<T>(owner, entity, *value)
}

fn apply_remove<T: Component>(scene: &Scene, owner: &SceneOwner, entity: EntityId) -> ECSResult<()> {
    scene.remove_component::<T>(owner, entity)
}
