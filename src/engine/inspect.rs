//! Reflective component access for tooling.
//!
//! The [`Inspector`] reads and writes components as boxed `dyn Any` values
//! through the same column storage queries use. It is meant for editors,
//! debug overlays and tests, never for per-frame logic: every access boxes a
//! value and dispatches dynamically.

use std::any::Any;

use crate::engine::component::short_type_name;
use crate::engine::error::{ECSError, ECSResult, InvariantError, RangeError};
use crate::engine::scene::{Scene, SceneOwner};
use crate::engine::types::EntityId;


/// Dynamic view over one scene's components.
pub struct Inspector<'s> {
    scene: &'s Scene,
}

impl<'s> Inspector<'s> {
    /// Wraps `scene`.
    pub fn new(scene: &'s Scene) -> Self {
        Self { scene }
    }

    /// Boxed copies of every component of `entity`, in ascending component id order.
    ///
    /// # Errors
    /// [`RangeError::UnknownEntity`] if `entity` is not live.

    pub fn components(&self, entity: EntityId) -> ECSResult<Vec<Box<dyn Any>>> {
        let record = self
            .scene
            .index()?
            .location(entity)
            .ok_or(RangeError::UnknownEntity { entity })?;
        let pools = self.scene.pools()?;
        let pool = &pools[record.pool];

        pool.archetype()
            .component_ids()
            .map(|component_id| {
                pool.column_dyn(component_id)
                    .and_then(|column| column.get_boxed(record.slot))
                    .ok_or_else(|| ECSError::from(InvariantError::MissingColumn { component_id }))
            })
            .collect()
    }

    /// Short type names of the components of `entity`, in ascending component id order.
    pub fn component_names(&self, entity: EntityId) -> ECSResult<Vec<&'static str>> {
        let archetype = self.scene.get_archetype(entity)?;
        let registry = self.scene.registry()?;
        Ok(archetype
            .component_ids()
            .map(|component_id| short_type_name(registry.name_of(component_id)))
            .collect())
    }

    /// Overwrites the component of `entity` whose type matches `value`.
    ///
    /// # Errors
    /// - [`RangeError::UnknownEntity`] if `entity` is not live.
    /// - [`InvariantError::TypeMismatch`] if no component of `entity` has the
    ///   dynamic type of `value`.

    pub fn set_boxed(&self, owner: &SceneOwner, entity: EntityId, value: Box<dyn Any>) -> ECSResult<()> {
        self.scene.ensure_safe(owner)?;
        let record = self
            .scene
            .index()?
            .location(entity)
            .ok_or(RangeError::UnknownEntity { entity })?;

        let type_id = (*value).type_id();
        let mut pools = self.scene.pools_mut()?;
        let pool = &mut pools[record.pool];

        let component_id = pool
            .archetype()
            .component_ids()
            .find(|&id| pool.column_dyn(id).map_or(false, |column| column.element_type_id() == type_id))
            .ok_or(InvariantError::TypeMismatch {
                expected: "a component of the entity",
                actual: "<boxed value>",
            })?;

        let column = pool.column_dyn_mut(component_id)?;
        column.set_boxed(record.slot, value)
    }
}
