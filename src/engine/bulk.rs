//! Bulk entity creation.
//!
//! [`BulkManager`] creates many entities of one archetype in a single step:
//! one contiguous id range from the entity index, one contiguous slot range in
//! the destination pool, and at most one growth of that pool.
//!
//! The initializer variants then walk the new range once, handing the
//! callback direct references into each column at that slot. The scene stays
//! locked while the initializer runs, as it does during a query visit.
//!
//! ## Guarantees
//! For `create_entities*(archetype, count, ..)` returning `first`:
//! * ids `first..first + count` are live and consecutive,
//! * they occupy consecutive slots of one pool, in id order, until the next
//!   structural change moves any of them.

use std::any::type_name;

use crate::engine::archetype::Archetype;
use crate::engine::component::Component;
use crate::engine::error::{ECSResult, InvariantError};
use crate::engine::scene::{Scene, SceneOwner};
use crate::engine::types::{ComponentID, EntityId, PoolID, SlotID};


/// Batch creation front end of a [`Scene`].

pub struct BulkManager<'s> {
    scene: &'s Scene,
}

/// Builds one initializer-driven bulk create per arity.
macro_rules! impl_create_entities {
    ($(#[$doc:meta])* $name:ident; $($T:ident $v:ident),+) => {
        $(#[$doc])*
        pub fn $name<$($T: Component),+>(
            &self,
            owner: &SceneOwner,
            archetype: Archetype,
            count: usize,
            mut init: impl FnMut(EntityId, $(&mut $T),+),
        ) -> ECSResult<EntityId> {
            $( let $v = self.required_component::<$T>(archetype)?; )+
            let (first, pool_id, first_slot) = self.allocate(owner, archetype, count)?;

            let _guard = self.scene.claim_query()?;
            let mut pools = self.scene.pools_mut()?;
            let (_, mut columns) = pools[pool_id].bind();
            $( let $v = &mut columns.take::<$T>($v)?[first_slot..first_slot + count]; )+

            for offset in 0..count {
                init(first.offset(offset), $(&mut $v[offset]),+);
            }
            Ok(first)
        }
    };
}

impl<'s> BulkManager<'s> {
    pub(crate) fn new(scene: &'s Scene) -> Self {
        Self { scene }
    }

    /// Reserves ids and slots for `count` entities of `archetype`.
    fn allocate(
        &self,
        owner: &SceneOwner,
        archetype: Archetype,
        count: usize,
    ) -> ECSResult<(EntityId, PoolID, SlotID)> {
        self.scene.ensure_safe(owner)?;
        if count == 0 {
            return Err(InvariantError::EmptyBatch.into());
        }
        let pool_id = self.scene.pool_for(archetype)?;

        let mut pools = self.scene.pools_mut()?;
        let mut index = self.scene.index_mut()?;
        let first = index.allocate_range(count)?;
        let first_slot = pools[pool_id].allocate_range(first, count)?;
        index.set_location_sequence(first, pool_id, first_slot, count);

        tracing::trace!(first = first.raw(), count, pool = pool_id, "bulk allocated entities");
        Ok((first, pool_id, first_slot))
    }

    fn required_component<T: Component>(&self, archetype: Archetype) -> ECSResult<ComponentID> {
        let component_id = self.scene.register_component::<T>()?;
        if !archetype.contains(component_id) {
            return Err(InvariantError::MissingComponent { entity: EntityId::NONE, name: type_name::<T>() }.into());
        }
        Ok(component_id)
    }

    /// Creates `count` zero-valued entities of `archetype` and returns the first id.
    ///
    /// # Errors
    /// [`InvariantError::EmptyBatch`] if `count` is zero.
    pub fn create_entities(&self, owner: &SceneOwner, archetype: Archetype, count: usize) -> ECSResult<EntityId> {
        self.allocate(owner, archetype, count).map(|(first, _, _)| first)
    }

    impl_create_entities! {
        /// Creates `count` entities and lets `init` fill their `A`.
        ///
        /// # Errors
        /// [`InvariantError::MissingComponent`] if `archetype` lacks `A`.
        create_entities1; A a
    }

    impl_create_entities! {
        /// Two-component initializer variant of [`create_entities1`](Self::create_entities1).
        create_entities2; A a, B b
    }

    impl_create_entities! {
        /// Three-component initializer variant of [`create_entities1`](Self::create_entities1).
        create_entities3; A a, B b, C c
    }

    impl_create_entities! {
        /// Four-component initializer variant of [`create_entities1`](Self::create_entities1).
        create_entities4; A a, B b, C c, D d
    }

    impl_create_entities! {
        /// Five-component initializer variant of [`create_entities1`](Self::create_entities1).
        create_entities5; A a, B b, C c, D d, E e
    }
}
