//! # Component store pools
//!
//! One [`ComponentStorePool`] exists per distinct archetype observed by a
//! scene. It stores the entities of that archetype in structure-of-arrays
//! form: one dense column per component type plus a parallel array of entity
//! ids, all indexed by slot.
//!
//! ## Slot invariant
//! For every slot `k < count()`, `entity_ids()[k]` is a live entity and every
//! column holds that entity's value at index `k`. The pool itself never looks
//! entities up; whenever compaction moves an entity to a new slot it reports
//! `(entity, new_slot)` through the `on_moved` callback so the owner can keep
//! the entity index in sync.
//!
//! ## Growth
//! Capacity starts small and doubles until it fits. It never shrinks, and
//! [`clear`](ComponentStorePool::clear) keeps every allocation.
//!
//! ## Column lookup
//! Columns are stored in a table indexed by component id, sized to the
//! archetype's highest id plus one. Ids absent from the archetype hold `None`.

use std::any::type_name;

use crate::engine::archetype::Archetype;
use crate::engine::component::{Component, ComponentRegistry};
use crate::engine::error::{CapacityError, ECSResult, InvariantError, RangeError};
use crate::engine::storage::{compact_vec, compaction_plan, Column, ErasedColumn};
use crate::engine::types::{ComponentID, EntityId, PoolID, SlotID};


/// Columnar storage for every entity of one archetype.

pub struct ComponentStorePool {
    archetype: Archetype,
    capacity: usize,
    columns: Vec<Option<Box<dyn ErasedColumn>>>,
    entity_ids: Vec<EntityId>,
}

impl ComponentStorePool {
    /// Creates an empty pool for `archetype` with room for `capacity` entities.
    ///
    /// # Errors
    /// [`InvariantError::MissingColumn`] if a component of the archetype is
    /// not registered in `registry`.

    pub fn new(archetype: Archetype, capacity: usize, registry: &ComponentRegistry) -> ECSResult<Self> {
        let capacity = capacity.max(1);
        let table_len = archetype.highest_component_id().map_or(0, |id| id as usize + 1);

        let mut columns: Vec<Option<Box<dyn ErasedColumn>>> = Vec::with_capacity(table_len);
        columns.resize_with(table_len, || None);
        for component_id in archetype.component_ids() {
            let column = registry
                .create_column(component_id, capacity)
                .ok_or(InvariantError::MissingColumn { component_id })?;
            columns[component_id as usize] = Some(column);
        }

        Ok(Self {
            archetype,
            capacity,
            columns,
            entity_ids: Vec::with_capacity(capacity),
        })
    }

    /// Archetype stored by this pool.
    #[inline]
    pub fn archetype(&self) -> Archetype {
        self.archetype
    }

    /// Number of live slots.
    #[inline]
    pub fn count(&self) -> usize {
        self.entity_ids.len()
    }

    /// Returns `true` when no slot is live.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entity_ids.is_empty()
    }

    /// Slot capacity reached by doubling growth.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Entity id of every live slot.
    #[inline]
    pub fn entity_ids(&self) -> &[EntityId] {
        &self.entity_ids
    }

    fn ensure_capacity(&mut self, needed: usize) -> ECSResult<()> {
        if needed <= self.capacity {
            return Ok(());
        }

        let mut new_capacity = self.capacity;
        while new_capacity < needed {
            new_capacity = new_capacity
                .checked_mul(2)
                .ok_or(CapacityError::PoolCapacity { needed })?;
        }

        for column in self.columns.iter_mut().flatten() {
            column.grow_to(new_capacity);
        }
        self.entity_ids.reserve_exact(new_capacity - self.entity_ids.len());
        self.capacity = new_capacity;
        Ok(())
    }

    /// Appends `entity` with zero-valued components and returns its slot.
    pub fn allocate(&mut self, entity: EntityId) -> ECSResult<SlotID> {
        let slot = self.entity_ids.len();
        self.ensure_capacity(slot + 1)?;

        self.entity_ids.push(entity);
        for column in self.columns.iter_mut().flatten() {
            column.push_default();
        }
        Ok(slot)
    }

    /// Appends the id range `first..first + count` and returns the first slot.
    ///
    /// Growth happens at most once for the whole batch.

    pub fn allocate_range(&mut self, first: EntityId, count: usize) -> ECSResult<SlotID> {
        let first_slot = self.entity_ids.len();
        let needed = first_slot
            .checked_add(count)
            .ok_or(CapacityError::PoolCapacity { needed: usize::MAX })?;
        self.ensure_capacity(needed)?;

        self.entity_ids.extend((0..count).map(|offset| first.offset(offset)));
        for column in self.columns.iter_mut().flatten() {
            column.push_defaults(count);
        }
        Ok(first_slot)
    }

    /// Frees `slot` by swapping the last live slot into it.
    ///
    /// If another entity was moved, `on_moved(entity, slot)` reports its new slot.
    ///
    /// # Errors
    /// [`RangeError::SlotOutOfRange`] if `slot` is not live.

    pub fn free(&mut self, slot: SlotID, mut on_moved: impl FnMut(EntityId, SlotID)) -> ECSResult<()> {
        let count = self.entity_ids.len();
        if slot >= count {
            return Err(RangeError::SlotOutOfRange { slot, count }.into());
        }

        self.entity_ids.swap_remove(slot);
        for column in self.columns.iter_mut().flatten() {
            column.swap_remove_slot(slot);
        }

        if slot != count - 1 {
            on_moved(self.entity_ids[slot], slot);
        }
        Ok(())
    }

    /// Frees the contiguous block `start..start + count`.
    ///
    /// The smallest block of trailing live slots is moved into the gap and
    /// every moved entity is reported through `on_moved`.
    ///
    /// # Errors
    /// [`RangeError::SlotOutOfRange`] if the block extends past the live range.

    pub fn free_range(
        &mut self,
        start: SlotID,
        count: usize,
        mut on_moved: impl FnMut(EntityId, SlotID),
    ) -> ECSResult<()> {
        if count == 0 {
            return Ok(());
        }

        let len = self.entity_ids.len();
        let end = start.checked_add(count).unwrap_or(usize::MAX);
        if end > len {
            return Err(RangeError::SlotOutOfRange { slot: end - 1, count: len }.into());
        }

        let plan = compaction_plan(len, start, count);
        compact_vec(&mut self.entity_ids, start, count);
        for column in self.columns.iter_mut().flatten() {
            column.compact_range(start, count);
        }

        if let Some((_, move_count)) = plan {
            for slot in start..start + move_count {
                on_moved(self.entity_ids[slot], slot);
            }
        }
        Ok(())
    }

    /// Moves one component value from `slot` here into `destination_slot` of `destination`.
    ///
    /// Entity ids are untouched; the caller frees the source slot afterwards.

    pub fn relocate_one(
        &mut self,
        component_id: ComponentID,
        slot: SlotID,
        destination: &mut ComponentStorePool,
        destination_slot: SlotID,
    ) -> ECSResult<()> {
        let source = self.column_dyn_mut(component_id)?;
        let target = destination.column_dyn_mut(component_id)?;
        source.relocate_one(slot, target, destination_slot)
    }

    /// Type-erased column for `component_id`.
    #[inline]
    pub fn column_dyn(&self, component_id: ComponentID) -> Option<&dyn ErasedColumn> {
        self.columns
            .get(component_id as usize)
            .and_then(|column| column.as_deref())
    }

    pub(crate) fn column_dyn_mut(&mut self, component_id: ComponentID) -> ECSResult<&mut dyn ErasedColumn> {
        match self.columns.get_mut(component_id as usize) {
            Some(Some(column)) => Ok(&mut **column),
            _ => Err(InvariantError::MissingColumn { component_id }.into()),
        }
    }

    /// Typed column for `component_id`.
    pub fn column<T: Component>(&self, component_id: ComponentID) -> ECSResult<&Column<T>> {
        let column = self
            .column_dyn(component_id)
            .ok_or(InvariantError::MissingColumn { component_id })?;
        let actual = column.element_type_name();
        column
            .as_any()
            .downcast_ref::<Column<T>>()
            .ok_or_else(|| InvariantError::TypeMismatch { expected: type_name::<T>(), actual }.into())
    }

    /// Typed mutable column for `component_id`.
    pub fn column_mut<T: Component>(&mut self, component_id: ComponentID) -> ECSResult<&mut Column<T>> {
        let column = self.column_dyn_mut(component_id)?;
        let actual = column.element_type_name();
        column
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .ok_or_else(|| InvariantError::TypeMismatch { expected: type_name::<T>(), actual }.into())
    }

    /// Splits the pool into its entity ids and a set of columns that can be
    /// borrowed mutably at the same time.
    pub(crate) fn bind(&mut self) -> (&[EntityId], BoundColumns<'_>) {
        let columns = self.columns.iter_mut().map(Option::as_mut).collect();
        (&self.entity_ids, BoundColumns { columns })
    }

    /// Resets the live count to zero, keeping every allocation.
    pub fn clear(&mut self) {
        self.entity_ids.clear();
        for column in self.columns.iter_mut().flatten() {
            column.clear();
        }
    }

    /// `"{count}/{capacity} {archetype}"`.
    pub fn memory_report(&self, registry: &ComponentRegistry) -> String {
        format!("{}/{} {}", self.count(), self.capacity, self.archetype.display(registry))
    }
}

/// Columns of one pool, each handed out at most once as a typed slice.

pub(crate) struct BoundColumns<'a> {
    columns: Vec<Option<&'a mut Box<dyn ErasedColumn>>>,
}

impl<'a> BoundColumns<'a> {
    /// Takes the column for `component_id` as a typed slice.
    ///
    /// # Errors
    /// - [`InvariantError::MissingColumn`] if the pool has no such column or it
    ///   was already taken.
    /// - [`InvariantError::TypeMismatch`] if the column stores another type.

    pub(crate) fn take<T: Component>(&mut self, component_id: ComponentID) -> ECSResult<&'a mut [T]> {
        let column: &'a mut Box<dyn ErasedColumn> = self
            .columns
            .get_mut(component_id as usize)
            .and_then(Option::take)
            .ok_or(InvariantError::MissingColumn { component_id })?;
        let actual = column.element_type_name();
        column
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .map(Column::as_mut_slice)
            .ok_or_else(|| InvariantError::TypeMismatch { expected: type_name::<T>(), actual }.into())
    }
}

/// Mutable access to two distinct pools of one table.
///
/// # Errors
/// [`RangeError::SlotOutOfRange`] if either index is out of bounds or both are equal.

pub(crate) fn pool_pair_mut(
    pools: &mut [ComponentStorePool],
    first: PoolID,
    second: PoolID,
) -> ECSResult<(&mut ComponentStorePool, &mut ComponentStorePool)> {
    let count = pools.len();
    if first == second || first >= count || second >= count {
        return Err(RangeError::SlotOutOfRange { slot: first.max(second), count }.into());
    }

    if first < second {
        let (low, high) = pools.split_at_mut(second);
        Ok((&mut low[first], &mut high[0]))
    } else {
        let (low, high) = pools.split_at_mut(first);
        Ok((&mut high[0], &mut low[second]))
    }
}
