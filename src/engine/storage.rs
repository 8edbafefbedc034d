//! Typed column storage and its type-erased interface.
//!
//! This module implements [`Column<T>`], the dense, contiguous array holding
//! one component type for every live slot of a pool, and [`ErasedColumn`],
//! the dynamically-typed interface pools use to manage heterogeneous columns
//! without knowing `T`.
//!
//! # Storage model
//!
//! A column is a `Vec<T>` whose length always equals the owning pool's live
//! count. Slot `k` of every column in a pool belongs to the same entity.
//! Capacity is managed by the pool (doubling growth) through
//! [`ErasedColumn::grow_to`]; the column never shrinks its allocation.
//!
//! # Core operations
//!
//! - **Append**: `push_default` / `push_defaults` add zero-valued slots.
//! - **Remove**: `swap_remove_slot` deletes a slot in `O(1)` by moving the last
//!   value into it. `compact_range` does the same for a contiguous block.
//! - **Relocate**: `relocate_one` moves one value into an already allocated
//!   slot of another column of the same type (archetype migration).
//!
//! None of these preserve slot order.
//!
//! # Type erasure
//!
//! Typed access happens once per pool binding: callers downcast a
//! `&mut dyn ErasedColumn` to `Column<T>` through [`ErasedColumn::as_any_mut`]
//! and then work on plain slices. The boxed accessors
//! ([`get_boxed`](ErasedColumn::get_boxed) / [`set_boxed`](ErasedColumn::set_boxed))
//! exist for tooling and are never used on the iteration path.

use std::{
    any::{type_name, Any, TypeId},
    mem,
};

use crate::engine::component::Component;
use crate::engine::error::{ECSResult, InvariantError, RangeError};
use crate::engine::types::SlotID;


/// Dense storage for one component type.
///
/// ## Invariants
/// - `values.len()` equals the live count of the owning pool.
/// - Slot order carries no meaning.

#[derive(Debug, Clone)]
pub struct Column<T> {
    values: Vec<T>,
}

impl<T: Component> Column<T> {
    /// Creates an empty column with room for `capacity` values.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { values: Vec::with_capacity(capacity) }
    }

    /// Number of live values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the column holds no live values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Allocated capacity in slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.values.capacity()
    }

    /// All live values.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// All live values, mutably.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Value at `slot`, if live.
    #[inline]
    pub fn get(&self, slot: SlotID) -> Option<&T> {
        self.values.get(slot)
    }

    /// Mutable value at `slot`, if live.
    #[inline]
    pub fn get_mut(&mut self, slot: SlotID) -> Option<&mut T> {
        self.values.get_mut(slot)
    }

    /// Overwrites the value at `slot`.
    ///
    /// # Errors
    /// [`RangeError::SlotOutOfRange`] if `slot` is not live.

    pub fn set(&mut self, slot: SlotID, value: T) -> ECSResult<()> {
        let count = self.values.len();
        let target = self
            .values
            .get_mut(slot)
            .ok_or(RangeError::SlotOutOfRange { slot, count })?;
        *target = value;
        Ok(())
    }
}

/// A type-erased interface over [`Column<T>`].
///
/// Every mutating method keeps the column dense; pools call them in lockstep
/// across all their columns so slot `k` keeps naming the same entity.
///
/// # Downcasting
/// Implementers return `self` from `as_any` / `as_any_mut`, so callers can
/// `downcast_mut::<Column<T>>()` once and then work on typed slices.

pub trait ErasedColumn: Any + Send + Sync {
    /// Number of live values.
    fn length(&self) -> usize;

    /// Immutable reference for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable reference for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// `TypeId` of the element type.
    fn element_type_id(&self) -> TypeId;

    /// Name of the element type.
    fn element_type_name(&self) -> &'static str;

    /// Ensures the allocation can hold at least `capacity` values.
    fn grow_to(&mut self, capacity: usize);

    /// Appends one zero-valued slot.
    fn push_default(&mut self);

    /// Appends `count` zero-valued slots.
    fn push_defaults(&mut self, count: usize);

    /// Removes `slot` by moving the last value into it.
    fn swap_remove_slot(&mut self, slot: SlotID);

    /// Removes `count` slots starting at `start`, filling the gap from the tail.
    fn compact_range(&mut self, start: SlotID, count: usize);

    /// Moves the value at `slot` into `destination_slot` of `destination`.
    ///
    /// The source slot is left holding a zero value; the caller frees it.
    ///
    /// # Errors
    /// - [`InvariantError::TypeMismatch`] if `destination` stores another type.
    /// - [`RangeError::SlotOutOfRange`] if either slot is not live.
    fn relocate_one(
        &mut self,
        slot: SlotID,
        destination: &mut dyn ErasedColumn,
        destination_slot: SlotID,
    ) -> ECSResult<()>;

    /// Drops every live value, keeping the allocation.
    fn clear(&mut self);

    /// Boxed clone of the value at `slot`. Tooling only.
    fn get_boxed(&self, slot: SlotID) -> Option<Box<dyn Any>>;

    /// Overwrites the value at `slot` from a boxed value. Tooling only.
    ///
    /// # Errors
    /// - [`InvariantError::TypeMismatch`] if the boxed value is not the element type.
    /// - [`RangeError::SlotOutOfRange`] if `slot` is not live.
    fn set_boxed(&mut self, slot: SlotID, value: Box<dyn Any>) -> ECSResult<()>;
}

impl<T: Component> ErasedColumn for Column<T> {
    #[inline]
    fn length(&self) -> usize {
        self.values.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn element_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn element_type_name(&self) -> &'static str {
        type_name::<T>()
    }

    fn grow_to(&mut self, capacity: usize) {
        if self.values.capacity() < capacity {
            self.values.reserve_exact(capacity - self.values.len());
        }
    }

    #[inline]
    fn push_default(&mut self) {
        self.values.push(T::default());
    }

    fn push_defaults(&mut self, count: usize) {
        let new_len = self.values.len() + count;
        self.values.resize_with(new_len, T::default);
    }

    #[inline]
    fn swap_remove_slot(&mut self, slot: SlotID) {
        self.values.swap_remove(slot);
    }

    fn compact_range(&mut self, start: SlotID, count: usize) {
        compact_vec(&mut self.values, start, count);
    }

    fn relocate_one(
        &mut self,
        slot: SlotID,
        destination: &mut dyn ErasedColumn,
        destination_slot: SlotID,
    ) -> ECSResult<()> {
        let expected = destination.element_type_name();
        let destination = destination
            .as_any_mut()
            .downcast_mut::<Column<T>>()
            .ok_or(InvariantError::TypeMismatch { expected, actual: type_name::<T>() })?;

        let count = self.values.len();
        let value = self
            .values
            .get_mut(slot)
            .ok_or(RangeError::SlotOutOfRange { slot, count })?;

        let destination_count = destination.values.len();
        let target = destination
            .values
            .get_mut(destination_slot)
            .ok_or(RangeError::SlotOutOfRange { slot: destination_slot, count: destination_count })?;

        *target = mem::take(value);
        Ok(())
    }

    fn clear(&mut self) {
        self.values.clear();
    }

    fn get_boxed(&self, slot: SlotID) -> Option<Box<dyn Any>> {
        self.values.get(slot).map(|value| Box::new(value.clone()) as Box<dyn Any>)
    }

    fn set_boxed(&mut self, slot: SlotID, value: Box<dyn Any>) -> ECSResult<()> {
        let value = value.downcast::<T>().map_err(|_| InvariantError::TypeMismatch {
            expected: type_name::<T>(),
            actual: "<other type>",
        })?;
        self.set(slot, *value)
    }
}

/// Computes which tail block fills the gap left by freeing `count` slots at `start`.
///
/// Returns `None` when the freed block already sits at the end of the live
/// range. Otherwise returns `(move_start, move_count)`: the smallest block of
/// trailing live slots that, moved to `start`, leaves the live range dense.

pub(crate) fn compaction_plan(len: usize, start: SlotID, count: usize) -> Option<(SlotID, usize)> {
    let after = start + count;
    if after >= len {
        return None;
    }

    let mut move_start = len - count;
    let mut move_count = count;
    if move_start < after {
        move_start = after;
        move_count = len - after;
    }
    Some((move_start, move_count))
}

/// Applies [`compaction_plan`] to a vector and drops the freed block.
pub(crate) fn compact_vec<T>(values: &mut Vec<T>, start: SlotID, count: usize) {
    if let Some((move_start, move_count)) = compaction_plan(values.len(), start, count) {
        for offset in 0..move_count {
            values.swap(start + offset, move_start + offset);
        }
    }
    let new_len = values.len() - count;
    values.truncate(new_len);
}
