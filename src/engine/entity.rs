//! Entity index: stable handle to physical location.
//!
//! The index is the only place that knows where an entity lives. Pools hold
//! entity ids per slot but never look them up; every change of pool or slot
//! is reported back here by the scene.
//!
//! Ids come from a monotonic counter starting at 1 and are never reused, so
//! the record map is keyed sparsely by id rather than by a dense array.

use std::collections::HashMap;

use crate::engine::error::{CapacityError, ECSResult};
use crate::engine::types::{EntityId, EntityRaw, PoolID, SlotID};


/// Current location of one live entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    /// Index of the pool in the scene's pool table.
    pub pool: PoolID,
    /// Slot inside that pool.
    pub slot: SlotID,
}

/// Map from live entity ids to their records.
#[derive(Debug)]
pub struct EntityIndex {
    next_id: EntityRaw,
    records: HashMap<EntityId, EntityRecord>,
}

impl EntityIndex {
    /// Creates an empty index sized for `capacity` entities.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { next_id: 1, records: HashMap::with_capacity(capacity) }
    }

    /// Reserves a single new id. No record exists until [`set_location`](Self::set_location).
    pub fn allocate(&mut self) -> ECSResult<EntityId> {
        self.allocate_range(1)
    }

    /// Reserves `count` consecutive ids and returns the first one.
    ///
    /// # Errors
    /// [`CapacityError::EntityIds`] if the counter would overflow.

    pub fn allocate_range(&mut self, count: usize) -> ECSResult<EntityId> {
        let first = self.next_id;
        self.next_id = (count as EntityRaw)
            .checked_add(first)
            .ok_or(CapacityError::EntityIds { requested: count })?;
        Ok(EntityId(first))
    }

    /// Points `entity` at `(pool, slot)`, inserting the record if needed.
    #[inline]
    pub fn set_location(&mut self, entity: EntityId, pool: PoolID, slot: SlotID) {
        self.records.insert(entity, EntityRecord { pool, slot });
    }

    /// Records `count` consecutive entities occupying consecutive slots.
    pub fn set_location_sequence(&mut self, first: EntityId, pool: PoolID, first_slot: SlotID, count: usize) {
        self.records.reserve(count);
        for offset in 0..count {
            self.records.insert(first.offset(offset), EntityRecord { pool, slot: first_slot + offset });
        }
    }

    /// Updates only the slot of an entity that stayed in its pool.
    #[inline]
    pub fn set_slot(&mut self, entity: EntityId, slot: SlotID) {
        if let Some(record) = self.records.get_mut(&entity) {
            record.slot = slot;
        }
    }

    /// Current location of `entity`.
    #[inline]
    pub fn location(&self, entity: EntityId) -> Option<EntityRecord> {
        self.records.get(&entity).copied()
    }

    /// Drops the record of `entity`, returning it.
    #[inline]
    pub fn free(&mut self, entity: EntityId) -> Option<EntityRecord> {
        self.records.remove(&entity)
    }

    /// Returns `true` if `entity` is live.
    #[inline]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.records.contains_key(&entity)
    }

    /// Number of live entities.
    #[inline]
    pub fn entity_count(&self) -> usize {
        self.records.len()
    }

    /// The id the next allocation will return.
    #[inline]
    pub fn peek_next(&self) -> EntityId {
        EntityId(self.next_id)
    }

    /// Forgets every record. The id counter keeps running.
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
