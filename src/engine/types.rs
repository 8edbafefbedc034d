//! Core identifiers, capacities and handles.
//!
//! This module defines the **fundamental numeric types** shared by every other
//! part of the engine: the entity handle, component and pool identifiers, and
//! the compile-time capacities that bound the archetype model.
//!
//! ## Design Philosophy
//!
//! The store is designed around:
//!
//! - **Dense storage** (one pool per archetype, structure-of-arrays columns),
//! - **Single-word signatures** (an archetype is one `u64` mask),
//! - **Stable numeric identifiers** (small integer component ids, monotonic entity ids).
//!
//! ## Entity Representation
//!
//! An [`EntityId`] is an opaque, 1-based integer. The value `0` is reserved as
//! [`EntityId::NONE`]. Identifiers are handed out monotonically and are never
//! recycled, so two live entities can never share an id and a removed id never
//! refers to a different entity later on.
//!
//! The handle carries **no generation tag**. A removed id simply stops
//! resolving in the entity index.
//!
//! ## Capacities
//!
//! [`MAX_COMPONENT_TYPES`] is fixed by the width of the archetype mask. Pools
//! start at [`INITIAL_POOL_CAPACITY`] slots and double whenever they fill up.

use std::fmt;


/// Raw integer backing an [`EntityId`].
pub type EntityRaw = u64;

/// Compact identifier of a registered component type, in `0..MAX_COMPONENT_TYPES`.
pub type ComponentID = u8;

/// Index of a pool inside the scene's pool table.
pub type PoolID = usize;

/// Index of an entity's storage row inside a pool.
pub type SlotID = usize;

/// Hard cap on distinct component types, fixed by the mask width.
pub const MAX_COMPONENT_TYPES: usize = u64::BITS as usize;

/// Starting slot capacity of a freshly created pool.
pub const INITIAL_POOL_CAPACITY: usize = 4;

/// Opaque handle to an entity.
///
/// Equality is by integer value. `EntityId::NONE` (zero) never names a live
/// entity and is never returned by an allocation.

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub EntityRaw);

impl EntityId {
    /// The reserved "no entity" handle.
    pub const NONE: EntityId = EntityId(0);

    /// Returns `true` for the reserved zero handle.
    #[inline]
    pub fn is_none(self) -> bool {
        self.0 == 0
    }

    /// Returns the raw integer value.
    #[inline]
    pub fn raw(self) -> EntityRaw {
        self.0
    }

    /// Returns the handle `offset` places after this one.
    ///
    /// Used to walk contiguous id ranges produced by bulk allocation.
    #[inline]
    pub fn offset(self, offset: usize) -> EntityId {
        EntityId(self.0 + offset as EntityRaw)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<EntityId> for EntityRaw {
    fn from(entity: EntityId) -> Self {
        entity.0
    }
}

/// Returns the single-bit mask for `component_id`, or `0` past the mask width.
#[inline]
pub(crate) const fn bit(component_id: ComponentID) -> u64 {
    match 1u64.checked_shl(component_id as u32) {
        Some(mask) => mask,
        None => 0,
    }
}
