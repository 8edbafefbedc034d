//! # Archetype masks
//!
//! An [`Archetype`] is the exact set of component types an entity carries,
//! encoded as one `u64` where bit `i` means "has component id `i`".
//!
//! Archetypes are plain values: they own no storage and compare by mask.
//! They are built structurally, starting from [`Archetype::EMPTY`] and adding
//! or removing one component at a time. Both directions are strict: adding a
//! component that is already present, or removing one that is absent, is an
//! [`InvariantError`] rather than a silent no-op.
//!
//! ```ignore
//! let moving = scene
//!     .archetype()
//!     .with::<Position>()?
//!     .with::<Velocity>()?
//!     .build();
//! ```

use std::fmt;

use crate::engine::component::{short_type_name, Component, ComponentRegistry};
use crate::engine::error::{ECSResult, InvariantError};
use crate::engine::scene::Scene;
use crate::engine::types::{bit, ComponentID, MAX_COMPONENT_TYPES};


fn check_id(component_id: ComponentID, name: &'static str) -> ECSResult<()> {
    if component_id as usize >= MAX_COMPONENT_TYPES {
        return Err(InvariantError::ComponentIdOutOfRange { component_id, name }.into());
    }
    Ok(())
}

/// Component-set signature of an entity.

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Archetype {
    mask: u64,
}

impl Archetype {
    /// The archetype with no components.
    pub const EMPTY: Archetype = Archetype { mask: 0 };

    /// Wraps a raw mask.
    #[inline]
    pub const fn from_mask(mask: u64) -> Self {
        Self { mask }
    }

    /// Raw mask.
    #[inline]
    pub const fn mask(self) -> u64 {
        self.mask
    }

    /// Returns `true` for the empty archetype.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.mask == 0
    }

    /// Adds component id `component_id`.
    ///
    /// `name` is only used to describe the failure.
    ///
    /// # Errors
    /// - [`InvariantError::ComponentIdOutOfRange`] if `component_id >= 64`.
    /// - [`InvariantError::DuplicateComponent`] if the bit is already set.

    pub fn with_id(self, component_id: ComponentID, name: &'static str) -> ECSResult<Self> {
        check_id(component_id, name)?;
        if self.contains(component_id) {
            return Err(InvariantError::DuplicateComponent { component_id, name }.into());
        }
        Ok(Self { mask: self.mask | bit(component_id) })
    }

    /// Removes component id `component_id`.
    ///
    /// # Errors
    /// - [`InvariantError::ComponentIdOutOfRange`] if `component_id >= 64`.
    /// - [`InvariantError::AbsentComponent`] if the bit is not set.

    pub fn without_id(self, component_id: ComponentID, name: &'static str) -> ECSResult<Self> {
        check_id(component_id, name)?;
        if !self.contains(component_id) {
            return Err(InvariantError::AbsentComponent { component_id, name }.into());
        }
        Ok(Self { mask: self.mask & !bit(component_id) })
    }

    /// Adds `T`, registering it in `registry` on first use.
    pub fn with<T: Component>(self, registry: &mut ComponentRegistry) -> ECSResult<Self> {
        let component_id = registry.register::<T>()?;
        self.with_id(component_id, std::any::type_name::<T>())
    }

    /// Removes `T`, registering it in `registry` on first use.
    pub fn without<T: Component>(self, registry: &mut ComponentRegistry) -> ECSResult<Self> {
        let component_id = registry.register::<T>()?;
        self.without_id(component_id, std::any::type_name::<T>())
    }

    /// Returns `true` if the archetype carries `component_id`.
    #[inline]
    pub const fn contains(self, component_id: ComponentID) -> bool {
        (component_id as u32) < u64::BITS && self.mask & bit(component_id) != 0
    }

    /// Returns `true` if every bit of `mask` is set in this archetype.
    #[inline]
    pub const fn contains_all(self, mask: u64) -> bool {
        self.mask & mask == mask
    }

    /// Number of component types.
    #[inline]
    pub const fn component_count(self) -> usize {
        self.mask.count_ones() as usize
    }

    /// Set component ids in ascending order.
    pub fn component_ids(self) -> impl Iterator<Item = ComponentID> {
        let mut bits = self.mask;
        std::iter::from_fn(move || {
            if bits == 0 {
                return None;
            }
            let tz = bits.trailing_zeros();
            bits &= bits - 1;
            Some(tz as ComponentID)
        })
    }

    /// Highest set component id, or `None` for the empty archetype.
    ///
    /// Pools size their column lookup table as `highest + 1`.
    #[inline]
    pub const fn highest_component_id(self) -> Option<ComponentID> {
        if self.mask == 0 {
            None
        } else {
            Some((u64::BITS - 1 - self.mask.leading_zeros()) as ComponentID)
        }
    }

    /// Display adapter rendering `[A + B]` with names from `registry`.
    pub fn display(self, registry: &ComponentRegistry) -> ArchetypeDisplay<'_> {
        ArchetypeDisplay { archetype: self, registry }
    }
}

/// Renders an archetype as `[A + B]`.
///
/// Names are sorted, stripped of their module path and of a trailing
/// `Component`.

pub struct ArchetypeDisplay<'r> {
    archetype: Archetype,
    registry: &'r ComponentRegistry,
}

impl fmt::Display for ArchetypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self
            .archetype
            .component_ids()
            .map(|id| short_type_name(self.registry.name_of(id)))
            .collect();
        names.sort_unstable();
        write!(f, "[{}]", names.join(" + "))
    }
}

/// Builds an archetype against a scene's registry.
///
/// Obtained from [`Scene::archetype`]. Each step registers the type if needed.

pub struct ArchetypeBuilder<'s> {
    scene: &'s Scene,
    archetype: Archetype,
}

impl<'s> ArchetypeBuilder<'s> {
    pub(crate) fn new(scene: &'s Scene, archetype: Archetype) -> Self {
        Self { scene, archetype }
    }

    /// Adds `T`.
    pub fn with<T: Component>(self) -> ECSResult<Self> {
        let component_id = self.scene.register_component::<T>()?;
        let archetype = self.archetype.with_id(component_id, std::any::type_name::<T>())?;
        Ok(Self { archetype, ..self })
    }

    /// Removes `T`.
    pub fn without<T: Component>(self) -> ECSResult<Self> {
        let component_id = self.scene.register_component::<T>()?;
        let archetype = self.archetype.without_id(component_id, std::any::type_name::<T>())?;
        Ok(Self { archetype, ..self })
    }

    /// Finishes the builder.
    #[inline]
    pub fn build(self) -> Archetype {
        self.archetype
    }
}
