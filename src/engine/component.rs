//! # Component Registry
//!
//! Assigns stable [`ComponentID`] values to Rust component types and keeps the
//! column factories used to allocate pool storage for them.
//!
//! ## Purpose
//! The registry is the source of truth for "what does bit N of an archetype
//! mask mean". It decouples type information (`TypeId`, name, size, alignment)
//! from runtime storage so pools can hold heterogeneous columns behind
//! [`ErasedColumn`].
//!
//! ## Design
//! - One registry is owned by each [`Scene`](crate::engine::scene::Scene); there
//!   is no process-wide table.
//! - Ids are assigned sequentially from 0 on first use and never change for the
//!   lifetime of the registry.
//! - A per-id factory builds an empty, typed column behind the erased trait.
//!
//! ## Invariants
//! - `by_type` and `by_id` always describe the same set of types.
//! - `factories[id]` exists if and only if `by_id[id]` exists.
//! - `by_id.len() <= max_component_types <= 64`.

use std::{
    any::{type_name, Any, TypeId},
    collections::HashMap,
    fmt,
    mem::{align_of, size_of},
};

use crate::engine::error::{CapacityError, ECSResult};
use crate::engine::storage::{Column, ErasedColumn};
use crate::engine::types::{ComponentID, MAX_COMPONENT_TYPES};


/// A plain value record that can be stored in a pool column.
///
/// `Default` supplies the zero value of a newly gained component and `Clone`
/// backs the copy-out accessors. Implemented automatically for every eligible
/// type.

pub trait Component: Any + Send + Sync + Default + Clone {}

impl<T: Any + Send + Sync + Default + Clone> Component for T {}

/// Factory function building an empty typed column with the given capacity.
type ColumnFactory = fn(usize) -> Box<dyn ErasedColumn>;

fn new_column<T: Component>(capacity: usize) -> Box<dyn ErasedColumn> {
    Box::new(Column::<T>::with_capacity(capacity))
}

/// Mapping between component types and compact ids, owned by one scene.

pub struct ComponentRegistry {
    max_component_types: usize,
    by_type: HashMap<TypeId, ComponentID>,
    by_id: Vec<ComponentDesc>,
    factories: Vec<ColumnFactory>,
}

impl ComponentRegistry {
    /// Creates an empty registry accepting up to `max_component_types` types.
    ///
    /// Values above 64 are clamped to the mask width.

    pub fn new(max_component_types: usize) -> Self {
        let max_component_types = max_component_types.min(MAX_COMPONENT_TYPES);
        Self {
            max_component_types,
            by_type: HashMap::with_capacity(max_component_types),
            by_id: Vec::with_capacity(max_component_types),
            factories: Vec::with_capacity(max_component_types),
        }
    }

    /// Registers `T` if needed and returns its id.
    ///
    /// ## Behavior
    /// - Idempotent: a type already registered returns its existing id.
    /// - New types receive the next sequential id.
    ///
    /// # Errors
    /// [`CapacityError::ComponentTypes`] once the configured limit is reached.

    pub fn register<T: Component>(&mut self) -> ECSResult<ComponentID> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(existing);
        }

        let next = self.by_id.len();
        if next >= self.max_component_types {
            return Err(CapacityError::ComponentTypes {
                limit: self.max_component_types,
                name: type_name::<T>(),
            }
            .into());
        }

        let id = next as ComponentID;
        self.by_type.insert(type_id, id);
        self.by_id.push(ComponentDesc::of::<T>().with_id(id));
        self.factories.push(new_column::<T>);
        Ok(id)
    }

    /// Returns the id of `T`, if registered.
    #[inline]
    pub fn id_of<T: 'static>(&self) -> Option<ComponentID> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the descriptor of a registered id.
    #[inline]
    pub fn description(&self, component_id: ComponentID) -> Option<&ComponentDesc> {
        self.by_id.get(component_id as usize)
    }

    /// Returns the type name of a registered id, or `"<unregistered>"`.
    pub fn name_of(&self, component_id: ComponentID) -> &'static str {
        self.description(component_id)
            .map(|desc| desc.name)
            .unwrap_or("<unregistered>")
    }

    /// Number of registered component types.
    #[inline]
    pub fn component_count(&self) -> usize {
        self.by_id.len()
    }

    /// Configured limit on component types.
    #[inline]
    pub fn max_component_types(&self) -> usize {
        self.max_component_types
    }

    /// Builds an empty typed column for `component_id`.
    pub(crate) fn create_column(
        &self,
        component_id: ComponentID,
        capacity: usize,
    ) -> Option<Box<dyn ErasedColumn>> {
        self.factories
            .get(component_id as usize)
            .map(|factory| factory(capacity))
    }
}

impl fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("max_component_types", &self.max_component_types)
            .field("components", &self.by_id)
            .finish()
    }
}

/// Registration entry point usable as a plain function pointer.
///
/// Lets type lists (query criteria, deferred operations) carry "register this
/// type" without holding the registry.
pub(crate) fn register_erased<T: Component>(registry: &mut ComponentRegistry) -> ECSResult<ComponentID> {
    registry.register::<T>()
}

/// Describes a registered component type.
///
/// ## Fields
/// - `component_id`: id assigned by the registry.
/// - `name`: `type_name::<T>()`.
/// - `type_id`: runtime `TypeId`.
/// - `size` / `align`: layout of `T` in bytes.

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ComponentDesc {
    /// Runtime identifier assigned to this component type.
    pub component_id: ComponentID,

    /// Rust type name for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the component.
    pub type_id: TypeId,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Alignment of the component type in bytes.
    pub align: usize,
}

impl ComponentDesc {
    /// Descriptor for `T` with `component_id = 0`; finalize with [`with_id`](Self::with_id).
    #[inline]
    pub fn of<T: 'static>() -> Self {
        Self {
            component_id: 0,
            name: type_name::<T>(),
            type_id: TypeId::of::<T>(),
            size: size_of::<T>(),
            align: align_of::<T>(),
        }
    }

    /// Returns a copy carrying `component_id`.
    #[inline]
    pub fn with_id(mut self, component_id: ComponentID) -> Self {
        self.component_id = component_id;
        self
    }

    /// Type name without its module path and without a trailing `Component`.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.name)
    }
}

impl fmt::Display for ComponentDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Component(id={}, name={}, size={}, align={})",
            self.component_id, self.name, self.size, self.align
        )
    }
}

/// Strips the module path and a trailing `Component` from a type name.
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let base = full.split('<').next().unwrap_or(full);
    let last = base.rsplit("::").next().unwrap_or(base);
    match last.strip_suffix("Component") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => last,
    }
}
