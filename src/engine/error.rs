//! Error types for the entity/component store.
//!
//! Every failure in this crate is a **local, synchronous programmer-error
//! signal**: there is no transient or retriable class. Errors are grouped into
//! small, focused enums (one per failure class) which aggregate into
//! [`ECSError`] through `From` conversions, so orchestration code can use `?`
//! freely and callers can still match on the precise cause.
//!
//! ## Classes
//! * [`CapacityError`]: a configured or hard limit was exceeded.
//! * [`InvariantError`]: the request contradicts the entity's archetype or a
//!   registration rule (duplicate component, absent component, duplicate
//!   callback, wrong dynamic type).
//! * [`ThreadingError`]: structural mutation was attempted without the owning
//!   context, or while the scene is locked for iteration.
//! * [`QueryError`]: nested query acquisition, or a single-entity visit that
//!   did not match exactly one entity.
//! * [`RangeError`]: a slot or entity id that is not currently live.
//! * [`ConfigError`]: invalid [`SceneConfig`](crate::engine::config::SceneConfig).
//!
//! ## Display vs. Debug
//! * `Display` is short and imperative, suitable for logs.
//! * `Debug` (derived) keeps the full structure for diagnostics.
//!
//! ## Example
//! ```ignore
//! match scene.add_component::<Velocity>(&owner, entity) {
//!     Ok(()) => {}
//!     Err(ECSError::Threading(ThreadingError::QueryInProgress)) => {
//!         scene.scheduler().enqueue_add_component::<Velocity>(entity);
//!     }
//!     Err(other) => return Err(other),
//! }
//! ```

use thiserror::Error;

use crate::engine::types::{ComponentID, EntityId, SlotID};


/// A configured or hard limit was exceeded.
///
/// Fatal to the operation, not to the process: the caller must reconfigure.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapacityError {
    /// All component ids of the registry are taken.
    #[error("component type limit reached ({limit}); cannot register {name}")]
    ComponentTypes {
        /// Configured maximum number of component types.
        limit: usize,

        /// Type that could not be registered.
        name: &'static str,
    },

    /// The pool table is full.
    #[error("archetype limit reached ({limit}); cannot create a pool for mask {mask:#018x}")]
    Archetypes {
        /// Configured maximum number of archetypes.
        limit: usize,

        /// Mask of the archetype that needed a new pool.
        mask: u64,
    },

    /// The monotonic entity id counter would overflow.
    #[error("entity id space exhausted ({requested} ids requested)")]
    EntityIds {
        /// Number of ids the failed allocation asked for.
        requested: usize,
    },

    /// Doubling a pool's capacity overflowed `usize`.
    #[error("pool capacity overflow ({needed} slots needed)")]
    PoolCapacity {
        /// Slot count the pool attempted to reach.
        needed: usize,
    },
}

/// The request contradicts an archetype or a registration rule.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantError {
    /// `with` was applied to an archetype that already carries the component.
    #[error("archetype already contains component {name}")]
    DuplicateComponent {
        /// Registry id of the component.
        component_id: ComponentID,

        /// Component type name.
        name: &'static str,
    },

    /// `without` was applied to an archetype that does not carry the component.
    #[error("archetype does not contain component {name}")]
    AbsentComponent {
        /// Registry id of the component.
        component_id: ComponentID,

        /// Component type name.
        name: &'static str,
    },

    /// A component id does not fit in the archetype mask.
    #[error("component id {component_id} of {name} is outside the archetype mask")]
    ComponentIdOutOfRange {
        /// Rejected id.
        component_id: ComponentID,

        /// Component type name.
        name: &'static str,
    },

    /// A bulk create asked for zero entities.
    #[error("bulk creation needs at least one entity")]
    EmptyBatch,

    /// A component accessor targeted a type the entity's archetype lacks.
    #[error("entity {entity} does not have a {name}")]
    MissingComponent {
        /// Entity that was accessed.
        entity: EntityId,

        /// Component type name.
        name: &'static str,
    },

    /// A second component-removed callback was registered for one type.
    #[error("only one removal callback per component type can be registered ({name})")]
    DuplicateCallback {
        /// Component type name.
        name: &'static str,
    },

    /// A dynamically typed value did not match the column's element type.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// Element type of the destination column.
        expected: &'static str,

        /// Type of the value provided.
        actual: &'static str,
    },

    /// A pool has no column for a component its archetype declares.
    #[error("pool is missing the column for component id {component_id}")]
    MissingColumn {
        /// Registry id of the component.
        component_id: ComponentID,
    },

    /// A system of the same type was already added to the manager.
    #[error("a system of type {name} is already registered")]
    DuplicateSystem {
        /// System type name.
        name: &'static str,
    },

    /// Systems cannot be added once `initialize_all` has run.
    #[error("cannot add systems after initialize_all was called")]
    SystemsInitialized,
}

/// Structural mutation attempted outside the owning context.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ThreadingError {
    /// The presented owner token belongs to a different scene.
    #[error("owner token does not belong to this scene; use the scene's scheduler instead")]
    ForeignOwner,

    /// The scene is locked by a running query or callback dispatch.
    #[error("cannot do this while visiting query results; schedule the operation instead")]
    QueryInProgress,
}

/// Query acquisition or result-shape failure.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A query was started while another one held the exclusivity flag.
    #[error("queries cannot be nested")]
    NestedQuery,

    /// A single-entity visit found nothing.
    #[error("query matches no entities")]
    NoMatch,

    /// A single-entity visit found more than one entity.
    #[error("query matches more than one entity ({count})")]
    MultipleMatches {
        /// Total number of matching entities.
        count: usize,
    },

    /// The same component type was listed twice in one query.
    #[error("component {name} appears more than once in the query")]
    RepeatedComponent {
        /// Component type name.
        name: &'static str,
    },
}

/// A slot index or entity id that is not currently live.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    /// A pool slot at or beyond the live count was addressed.
    #[error("slot {slot} is not an allocated item of the pool (count {count})")]
    SlotOutOfRange {
        /// Offending slot.
        slot: SlotID,

        /// Live count of the pool.
        count: usize,
    },

    /// The entity id was never allocated or has been removed.
    #[error("entity {entity} does not exist")]
    UnknownEntity {
        /// Offending entity.
        entity: EntityId,
    },
}

/// Invalid scene configuration.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// `max_component_types` must be in `1..=64`.
    #[error("max_component_types must be within [1, {max}], got {value}")]
    MaxComponentTypes {
        /// Rejected value.
        value: usize,

        /// Largest accepted value.
        max: usize,
    },

    /// `max_archetypes` must be at least 1.
    #[error("max_archetypes must be at least 1")]
    MaxArchetypes,

    /// `initial_pool_capacity` must be at least 1.
    #[error("initial_pool_capacity must be at least 1")]
    InitialPoolCapacity,

    /// The TOML document could not be parsed.
    #[error("invalid configuration document: {0}")]
    Parse(String),
}

/// Aggregate error returned by every fallible operation of the store.

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ECSError {
    /// See [`CapacityError`].
    #[error(transparent)]
    Capacity(#[from] CapacityError),

    /// See [`InvariantError`].
    #[error(transparent)]
    Invariant(#[from] InvariantError),

    /// See [`ThreadingError`].
    #[error(transparent)]
    Threading(#[from] ThreadingError),

    /// See [`QueryError`].
    #[error(transparent)]
    Query(#[from] QueryError),

    /// See [`RangeError`].
    #[error(transparent)]
    Range(#[from] RangeError),

    /// See [`ConfigError`].
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Result alias used throughout the crate.
pub type ECSResult<T> = Result<T, ECSError>;
