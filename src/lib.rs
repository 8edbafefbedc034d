//! # Archetype Store
//!
//! In-process, archetype-based entity/component store used as the state
//! substrate of a real-time simulation loop.
//!
//! ## Design Goals
//! - One columnar pool per archetype for cache-friendly iteration
//! - Archetype identity as a single `u64` mask
//! - Structural change only from the owning context, enforced by a token
//! - Zero-copy bulk visits, optionally parallel across pools
//! - Deferred structural change through a thread-safe scheduler
//!
//! ## Example
//! ```ignore
//! use archetype_store::prelude::*;
//!
//! let (scene, owner) = Scene::new(SceneConfig::default())?;
//! let moving = scene.archetype().with::<Position>()?.with::<Velocity>()?.build();
//! let first = scene.bulk().create_entities2::<Position, Velocity>(&owner, moving, 1000, |_, p, v| {
//!     *v = Velocity { x: 1.0 };
//! })?;
//!
//! let query = scene.define_query::<(Position, Velocity)>()?;
//! query.visit_all(&scene, |_, positions, velocities| {
//!     for (p, v) in positions.iter_mut().zip(velocities.iter()) {
//!         p.x += v.x;
//!     }
//! })?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core types

pub use engine::scene::{Scene, SceneOwner};

pub use engine::archetype::{Archetype, ArchetypeBuilder};

pub use engine::component::{Component, ComponentDesc, ComponentRegistry};

pub use engine::config::SceneConfig;

pub use engine::pool::ComponentStorePool;

pub use engine::entity::{EntityIndex, EntityRecord};

pub use engine::storage::{Column, ErasedColumn};

// Queries and deferred work

pub use engine::query::{
    Query1,
    Query2,
    Query3,
    Query4,
    Query5,
    QueryCriteria,
    QueryFilter,
    QueryShape,
};

pub use engine::lock::{QueryGuard, QueryLock};

pub use engine::scheduler::Scheduler;

pub use engine::commands::Command;

pub use engine::bulk::BulkManager;

pub use engine::inspect::Inspector;

pub use engine::systems::{
    PerformanceCounter,
    System,
    SystemManager,
    Time,
};

pub use engine::error::{
    CapacityError,
    ConfigError,
    ECSError,
    ECSResult,
    InvariantError,
    QueryError,
    RangeError,
    ThreadingError,
};

pub use engine::types::{
    ComponentID,
    EntityId,
    PoolID,
    SlotID,
    MAX_COMPONENT_TYPES,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used store types.
///
/// Import with:
/// ```rust
/// use archetype_store::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Archetype,
        Component,
        ECSError,
        ECSResult,
        EntityId,
        QueryCriteria,
        Scene,
        SceneConfig,
        SceneOwner,
        System,
        SystemManager,
        Time,
    };
}
