//! # Scene orchestration
//!
//! The [`Scene`] owns the component registry, the entity index and the table
//! of component store pools. It is the single entry point for structural
//! change:
//!
//! * creating entities (empty archetype, explicit archetype, or typed
//!   component factories),
//! * adding and removing components, which migrates the entity between pools,
//! * removing entities, after firing component-removed callbacks,
//! * applying deferred operations queued on the [`Scheduler`].
//!
//! ## Ownership model
//!
//! [`Scene::new`] returns the scene together with its [`SceneOwner`] token.
//! Every structural entry point takes `&SceneOwner`; the token is neither
//! `Send` nor `Sync`, so structural calls can only be made on the thread that
//! created the scene. A token of another scene is rejected with
//! [`ThreadingError::ForeignOwner`].
//!
//! The scene itself is `Send` but not `Sync`: it can be moved to another
//! thread as a whole, but a `&Scene` never reaches a rayon worker. Parallel
//! query callbacks receive slices, not the scene.
//!
//! ## Exclusivity
//!
//! While a query iterates, or a component-removed callback runs, the scene's
//! [`QueryLock`] is held and every structural entry point fails with
//! [`ThreadingError::QueryInProgress`]. Such changes go through
//! [`Scene::scheduler`] and are applied by [`Scene::drain`].
//!
//! ## Migration
//!
//! Changing an entity's archetype allocates a slot in the destination pool,
//! moves every column the two archetypes share, frees the source slot
//! (swap-remove, which may move another entity) and repoints the entity
//! index. Newly gained components start from `Default::default()`.

use std::{
    any::type_name,
    cell::{Ref, RefCell, RefMut},
    collections::HashMap,
    fmt,
    marker::PhantomData,
    sync::atomic::{AtomicU64, Ordering},
};

use tracing::{debug, trace, warn};

use crate::engine::archetype::{Archetype, ArchetypeBuilder};
use crate::engine::bulk::BulkManager;
use crate::engine::component::{Component, ComponentRegistry};
use crate::engine::config::SceneConfig;
use crate::engine::entity::{EntityIndex, EntityRecord};
use crate::engine::error::{
    CapacityError, ECSError, ECSResult, InvariantError, QueryError, RangeError, ThreadingError,
};
use crate::engine::hooks::RemovedCallbacks;
use crate::engine::lock::{QueryGuard, QueryLock};
use crate::engine::pool::{pool_pair_mut, ComponentStorePool};
use crate::engine::scheduler::Scheduler;
use crate::engine::systems::{SystemManager, Time};
use crate::engine::types::{bit, ComponentID, EntityId, PoolID};


static NEXT_SCENE_ID: AtomicU64 = AtomicU64::new(1);

/// Proof of ownership over one [`Scene`].
///
/// Required by every structural entry point. Not `Send`, not `Sync`.

pub struct SceneOwner {
    scene_id: u64,
    _not_send: PhantomData<*const ()>,
}

impl SceneOwner {
    /// Id of the scene this token belongs to.
    #[inline]
    pub fn scene_id(&self) -> u64 {
        self.scene_id
    }
}

impl fmt::Debug for SceneOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneOwner").field("scene_id", &self.scene_id).finish()
    }
}

/// Archetype-based entity/component store.

pub struct Scene {
    id: u64,
    config: SceneConfig,
    registry: RefCell<ComponentRegistry>,
    pools: RefCell<Vec<ComponentStorePool>>,
    archetypes: RefCell<Vec<Archetype>>,
    pool_by_mask: RefCell<HashMap<u64, PoolID>>,
    index: RefCell<EntityIndex>,
    callbacks: RefCell<RemovedCallbacks>,
    lock: QueryLock,
    scheduler: Scheduler,
}

#[inline]
fn busy() -> ECSError {
    ThreadingError::QueryInProgress.into()
}

/// Builds one typed-create method per arity.
macro_rules! impl_create_entity {
    ($(#[$doc:meta])* $name:ident; $($T:ident $make:ident $id:ident),+) => {
        $(#[$doc])*
        pub fn $name<$($T: Component),+>(
            &self,
            owner: &SceneOwner,
            $($make: impl FnOnce(EntityId) -> $T),+
        ) -> ECSResult<EntityId> {
            self.ensure_safe(owner)?;

            let mut archetype = Archetype::EMPTY;
            $(
                let $id = self.register_component::<$T>()?;
                archetype = archetype.with_id($id, type_name::<$T>())?;
            )+
            let pool_id = self.pool_for(archetype)?;

            let mut index = self.index_mut()?;
            let mut pools = self.pools_mut()?;
            let entity = index.allocate()?;
            let pool = &mut pools[pool_id];
            let slot = pool.allocate(entity)?;
            index.set_location(entity, pool_id, slot);

            $( pool.column_mut::<$T>($id)?.set(slot, $make(entity))?; )+
            Ok(entity)
        }
    };
}

impl Scene {
    /// Creates a scene and its owner token.
    ///
    /// # Errors
    /// [`ConfigError`](crate::engine::error::ConfigError) if `config` is invalid.

    pub fn new(config: SceneConfig) -> ECSResult<(Scene, SceneOwner)> {
        config.validate()?;
        let id = NEXT_SCENE_ID.fetch_add(1, Ordering::Relaxed);

        let scene = Scene {
            id,
            registry: RefCell::new(ComponentRegistry::new(config.max_component_types)),
            pools: RefCell::new(Vec::new()),
            archetypes: RefCell::new(Vec::new()),
            pool_by_mask: RefCell::new(HashMap::new()),
            index: RefCell::new(EntityIndex::with_capacity(config.initial_entity_capacity)),
            callbacks: RefCell::new(RemovedCallbacks::default()),
            lock: QueryLock::new(),
            scheduler: Scheduler::new(),
            config,
        };
        debug!(
            scene = id,
            max_component_types = scene.config.max_component_types,
            max_archetypes = scene.config.max_archetypes,
            "scene created"
        );
        Ok((scene, SceneOwner { scene_id: id, _not_send: PhantomData }))
    }

    /// Unique id of this scene.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Configuration the scene was built with.
    #[inline]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Queue of deferred structural operations.
    #[inline]
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Bulk creation entry point.
    #[inline]
    pub fn bulk(&self) -> BulkManager<'_> {
        BulkManager::new(self)
    }

    /// Starts an archetype from the empty set.
    #[inline]
    pub fn archetype(&self) -> ArchetypeBuilder<'_> {
        ArchetypeBuilder::new(self, Archetype::EMPTY)
    }

    /// Registers `T` in this scene's registry if needed and returns its id.
    pub fn register_component<T: Component>(&self) -> ECSResult<ComponentID> {
        self.registry.try_borrow_mut().map_err(|_| busy())?.register::<T>()
    }

    /// Id of `T`, if registered.
    pub fn component_id<T: Component>(&self) -> Option<ComponentID> {
        self.registry.try_borrow().ok().and_then(|registry| registry.id_of::<T>())
    }

    /// Renders `archetype` as `[A + B]`.
    pub fn archetype_name(&self, archetype: Archetype) -> ECSResult<String> {
        Ok(archetype.display(&*self.registry()?).to_string())
    }

    /// Returns `true` while a query or removal callback holds the lock.
    #[inline]
    pub fn is_query_in_progress(&self) -> bool {
        self.lock.is_held()
    }

    // ───────────────────────────────────────────────────────────────
    // Internal access
    // ───────────────────────────────────────────────────────────────

    /// Fails unless `owner` belongs to this scene and no query is running.
    pub(crate) fn ensure_safe(&self, owner: &SceneOwner) -> ECSResult<()> {
        if owner.scene_id != self.id {
            return Err(ThreadingError::ForeignOwner.into());
        }
        if self.lock.is_held() {
            return Err(ThreadingError::QueryInProgress.into());
        }
        Ok(())
    }

    pub(crate) fn claim_query(&self) -> Result<QueryGuard<'_>, QueryError> {
        self.lock.claim()
    }

    pub(crate) fn registry(&self) -> ECSResult<Ref<'_, ComponentRegistry>> {
        self.registry.try_borrow().map_err(|_| busy())
    }

    pub(crate) fn registry_mut(&self) -> ECSResult<RefMut<'_, ComponentRegistry>> {
        self.registry.try_borrow_mut().map_err(|_| busy())
    }

    pub(crate) fn pools(&self) -> ECSResult<Ref<'_, Vec<ComponentStorePool>>> {
        self.pools.try_borrow().map_err(|_| busy())
    }

    pub(crate) fn pools_mut(&self) -> ECSResult<RefMut<'_, Vec<ComponentStorePool>>> {
        self.pools.try_borrow_mut().map_err(|_| busy())
    }

    pub(crate) fn index(&self) -> ECSResult<Ref<'_, EntityIndex>> {
        self.index.try_borrow().map_err(|_| busy())
    }

    pub(crate) fn index_mut(&self) -> ECSResult<RefMut<'_, EntityIndex>> {
        self.index.try_borrow_mut().map_err(|_| busy())
    }

    fn locate(&self, entity: EntityId) -> ECSResult<EntityRecord> {
        self.index()?
            .location(entity)
            .ok_or_else(|| RangeError::UnknownEntity { entity }.into())
    }

    fn pool_archetype(&self, pool: PoolID) -> ECSResult<Archetype> {
        let archetypes = self.archetypes.try_borrow().map_err(|_| busy())?;
        archetypes
            .get(pool)
            .copied()
            .ok_or_else(|| RangeError::SlotOutOfRange { slot: pool, count: archetypes.len() }.into())
    }

    /// Resolves the pool for `archetype`, creating it on first sight.
    ///
    /// # Errors
    /// [`CapacityError::Archetypes`] once `max_archetypes` pools exist.

    pub(crate) fn pool_for(&self, archetype: Archetype) -> ECSResult<PoolID> {
        let mask = archetype.mask();
        let existing = self
            .pool_by_mask
            .try_borrow()
            .map_err(|_| busy())?
            .get(&mask)
            .copied();
        if let Some(pool_id) = existing {
            return Ok(pool_id);
        }

        let mut pools = self.pools_mut()?;
        if pools.len() >= self.config.max_archetypes {
            return Err(CapacityError::Archetypes { limit: self.config.max_archetypes, mask }.into());
        }

        let pool = ComponentStorePool::new(archetype, self.config.initial_pool_capacity, &*self.registry()?)?;
        let pool_id = pools.len();
        pools.push(pool);
        self.archetypes.try_borrow_mut().map_err(|_| busy())?.push(archetype);
        self.pool_by_mask.try_borrow_mut().map_err(|_| busy())?.insert(mask, pool_id);

        debug!(pool = pool_id, mask, components = archetype.component_count(), "created component store pool");
        Ok(pool_id)
    }

    /// Moves `entity` from its current pool to `destination`, the pool of `target`.
    fn migrate(
        &self,
        entity: EntityId,
        record: EntityRecord,
        target: Archetype,
        destination: PoolID,
    ) -> ECSResult<EntityRecord> {
        let mut pools = self.pools_mut()?;
        let mut index = self.index_mut()?;

        let (source, dest) = pool_pair_mut(&mut pools, record.pool, destination)?;
        let slot = dest.allocate(entity)?;

        let shared = Archetype::from_mask(source.archetype().mask() & target.mask());
        for component_id in shared.component_ids() {
            source.relocate_one(component_id, record.slot, dest, slot)?;
        }

        source.free(record.slot, |moved, moved_slot| index.set_slot(moved, moved_slot))?;
        index.set_location(entity, destination, slot);

        trace!(entity = entity.raw(), from = record.pool, to = destination, slot, "migrated entity");
        Ok(EntityRecord { pool: destination, slot })
    }

    /// Invokes removal callbacks for the components of `mask` that have one.
    fn fire_removed(&self, entity: EntityId, record: EntityRecord, mask: u64) -> ECSResult<()> {
        let mask = mask & self.callbacks.try_borrow().map_err(|_| busy())?.mask();
        if mask == 0 {
            return Ok(());
        }

        let _guard = self.lock.claim().map_err(|_| ThreadingError::QueryInProgress)?;
        let pools = self.pools()?;
        let mut callbacks = self.callbacks.try_borrow_mut().map_err(|_| busy())?;
        let pool = pools
            .get(record.pool)
            .ok_or(RangeError::SlotOutOfRange { slot: record.pool, count: pools.len() })?;

        for component_id in Archetype::from_mask(mask).component_ids() {
            let column = pool
                .column_dyn(component_id)
                .ok_or(InvariantError::MissingColumn { component_id })?;
            callbacks.invoke(component_id, entity, column, record.slot)?;
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────
    // Structural operations
    // ───────────────────────────────────────────────────────────────

    /// Creates an entity of `archetype` with zero-valued components.
    pub fn create_entity(&self, owner: &SceneOwner, archetype: Archetype) -> ECSResult<EntityId> {
        self.ensure_safe(owner)?;
        let pool_id = self.pool_for(archetype)?;

        let mut pools = self.pools_mut()?;
        let mut index = self.index_mut()?;
        let entity = index.allocate()?;
        let slot = pools[pool_id].allocate(entity)?;
        index.set_location(entity, pool_id, slot);
        Ok(entity)
    }

    impl_create_entity! {
        /// Creates an entity of archetype `{A}`, writing the value built by `a`.
        create_entity1; A a id_a
    }

    impl_create_entity! {
        /// Creates an entity of archetype `{A, B}` from one factory per component.
        create_entity2; A a id_a, B b id_b
    }

    impl_create_entity! {
        /// Creates an entity of archetype `{A, B, C}` from one factory per component.
        create_entity3; A a id_a, B b id_b, C c id_c
    }

    impl_create_entity! {
        /// Creates an entity of archetype `{A, B, C, D}` from one factory per component.
        create_entity4; A a id_a, B b id_b, C c id_c, D d id_d
    }

    impl_create_entity! {
        /// Creates an entity of archetype `{A, B, C, D, E}` from one factory per component.
        create_entity5; A a id_a, B b id_b, C c id_c, D d id_d, E e id_e
    }

    /// Adds a zero-valued `T` to `entity`, migrating it to the wider archetype.
    ///
    /// # Errors
    /// - [`RangeError::UnknownEntity`] if `entity` is not live.
    /// - [`InvariantError::DuplicateComponent`] if `entity` already has `T`.
    /// - Threading and capacity errors as for every structural call.

    pub fn add_component<T: Component>(&self, owner: &SceneOwner, entity: EntityId) -> ECSResult<()> {
        self.add_component_inner::<T>(owner, entity).map(|_| ())
    }

    /// Adds `T` to `entity` and sets it to `value`.
    pub fn add_component_with<T: Component>(
        &self,
        owner: &SceneOwner,
        entity: EntityId,
        value: T,
    ) -> ECSResult<()> {
        let (component_id, record) = self.add_component_inner::<T>(owner, entity)?;
        self.pools_mut()?[record.pool]
            .column_mut::<T>(component_id)?
            .set(record.slot, value)
    }

    fn add_component_inner<T: Component>(
        &self,
        owner: &SceneOwner,
        entity: EntityId,
    ) -> ECSResult<(ComponentID, EntityRecord)> {
        self.ensure_safe(owner)?;
        let component_id = self.register_component::<T>()?;
        let record = self.locate(entity)?;
        let target = self
            .pool_archetype(record.pool)?
            .with_id(component_id, type_name::<T>())?;
        let destination = self.pool_for(target)?;
        let record = self.migrate(entity, record, target, destination)?;
        Ok((component_id, record))
    }

    /// Removes `T` from `entity`, firing its removal callback first.
    ///
    /// Removing the last component leaves the entity alive in the empty archetype.
    ///
    /// # Errors
    /// - [`RangeError::UnknownEntity`] if `entity` is not live.
    /// - [`InvariantError::AbsentComponent`] if `entity` lacks `T`.

    pub fn remove_component<T: Component>(&self, owner: &SceneOwner, entity: EntityId) -> ECSResult<()> {
        self.ensure_safe(owner)?;
        let component_id = self.register_component::<T>()?;
        let record = self.locate(entity)?;
        let target = self
            .pool_archetype(record.pool)?
            .without_id(component_id, type_name::<T>())?;

        // The destination pool must exist before callbacks observe the removal.
        let destination = self.pool_for(target)?;
        self.fire_removed(entity, record, bit(component_id))?;
        self.migrate(entity, record, target, destination)?;
        Ok(())
    }

    /// Removes `entity`, firing removal callbacks for its components first.
    ///
    /// Removing an id that is not live is a no-op.

    pub fn remove_entity(&self, owner: &SceneOwner, entity: EntityId) -> ECSResult<()> {
        self.ensure_safe(owner)?;
        let Some(record) = self.index()?.location(entity) else {
            return Ok(());
        };

        let archetype = self.pool_archetype(record.pool)?;
        self.fire_removed(entity, record, archetype.mask())?;

        let mut pools = self.pools_mut()?;
        let mut index = self.index_mut()?;
        pools[record.pool].free(record.slot, |moved, slot| index.set_slot(moved, slot))?;
        index.free(entity);

        trace!(entity = entity.raw(), pool = record.pool, "removed entity");
        Ok(())
    }

    /// Registers the callback invoked before a `T` value is dropped from storage.
    ///
    /// # Errors
    /// [`InvariantError::DuplicateCallback`] if `T` already has one.

    pub fn register_component_removed_callback<T, F>(&self, owner: &SceneOwner, callback: F) -> ECSResult<()>
    where
        T: Component,
        F: FnMut(EntityId, &T) + Send + 'static,
    {
        self.ensure_safe(owner)?;
        let component_id = self.register_component::<T>()?;
        self.callbacks
            .try_borrow_mut()
            .map_err(|_| busy())?
            .register::<T, F>(component_id, callback)?;
        debug!(component = type_name::<T>(), "registered component-removed callback");
        Ok(())
    }

    /// Empties every pool and the entity index and drops pending scheduled operations.
    ///
    /// Pools, registrations and callbacks are kept. Ids are not reused afterwards.

    pub fn clear(&self, owner: &SceneOwner) -> ECSResult<()> {
        self.ensure_safe(owner)?;
        for pool in self.pools_mut()?.iter_mut() {
            pool.clear();
        }
        self.index_mut()?.clear();
        self.scheduler.clear();
        debug!(scene = self.id, "scene cleared");
        Ok(())
    }

    /// Applies queued operations in FIFO order and returns how many ran.
    ///
    /// Operations enqueued while draining are applied too. On the first
    /// failure the error is returned and the remaining operations stay queued.

    pub fn drain(&self, owner: &SceneOwner) -> ECSResult<usize> {
        self.ensure_safe(owner)?;

        let mut applied = 0usize;
        while let Some(command) = self.scheduler.pop() {
            let entity = command.entity();
            let component = command.component_name().unwrap_or("-");
            if let Err(error) = command.apply(self, owner) {
                warn!(entity = entity.raw(), component, %error, "scheduled operation failed");
                return Err(error);
            }
            applied += 1;
        }

        if applied > 0 {
            debug!(applied, "drained scheduled operations");
        }
        Ok(applied)
    }

    /// Runs one frame: every system's update, then [`drain`](Self::drain).
    pub fn tick(&self, owner: &SceneOwner, systems: &mut SystemManager, time: Time) -> ECSResult<usize> {
        systems.update_all(self, owner, time)?;
        self.drain(owner)
    }

    // ───────────────────────────────────────────────────────────────
    // Component access
    // ───────────────────────────────────────────────────────────────

    /// Direct mutable reference to the `T` of `entity`.
    ///
    /// # Errors
    /// - [`RangeError::UnknownEntity`] if `entity` is not live.
    /// - [`InvariantError::MissingComponent`] if `entity` lacks `T`.

    pub fn get_component_ref<T: Component>(&mut self, entity: EntityId) -> ECSResult<&mut T> {
        let (component_id, record) =
            resolve::<T>(self.registry.get_mut(), self.index.get_mut(), self.pools.get_mut(), entity)?;

        let pool = &mut self.pools.get_mut()[record.pool];
        let count = pool.count();
        pool.column_mut::<T>(component_id)?
            .get_mut(record.slot)
            .ok_or_else(|| RangeError::SlotOutOfRange { slot: record.slot, count }.into())
    }

    /// Copy of the `T` of `entity`.
    pub fn get_component<T: Component>(&self, entity: EntityId) -> ECSResult<T> {
        let registry = self.registry()?;
        let index = self.index()?;
        let pools = self.pools()?;
        let (component_id, record) = resolve::<T>(&registry, &index, &pools, entity)?;

        let pool = &pools[record.pool];
        pool.column::<T>(component_id)?
            .get(record.slot)
            .cloned()
            .ok_or_else(|| RangeError::SlotOutOfRange { slot: record.slot, count: pool.count() }.into())
    }

    /// Overwrites the `T` of `entity`.
    pub fn set_component<T: Component>(&self, entity: EntityId, value: T) -> ECSResult<()> {
        let registry = self.registry()?;
        let index = self.index()?;
        let mut pools = self.pools_mut()?;
        let (component_id, record) = resolve::<T>(&registry, &index, &pools, entity)?;

        pools[record.pool].column_mut::<T>(component_id)?.set(record.slot, value)
    }

    /// Returns `true` if `entity` is live and carries `T`.
    pub fn has_component<T: Component>(&self, entity: EntityId) -> bool {
        match (self.component_id::<T>(), self.get_archetype(entity)) {
            (Some(component_id), Ok(archetype)) => archetype.contains(component_id),
            _ => false,
        }
    }

    /// Current archetype of `entity`.
    pub fn get_archetype(&self, entity: EntityId) -> ECSResult<Archetype> {
        let record = self.locate(entity)?;
        self.pool_archetype(record.pool)
    }

    /// Returns `true` if `entity` is live.
    pub fn exists(&self, entity: EntityId) -> bool {
        self.index.try_borrow().map_or(false, |index| index.contains(entity))
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.index.try_borrow().map_or(0, |index| index.entity_count())
    }

    /// Number of registered component types.
    pub fn component_count(&self) -> usize {
        self.registry.try_borrow().map_or(0, |registry| registry.component_count())
    }

    /// Number of pools created so far.
    pub fn pool_count(&self) -> usize {
        self.archetypes.try_borrow().map_or(0, |archetypes| archetypes.len())
    }

    /// One `"{count}/{capacity} {archetype}"` line per pool.
    pub fn memory_report(&self) -> ECSResult<String> {
        let registry = self.registry()?;
        let pools = self.pools()?;
        Ok(pools
            .iter()
            .map(|pool| pool.memory_report(&registry))
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

impl fmt::Debug for Scene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scene")
            .field("id", &self.id)
            .field("entities", &self.entity_count())
            .field("components", &self.component_count())
            .field("pools", &self.pool_count())
            .field("scheduled", &self.scheduler.len())
            .finish()
    }
}

/// Locates the `T` column and slot of `entity`.
fn resolve<T: Component>(
    registry: &ComponentRegistry,
    index: &EntityIndex,
    pools: &[ComponentStorePool],
    entity: EntityId,
) -> ECSResult<(ComponentID, EntityRecord)> {
    let record = index.location(entity).ok_or(RangeError::UnknownEntity { entity })?;
    let missing = || InvariantError::MissingComponent { entity, name: type_name::<T>() };

    let component_id = registry.id_of::<T>().ok_or_else(missing)?;
    let pool = pools.get(record.pool).ok_or_else(missing)?;
    if !pool.archetype().contains(component_id) {
        return Err(missing().into());
    }
    Ok((component_id, record))
}
