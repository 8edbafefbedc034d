//! Typed queries over a scene's pools.
//!
//! A query names one to five component types and, optionally, extra
//! [`QueryCriteria`] restricting which archetypes match. Criteria never change
//! which columns are visited.
//!
//! ## Matching
//! A pool matches when its mask contains every required bit (the queried
//! types plus any `must_have`) and none of the excluded bits:
//!
//! ```text
//! (mask & required) == required && (mask & excluded) == 0
//! ```
//!
//! Pools are visited in creation order. Order within a pool is whatever
//! swap-remove compaction left behind.
//!
//! ## Execution model
//! * `visit_all` hands each matching pool to the callback as zero-copy slices
//!   over the pool's columns, all of length `count()`.
//! * `visit_all_par` does the same but dispatches pools to rayon when the
//!   query's `parallel` flag is set. Distinct pools never share storage.
//! * `visit_each` / `visit_each_par` call back once per entity.
//! * `visit_single` / `get_single` require exactly one matching entity.
//!
//! Every visit holds the scene's exclusivity lock for its whole duration, so
//! structural calls from inside a callback fail and nested queries are
//! rejected. Type checks happen once per pool binding, never per element.
//!
//! ## Example
//! ```ignore
//! let mut movers = scene.define_query::<(Position, Velocity)>()?;
//! movers.parallel = true;
//! movers.visit_all_par(&scene, |_, positions, velocities| {
//!     for (p, v) in positions.iter_mut().zip(velocities.iter()) {
//!         p.x += v.x;
//!     }
//! })?;
//! ```

use std::marker::PhantomData;

use rayon::prelude::*;

use crate::engine::archetype::Archetype;
use crate::engine::component::{register_erased, Component, ComponentRegistry};
use crate::engine::error::{ECSResult, QueryError};
use crate::engine::scene::Scene;
use crate::engine::types::{bit, ComponentID, EntityId};


type RegisterFn = fn(&mut ComponentRegistry) -> ECSResult<ComponentID>;

/// Extra component constraints of a query.
///
/// ```ignore
/// let criteria = QueryCriteria::new().must_not_have::<Frozen>();
/// let query = scene.define_query_with::<(Position,)>(criteria)?;
/// ```

#[derive(Clone, Default)]
pub struct QueryCriteria {
    must_have: Vec<RegisterFn>,
    must_not_have: Vec<RegisterFn>,
}

impl QueryCriteria {
    /// No extra constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching archetypes must also carry `T`.
    pub fn must_have<T: Component>(mut self) -> Self {
        self.must_have.push(register_erased::<T>);
        self
    }

    /// Matching archetypes must not carry `T`.
    pub fn must_not_have<T: Component>(mut self) -> Self {
        self.must_not_have.push(register_erased::<T>);
        self
    }

    fn resolve(&self, registry: &mut ComponentRegistry) -> ECSResult<QueryFilter> {
        let mut filter = QueryFilter::default();
        for register in &self.must_have {
            filter.required |= bit(register(registry)?);
        }
        for register in &self.must_not_have {
            filter.excluded |= bit(register(registry)?);
        }
        Ok(filter)
    }
}

impl std::fmt::Debug for QueryCriteria {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCriteria")
            .field("must_have", &self.must_have.len())
            .field("must_not_have", &self.must_not_have.len())
            .finish()
    }
}

/// Resolved required/excluded masks.

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Bits every matching archetype carries.
    pub required: u64,
    /// Bits no matching archetype carries.
    pub excluded: u64,
}

impl QueryFilter {
    /// Returns `true` if `archetype` satisfies the filter.
    #[inline]
    pub fn matches(&self, archetype: Archetype) -> bool {
        archetype.contains_all(self.required) && archetype.mask() & self.excluded == 0
    }
}

/// A tuple of component types that can be queried.
///
/// Implemented for tuples of one to five component types.

pub trait QueryShape {
    /// Query type produced for this tuple.
    type Query;

    /// Registers the tuple's types and builds the query.
    fn define(registry: &mut ComponentRegistry, criteria: QueryCriteria) -> ECSResult<Self::Query>;
}

fn ensure_distinct(ids: &[ComponentID], registry: &ComponentRegistry) -> ECSResult<()> {
    let mut seen = 0u64;
    for &component_id in ids {
        if seen & bit(component_id) != 0 {
            return Err(QueryError::RepeatedComponent { name: registry.name_of(component_id) }.into());
        }
        seen |= bit(component_id);
    }
    Ok(())
}

impl Scene {
    /// Defines a query over the component tuple `Q`.
    ///
    /// ```ignore
    /// let query = scene.define_query::<(Position, Velocity)>()?;
    /// ```
    pub fn define_query<Q: QueryShape>(&self) -> ECSResult<Q::Query> {
        self.define_query_with::<Q>(QueryCriteria::new())
    }

    /// Defines a query over `Q` restricted by `criteria`.
    pub fn define_query_with<Q: QueryShape>(&self, criteria: QueryCriteria) -> ECSResult<Q::Query> {
        let mut registry = self.registry_mut()?;
        Q::define(&mut registry, criteria)
    }
}

macro_rules! impl_query {
    ($(#[$doc:meta])* $name:ident; $n:literal; $($T:ident $v:ident $i:tt),+) => {
        $(#[$doc])*
        pub struct $name<$($T),+> {
            ids: [ComponentID; $n],
            filter: QueryFilter,
            /// Dispatch matching pools (and, for four or five components,
            /// elements) to the rayon thread pool.
            pub parallel: bool,
            _marker: PhantomData<fn() -> ($($T,)+)>,
        }

        impl<$($T: Component),+> QueryShape for ($($T,)+) {
            type Query = $name<$($T),+>;

            fn define(registry: &mut ComponentRegistry, criteria: QueryCriteria) -> ECSResult<Self::Query> {
                let ids = [$(registry.register::<$T>()?),+];
                ensure_distinct(&ids, registry)?;

                let mut filter = criteria.resolve(registry)?;
                for &component_id in &ids {
                    filter.required |= bit(component_id);
                }
                Ok($name { ids, filter, parallel: false, _marker: PhantomData })
            }
        }

        impl<$($T: Component),+> $name<$($T),+> {
            /// Resolved matching masks.
            #[inline]
            pub fn filter(&self) -> QueryFilter {
                self.filter
            }

            /// Component ids in declaration order.
            #[inline]
            pub fn component_ids(&self) -> &[ComponentID] {
                &self.ids
            }

            /// Sets the `parallel` flag.
            pub fn with_parallel(mut self, parallel: bool) -> Self {
                self.parallel = parallel;
                self
            }

            /// Total number of matching entities. Does not take the lock.
            pub fn count(&self, scene: &Scene) -> ECSResult<usize> {
                Ok(scene
                    .pools()?
                    .iter()
                    .filter(|pool| self.filter.matches(pool.archetype()))
                    .map(|pool| pool.count())
                    .sum())
            }

            /// Calls `visit` once per non-empty matching pool with its entity ids
            /// and one mutable slice per queried component.
            ///
            /// # Errors
            /// [`QueryError::NestedQuery`] if another query is running.

            pub fn visit_all<F>(&self, scene: &Scene, mut visit: F) -> ECSResult<()>
            where
                F: FnMut(&[EntityId], $(&mut [$T]),+),
            {
                let _guard = scene.claim_query()?;
                let mut pools = scene.pools_mut()?;
                for pool in pools
                    .iter_mut()
                    .filter(|pool| !pool.is_empty() && self.filter.matches(pool.archetype()))
                {
                    let (entities, mut columns) = pool.bind();
                    $( let $v = columns.take::<$T>(self.ids[$i])?; )+
                    visit(entities, $($v),+);
                }
                Ok(())
            }

            /// Like [`visit_all`](Self::visit_all), dispatching pools to rayon
            /// when `parallel` is set.
            pub fn visit_all_par<F>(&self, scene: &Scene, visit: F) -> ECSResult<()>
            where
                F: Fn(&[EntityId], $(&mut [$T]),+) + Send + Sync,
            {
                if !self.parallel {
                    return self.visit_all(scene, |entities, $($v),+| visit(entities, $($v),+));
                }

                let _guard = scene.claim_query()?;
                let mut pools = scene.pools_mut()?;
                pools
                    .par_iter_mut()
                    .filter(|pool| !pool.is_empty() && self.filter.matches(pool.archetype()))
                    .try_for_each(|pool| -> ECSResult<()> {
                        let (entities, mut columns) = pool.bind();
                        $( let $v = columns.take::<$T>(self.ids[$i])?; )+
                        visit(entities, $($v),+);
                        Ok(())
                    })
            }

            /// Calls `visit` once per matching entity.
            pub fn visit_each<F>(&self, scene: &Scene, mut visit: F) -> ECSResult<()>
            where
                F: FnMut(EntityId, $(&mut $T),+),
            {
                self.visit_all(scene, |entities, $($v),+| {
                    for (k, &entity) in entities.iter().enumerate() {
                        visit(entity, $(&mut $v[k]),+);
                    }
                })
            }

            /// Calls `visit` for the only matching entity.
            ///
            /// # Errors
            /// - [`QueryError::NoMatch`] if nothing matches.
            /// - [`QueryError::MultipleMatches`] if more than one entity matches.

            pub fn visit_single<F, R>(&self, scene: &Scene, visit: F) -> ECSResult<R>
            where
                F: FnOnce(EntityId, $(&mut $T),+) -> R,
            {
                let _guard = scene.claim_query()?;
                let mut pools = scene.pools_mut()?;

                let total: usize = pools
                    .iter()
                    .filter(|pool| self.filter.matches(pool.archetype()))
                    .map(|pool| pool.count())
                    .sum();
                match total {
                    0 => return Err(QueryError::NoMatch.into()),
                    1 => {}
                    count => return Err(QueryError::MultipleMatches { count }.into()),
                }

                let pool = pools
                    .iter_mut()
                    .find(|pool| !pool.is_empty() && self.filter.matches(pool.archetype()))
                    .ok_or(QueryError::NoMatch)?;
                let (entities, mut columns) = pool.bind();
                let entity = *entities.first().ok_or(QueryError::NoMatch)?;
                $(
                    let $v = columns
                        .take::<$T>(self.ids[$i])?
                        .first_mut()
                        .ok_or(QueryError::NoMatch)?;
                )+
                Ok(visit(entity, $($v),+))
            }

            /// Copies out the components of the only matching entity.
            pub fn get_single(&self, scene: &Scene) -> ECSResult<($($T,)+)> {
                self.visit_single(scene, |_, $($v),+| ($($v.clone(),)+))
            }
        }

        impl<$($T),+> Clone for $name<$($T),+> {
            fn clone(&self) -> Self {
                Self { ids: self.ids, filter: self.filter, parallel: self.parallel, _marker: PhantomData }
            }
        }

        impl<$($T),+> std::fmt::Debug for $name<$($T),+> {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("ids", &self.ids)
                    .field("filter", &self.filter)
                    .field("parallel", &self.parallel)
                    .finish()
            }
        }
    };
}

impl_query! {
    /// Query over one component type.
    Query1; 1; A a 0
}

impl_query! {
    /// Query over two component types.
    Query2; 2; A a 0, B b 1
}

impl_query! {
    /// Query over three component types.
    Query3; 3; A a 0, B b 1, C c 2
}

impl_query! {
    /// Query over four component types. Supports per-element parallel visits.
    Query4; 4; A a 0, B b 1, C c 2, D d 3
}

impl_query! {
    /// Query over five component types. Supports per-element parallel visits.
    Query5; 5; A a 0, B b 1, C c 2, D d 3, E e 4
}

impl<A: Component, B: Component, C: Component, D: Component> Query4<A, B, C, D> {
    /// Calls `visit` once per matching entity, splitting each pool across
    /// rayon workers when `parallel` is set and the pool holds more than one
    /// entity. Pools themselves are visited one after another.
    pub fn visit_each_par<F>(&self, scene: &Scene, visit: F) -> ECSResult<()>
    where
        F: Fn(EntityId, &mut A, &mut B, &mut C, &mut D) + Send + Sync,
    {
        self.visit_all(scene, |entities, a, b, c, d| {
            if self.parallel && entities.len() > 1 {
                entities
                    .par_iter()
                    .zip(a.par_iter_mut())
                    .zip(b.par_iter_mut())
                    .zip(c.par_iter_mut())
                    .zip(d.par_iter_mut())
                    .for_each(|((((&entity, a), b), c), d)| visit(entity, a, b, c, d));
            } else {
                for (k, &entity) in entities.iter().enumerate() {
                    visit(entity, &mut a[k], &mut b[k], &mut c[k], &mut d[k]);
                }
            }
        })
    }
}

impl<A: Component, B: Component, C: Component, D: Component, E: Component> Query5<A, B, C, D, E> {
    /// Five-component counterpart of [`Query4::visit_each_par`].
    pub fn visit_each_par<F>(&self, scene: &Scene, visit: F) -> ECSResult<()>
    where
        F: Fn(EntityId, &mut A, &mut B, &mut C, &mut D, &mut E) + Send + Sync,
    {
        self.visit_all(scene, |entities, a, b, c, d, e| {
            if self.parallel && entities.len() > 1 {
                entities
                    .par_iter()
                    .zip(a.par_iter_mut())
                    .zip(b.par_iter_mut())
                    .zip(c.par_iter_mut())
                    .zip(d.par_iter_mut())
                    .zip(e.par_iter_mut())
                    .for_each(|(((((&entity, a), b), c), d), e)| visit(entity, a, b, c, d, e));
            } else {
                for (k, &entity) in entities.iter().enumerate() {
                    visit(entity, &mut a[k], &mut b[k], &mut c[k], &mut d[k], &mut e[k]);
                }
            }
        })
    }
}
