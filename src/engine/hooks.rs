//! Component-removed callbacks.
//!
//! At most one callback per component type. The scene invokes it with the
//! entity id and a reference to the value still in storage, just before the
//! slot is freed (whole-entity removal) or the component is dropped by a
//! migration (targeted removal).

use std::{any::type_name, marker::PhantomData};

use crate::engine::component::Component;
use crate::engine::error::{ECSResult, InvariantError, RangeError};
use crate::engine::storage::{Column, ErasedColumn};
use crate::engine::types::{bit, ComponentID, EntityId, SlotID};


/// Type-erased removal callback.
trait RemovedHook: Send {
    fn invoke(&mut self, entity: EntityId, column: &dyn ErasedColumn, slot: SlotID) -> ECSResult<()>;
}

struct TypedHook<T, F> {
    callback: F,
    _marker: PhantomData<fn(&T)>,
}

impl<T, F> RemovedHook for TypedHook<T, F>
where
    T: Component,
    F: FnMut(EntityId, &T) + Send + 'static,
{
    fn invoke(&mut self, entity: EntityId, column: &dyn ErasedColumn, slot: SlotID) -> ECSResult<()> {
        let column = column
            .as_any()
            .downcast_ref::<Column<T>>()
            .ok_or(InvariantError::TypeMismatch {
                expected: type_name::<T>(),
                actual: column.element_type_name(),
            })?;
        let value = column
            .get(slot)
            .ok_or(RangeError::SlotOutOfRange { slot, count: column.len() })?;
        (self.callback)(entity, value);
        Ok(())
    }
}

/// Registered callbacks, indexed by component id.
#[derive(Default)]
pub(crate) struct RemovedCallbacks {
    mask: u64,
    hooks: Vec<Option<Box<dyn RemovedHook>>>,
}

impl RemovedCallbacks {
    /// Components that have a callback.
    #[inline]
    pub(crate) fn mask(&self) -> u64 {
        self.mask
    }

    pub(crate) fn register<T, F>(&mut self, component_id: ComponentID, callback: F) -> ECSResult<()>
    where
        T: Component,
        F: FnMut(EntityId, &T) + Send + 'static,
    {
        if self.mask & bit(component_id) != 0 {
            return Err(InvariantError::DuplicateCallback { name: type_name::<T>() }.into());
        }

        let index = component_id as usize;
        if self.hooks.len() <= index {
            self.hooks.resize_with(index + 1, || None);
        }
        self.hooks[index] = Some(Box::new(TypedHook::<T, F> { callback, _marker: PhantomData }));
        self.mask |= bit(component_id);
        Ok(())
    }

    pub(crate) fn invoke(
        &mut self,
        component_id: ComponentID,
        entity: EntityId,
        column: &dyn ErasedColumn,
        slot: SlotID,
    ) -> ECSResult<()> {
        match self.hooks.get_mut(component_id as usize) {
            Some(Some(hook)) => hook.invoke(entity, column, slot),
            _ => Ok(()),
        }
    }
}
