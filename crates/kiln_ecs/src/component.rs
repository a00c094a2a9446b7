//! Component storage
//!
//! Every component type lives in its own column, keyed by entity. Instances
//! sit behind a per-instance lock so queries can hand out shared and exclusive
//! borrows of different entities at the same time.
//!
//! Columns may be created by the host or by a plugin module, so they are
//! recovered from their erased form by [`ComponentTypeId`], never by `TypeId`.

use crate::entity::Entity;
use crate::error::{EcsError, Result};
use kiln_core::{ComponentTypeId, Erased, ReflectError};
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

/// Marker trait for component types. Any `Send + Sync + 'static` type qualifies.
pub trait Component: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Component for T {}

/// Shared borrow of a component
pub type Ref<'w, T> = RwLockReadGuard<'w, T>;

/// Exclusive borrow of a component
pub type Mut<'w, T> = RwLockWriteGuard<'w, T>;

/// Shared, type-erased borrow of a component
pub type ErasedRef<'w> = MappedRwLockReadGuard<'w, dyn Erased>;

pub(crate) fn read_cell<T: Component>(cell: &RwLock<T>, entity: Entity) -> Ref<'_, T> {
    match cell.try_read() {
        Some(guard) => guard,
        None => panic!(
            "component '{}' on entity {} is already mutably borrowed",
            std::any::type_name::<T>(),
            entity
        ),
    }
}

pub(crate) fn write_cell<T: Component>(cell: &RwLock<T>, entity: Entity) -> Mut<'_, T> {
    match cell.try_write() {
        Some(guard) => guard,
        None => panic!(
            "component '{}' on entity {} is already borrowed",
            std::any::type_name::<T>(),
            entity
        ),
    }
}

fn as_erased<T: Component>(value: &T) -> &dyn Erased {
    value
}

/// Storage for every instance of one component type
pub(crate) struct Column<T> {
    id: ComponentTypeId,
    cells: BTreeMap<Entity, RwLock<T>>,
}

impl<T: Component> Column<T> {
    pub fn new() -> Self {
        Self {
            id: ComponentTypeId::of::<T>(),
            cells: BTreeMap::new(),
        }
    }

    pub fn cell(&self, entity: Entity) -> Option<&RwLock<T>> {
        self.cells.get(&entity)
    }

    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.cells.get_mut(&entity).map(RwLock::get_mut)
    }

    /// Strict insert
    pub fn insert(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        match self.cells.entry(entity) {
            Entry::Occupied(_) => Err(EcsError::duplicate::<T>(entity)),
            Entry::Vacant(slot) => Ok(slot.insert(RwLock::new(value)).get_mut()),
        }
    }

    /// Insert or overwrite, returning the previous value
    pub fn replace(&mut self, entity: Entity, value: T) -> Option<T> {
        self.cells
            .insert(entity, RwLock::new(value))
            .map(RwLock::into_inner)
    }

    pub fn take(&mut self, entity: Entity) -> Option<T> {
        self.cells.remove(&entity).map(RwLock::into_inner)
    }
}

pub(crate) fn new_column<T: Component>() -> Box<dyn ErasedColumn> {
    Box::new(Column::<T>::new())
}

/// Type-erased view of a [`Column`]
pub(crate) trait ErasedColumn: Send + Sync {
    /// Identity of the stored component type
    fn component_type(&self) -> ComponentTypeId;
    fn contains(&self, entity: Entity) -> bool;
    fn len(&self) -> usize;
    /// Drop the entity's instance, if any
    fn remove(&mut self, entity: Entity) -> bool;
    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_>;
    fn insert_boxed(&mut self, entity: Entity, value: Box<dyn Erased>) -> Result<()>;
    fn read_erased(&self, entity: Entity) -> Option<ErasedRef<'_>>;
}

impl<T: Component> ErasedColumn for Column<T> {
    fn component_type(&self) -> ComponentTypeId {
        self.id
    }

    fn contains(&self, entity: Entity) -> bool {
        self.cells.contains_key(&entity)
    }

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn remove(&mut self, entity: Entity) -> bool {
        self.cells.remove(&entity).is_some()
    }

    fn entities(&self) -> Box<dyn Iterator<Item = Entity> + '_> {
        Box::new(self.cells.keys().copied())
    }

    fn insert_boxed(&mut self, entity: Entity, value: Box<dyn Erased>) -> Result<()> {
        let value = value.downcast::<T>().map_err(|_| {
            EcsError::Core(
                ReflectError::WrongComponentType {
                    expected: std::any::type_name::<T>().to_string(),
                }
                .into(),
            )
        })?;
        self.insert(entity, *value).map(|_| ())
    }

    fn read_erased(&self, entity: Entity) -> Option<ErasedRef<'_>> {
        let cell = self.cells.get(&entity)?;
        Some(RwLockReadGuard::map(read_cell(cell, entity), as_erased::<T>))
    }
}

/// Column lookup helpers shared by the world and queries
pub(crate) fn downcast_column<T: Component>(column: &dyn ErasedColumn) -> Option<&Column<T>> {
    if column.component_type() == type_id_of::<T>() {
        // SAFETY: a column reports the identity of the `T` it was created for
        Some(unsafe { &*(column as *const dyn ErasedColumn as *const Column<T>) })
    } else {
        None
    }
}

pub(crate) fn downcast_column_mut<T: Component>(column: &mut dyn ErasedColumn) -> Option<&mut Column<T>> {
    if column.component_type() == type_id_of::<T>() {
        // SAFETY: as in `downcast_column`
        Some(unsafe { &mut *(column as *mut dyn ErasedColumn as *mut Column<T>) })
    } else {
        None
    }
}

pub(crate) fn type_id_of<T: Component>() -> ComponentTypeId {
    ComponentTypeId::of::<T>()
}
