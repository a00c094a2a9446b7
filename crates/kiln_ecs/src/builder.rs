//! Staged entity construction

use crate::component::{downcast_column_mut, new_column, type_id_of, Component};
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::World;
use kiln_core::ComponentTypeId;

type StagedInsert = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

/// Collects components for an entity that is not yet visible.
///
/// Nothing reaches the world until the builder callback returns `Ok`, so a
/// failing builder leaves no trace beyond a burned id.
pub struct EntityBuilder {
    entity: Entity,
    staged: Vec<(ComponentTypeId, StagedInsert)>,
}

impl EntityBuilder {
    pub(crate) fn new(entity: Entity) -> Self {
        Self {
            entity,
            staged: Vec::new(),
        }
    }

    /// The id the entity will have once committed
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Stage a component.
    ///
    /// # Errors
    ///
    /// [`EcsError::DuplicateComponent`] if `T` is already staged.
    pub fn attach<T: Component>(&mut self, value: T) -> Result<&mut Self> {
        let id = type_id_of::<T>();
        if self.has::<T>() {
            return Err(EcsError::duplicate::<T>(self.entity));
        }
        let entity = self.entity;
        self.staged.push((
            id,
            Box::new(move |world: &mut World| {
                let column = world.column_entry(id, new_column::<T>);
                match downcast_column_mut::<T>(column) {
                    Some(column) => column.insert(entity, value).map(|_| ()),
                    None => Err(EcsError::missing::<T>(entity)),
                }
            }),
        ));
        Ok(self)
    }

    /// Whether `T` has been staged
    pub fn has<T: Component>(&self) -> bool {
        let id = type_id_of::<T>();
        self.staged.iter().any(|(staged, _)| *staged == id)
    }

    /// Number of staged components
    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    pub(crate) fn commit(self, world: &mut World) -> Result<()> {
        for (_, insert) in self.staged {
            insert(world)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for EntityBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityBuilder")
            .field("entity", &self.entity)
            .field("staged", &self.staged.len())
            .finish()
    }
}
