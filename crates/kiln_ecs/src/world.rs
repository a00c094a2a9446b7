//! World - Container for all ECS data
//!
//! The World owns every entity, component column, resource, the type registry
//! and the deferred command queue. It is the explicit context handed to every
//! function component and plugin entry point; there is no global state.

use crate::builder::EntityBuilder;
use crate::commands::{self, CommandQueue, CommandReport, Commands};
use crate::component::{
    downcast_column, downcast_column_mut, new_column, read_cell, type_id_of, write_cell, Column, Component,
    ErasedColumn, ErasedRef, Mut, Ref,
};
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::query::{Query, QueryParam};
use kiln_core::{ComponentTypeId, CoreError, Erased, IdGenerator, Reflect, TypeDescriptor, TypeRegistry};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

type ColumnFactory = fn() -> Box<dyn ErasedColumn>;

/// Resource storage, keyed like component columns so a plugin module and the
/// host find the same resource
#[derive(Default)]
struct Resources {
    data: BTreeMap<ComponentTypeId, Box<dyn Erased>>,
}

impl Resources {
    fn insert<R: Send + Sync + 'static>(&mut self, resource: R) -> Option<R> {
        self.data
            .insert(ComponentTypeId::of::<R>(), Box::new(resource))
            .and_then(|boxed| boxed.downcast::<R>().ok())
            .map(|b| *b)
    }

    fn remove<R: Send + Sync + 'static>(&mut self) -> Option<R> {
        self.data
            .remove(&ComponentTypeId::of::<R>())
            .and_then(|boxed| boxed.downcast::<R>().ok())
            .map(|b| *b)
    }

    fn get<R: Send + Sync + 'static>(&self) -> Option<&R> {
        self.data
            .get(&ComponentTypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_ref::<R>())
    }

    fn get_mut<R: Send + Sync + 'static>(&mut self) -> Option<&mut R> {
        self.data
            .get_mut(&ComponentTypeId::of::<R>())
            .and_then(|boxed| boxed.downcast_mut::<R>())
    }
}

/// The ECS World
pub struct World {
    ids: IdGenerator,
    entities: BTreeSet<Entity>,
    columns: HashMap<ComponentTypeId, Box<dyn ErasedColumn>>,
    factories: HashMap<ComponentTypeId, ColumnFactory>,
    registry: TypeRegistry,
    resources: Resources,
    commands: CommandQueue,
}

impl World {
    /// Create a new empty world
    pub fn new() -> Self {
        Self {
            ids: IdGenerator::new(),
            entities: BTreeSet::new(),
            columns: HashMap::new(),
            factories: HashMap::new(),
            registry: TypeRegistry::new(),
            resources: Resources::default(),
            commands: CommandQueue::new(),
        }
    }

    // ========== Type Registration ==========

    /// Register a reflected component type with the world's registry.
    ///
    /// Idempotent: registering twice returns the same descriptor. Registered
    /// types can also be attached in type-erased form, see
    /// [`attach_erased`](Self::attach_erased).
    pub fn register_type<T: Reflect>(&mut self) -> Result<Arc<TypeDescriptor>> {
        let descriptor = self.registry.register::<T>()?;
        self.factories.entry(descriptor.id()).or_insert(new_column::<T>);
        Ok(descriptor)
    }

    /// The world's type registry
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    // ========== Entity Management ==========

    pub(crate) fn reserve_entity(&self) -> Entity {
        Entity::from_bits(self.ids.next())
    }

    /// Create an entity with no components
    pub fn spawn(&mut self) -> Entity {
        let entity = self.reserve_entity();
        self.entities.insert(entity);
        entity
    }

    /// Create an entity and populate it through `build`.
    ///
    /// The builder runs synchronously before the entity becomes visible. If
    /// it returns an error, nothing is committed and the error propagates.
    ///
    /// # Example
    ///
    /// ```
    /// use kiln_ecs::World;
    ///
    /// struct Name(&'static str);
    ///
    /// let mut world = World::new();
    /// let e = world
    ///     .create(|builder| {
    ///         builder.attach(Name("crate"))?;
    ///         Ok(())
    ///     })
    ///     .unwrap();
    /// assert_eq!(world.get::<Name>(e).unwrap().0, "crate");
    /// ```
    pub fn create<B>(&mut self, build: B) -> Result<Entity>
    where
        B: FnOnce(&mut EntityBuilder) -> Result<()>,
    {
        let entity = self.reserve_entity();
        self.create_reserved(entity, build)
    }

    pub(crate) fn create_reserved<B>(&mut self, entity: Entity, build: B) -> Result<Entity>
    where
        B: FnOnce(&mut EntityBuilder) -> Result<()>,
    {
        let mut builder = EntityBuilder::new(entity);
        if let Err(err) = build(&mut builder) {
            log::debug!("Builder for {} failed, nothing committed: {}", entity, err);
            return Err(err);
        }
        self.entities.insert(entity);
        if let Err(err) = builder.commit(self) {
            self.remove_components(entity);
            self.entities.remove(&entity);
            return Err(err);
        }
        Ok(entity)
    }

    /// Destroy an entity, dropping all of its components.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] if the entity is not alive.
    pub fn destroy(&mut self, entity: Entity) -> Result<()> {
        if !self.entities.remove(&entity) {
            return Err(EcsError::UnknownEntity(entity));
        }
        self.remove_components(entity);
        log::trace!("Destroyed {}", entity);
        Ok(())
    }

    fn remove_components(&mut self, entity: Entity) {
        for column in self.columns.values_mut() {
            column.remove(entity);
        }
    }

    /// Check if an entity is alive
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    fn ensure_alive(&self, entity: Entity) -> Result<()> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::UnknownEntity(entity))
        }
    }

    /// Number of live entities
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Live entities in ascending id order
    pub fn entities(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Destroy every entity. Registered types, resources and the id counter
    /// are kept.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.columns.clear();
    }

    // ========== Component Access ==========

    pub(crate) fn column<T: Component>(&self) -> Option<&Column<T>> {
        self.columns
            .get(&type_id_of::<T>())
            .and_then(|column| downcast_column::<T>(column.as_ref()))
    }

    fn column_mut<T: Component>(&mut self) -> Option<&mut Column<T>> {
        self.columns
            .get_mut(&type_id_of::<T>())
            .and_then(|column| downcast_column_mut::<T>(column.as_mut()))
    }

    pub(crate) fn column_by_id(&self, id: ComponentTypeId) -> Option<&dyn ErasedColumn> {
        self.columns.get(&id).map(|column| column.as_ref())
    }

    pub(crate) fn column_entry(&mut self, id: ComponentTypeId, factory: ColumnFactory) -> &mut dyn ErasedColumn {
        self.columns.entry(id).or_insert_with(factory).as_mut()
    }

    fn typed_column_entry<T: Component>(&mut self) -> Result<&mut Column<T>> {
        let column = self.column_entry(type_id_of::<T>(), new_column::<T>);
        downcast_column_mut::<T>(column).ok_or_else(|| CoreError::not_registered(std::any::type_name::<T>()).into())
    }

    /// Attach a component. Strict: the component must not already be present.
    ///
    /// Use [`get_or_attach_with`](Self::get_or_attach_with) for
    /// get-or-create, or [`replace`](Self::replace) to overwrite.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if the entity is not alive
    /// - [`EcsError::DuplicateComponent`] if `T` is already attached
    pub fn attach<T: Component>(&mut self, entity: Entity, value: T) -> Result<&mut T> {
        self.ensure_alive(entity)?;
        self.typed_column_entry::<T>()?.insert(entity, value)
    }

    /// Get `T`, attaching `init()` first if it is absent
    pub fn get_or_attach_with<T, F>(&mut self, entity: Entity, init: F) -> Result<&mut T>
    where
        T: Component,
        F: FnOnce() -> T,
    {
        self.ensure_alive(entity)?;
        let column = self.typed_column_entry::<T>()?;
        if !column.contains(entity) {
            column.insert(entity, init())?;
        }
        column.get_mut(entity).ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Attach or overwrite `T`, returning the previous value
    pub fn replace<T: Component>(&mut self, entity: Entity, value: T) -> Result<Option<T>> {
        self.ensure_alive(entity)?;
        Ok(self.typed_column_entry::<T>()?.replace(entity, value))
    }

    /// Attach a type-erased component of a registered type
    pub fn attach_erased(
        &mut self,
        entity: Entity,
        id: ComponentTypeId,
        value: Box<dyn Erased>,
    ) -> Result<()> {
        self.ensure_alive(entity)?;
        let factory = *self
            .factories
            .get(&id)
            .ok_or_else(|| CoreError::not_registered(id.to_string()))?;
        self.column_entry(id, factory).insert_boxed(entity, value)
    }

    /// Detach and return a component.
    ///
    /// # Errors
    ///
    /// - [`EcsError::UnknownEntity`] if the entity is not alive
    /// - [`EcsError::ComponentMissing`] if `T` is not attached
    pub fn detach<T: Component>(&mut self, entity: Entity) -> Result<T> {
        self.ensure_alive(entity)?;
        self.column_mut::<T>()
            .and_then(|column| column.take(entity))
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Whether the entity carries `T`.
    ///
    /// # Errors
    ///
    /// [`EcsError::UnknownEntity`] for a dead or never-created id.
    pub fn has<T: Component>(&self, entity: Entity) -> Result<bool> {
        self.ensure_alive(entity)?;
        Ok(self.contains::<T>(entity))
    }

    pub(crate) fn contains<T: Component>(&self, entity: Entity) -> bool {
        self.column::<T>().map_or(false, |column| column.contains(entity))
    }

    /// Borrow `T` if present
    pub fn try_get<T: Component>(&self, entity: Entity) -> Result<Option<Ref<'_, T>>> {
        self.ensure_alive(entity)?;
        Ok(self
            .column::<T>()
            .and_then(|column| column.cell(entity))
            .map(|cell| read_cell(cell, entity)))
    }

    /// Borrow `T`, which must be present
    pub fn get<T: Component>(&self, entity: Entity) -> Result<Ref<'_, T>> {
        self.try_get::<T>(entity)?
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Exclusively borrow `T` through a shared world borrow
    pub fn borrow_mut<T: Component>(&self, entity: Entity) -> Result<Mut<'_, T>> {
        self.ensure_alive(entity)?;
        self.column::<T>()
            .and_then(|column| column.cell(entity))
            .map(|cell| write_cell(cell, entity))
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Mutable access to `T`, which must be present
    pub fn get_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T> {
        self.ensure_alive(entity)?;
        self.column_mut::<T>()
            .and_then(|column| column.get_mut(entity))
            .ok_or_else(|| EcsError::missing::<T>(entity))
    }

    /// Type-erased shared borrow of a component
    pub fn get_erased(&self, entity: Entity, id: ComponentTypeId) -> Result<Option<ErasedRef<'_>>> {
        self.ensure_alive(entity)?;
        Ok(self.column_by_id(id).and_then(|column| column.read_erased(entity)))
    }

    /// Identities of every component attached to the entity
    pub fn component_types(&self, entity: Entity) -> Result<Vec<ComponentTypeId>> {
        self.ensure_alive(entity)?;
        let mut ids: Vec<_> = self
            .columns
            .iter()
            .filter(|(_, column)| column.contains(entity))
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    // ========== Resources ==========

    /// Insert a resource, returning the previous one of the same type
    pub fn insert_resource<R: Send + Sync + 'static>(&mut self, resource: R) -> Option<R> {
        self.resources.insert(resource)
    }

    /// Remove a resource
    pub fn remove_resource<R: Send + Sync + 'static>(&mut self) -> Option<R> {
        self.resources.remove()
    }

    /// Get a resource
    pub fn resource<R: Send + Sync + 'static>(&self) -> Option<&R> {
        self.resources.get()
    }

    /// Get a mutable resource
    pub fn resource_mut<R: Send + Sync + 'static>(&mut self) -> Option<&mut R> {
        self.resources.get_mut()
    }

    // ========== Queries ==========

    /// Start a query. See [`Query`].
    pub fn query<Q: QueryParam>(&self) -> Query<'_, Q> {
        Query::new(self)
    }

    // ========== Deferred Commands ==========

    /// Queue structural mutations while the world is shared
    pub fn commands(&self) -> Commands<'_> {
        Commands::new(self)
    }

    pub(crate) fn command_queue(&self) -> &CommandQueue {
        &self.commands
    }

    /// Number of queued commands
    pub fn pending_commands(&self) -> usize {
        self.commands.len()
    }

    /// Apply every queued mutation. Failures are logged and reported; they do
    /// not stop the drain.
    pub fn apply_commands(&mut self) -> CommandReport {
        commands::drain(self)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("columns", &self.columns.len())
            .field("registry", &self.registry)
            .field("pending_commands", &self.commands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq, Clone)]
    struct Position {
        x: f32,
        y: f32,
    }

    kiln_core::reflect!(Position { x, y });

    #[derive(Debug, PartialEq)]
    struct Velocity(f32);

    #[test]
    fn test_attach_then_get() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Position { x: 1.0, y: 2.0 }).unwrap();

        assert!(world.has::<Position>(e).unwrap());
        assert_eq!(*world.get::<Position>(e).unwrap(), Position { x: 1.0, y: 2.0 });
    }

    #[test]
    fn test_attach_is_strict() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Velocity(1.0)).unwrap();
        let err = world.attach(e, Velocity(2.0)).unwrap_err();
        assert!(matches!(err, EcsError::DuplicateComponent { .. }));
        assert_eq!(*world.get::<Velocity>(e).unwrap(), Velocity(1.0));
    }

    #[test]
    fn test_get_or_attach_with() {
        let mut world = World::new();
        let e = world.spawn();
        world.get_or_attach_with(e, || Velocity(1.0)).unwrap().0 += 1.0;
        world.get_or_attach_with(e, || Velocity(100.0)).unwrap().0 += 1.0;
        assert_eq!(*world.get::<Velocity>(e).unwrap(), Velocity(3.0));
    }

    #[test]
    fn test_replace() {
        let mut world = World::new();
        let e = world.spawn();
        assert_eq!(world.replace(e, Velocity(1.0)).unwrap(), None);
        assert_eq!(world.replace(e, Velocity(2.0)).unwrap(), Some(Velocity(1.0)));
    }

    #[test]
    fn test_missing_component() {
        let mut world = World::new();
        let e = world.spawn();
        assert!(world.try_get::<Velocity>(e).unwrap().is_none());
        assert!(matches!(world.get::<Velocity>(e), Err(EcsError::ComponentMissing { .. })));
        assert!(matches!(world.detach::<Velocity>(e), Err(EcsError::ComponentMissing { .. })));
        assert!(!world.has::<Velocity>(e).unwrap());
    }

    #[test]
    fn test_detach_returns_value() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Velocity(4.0)).unwrap();
        assert_eq!(world.detach::<Velocity>(e).unwrap(), Velocity(4.0));
        assert!(!world.has::<Velocity>(e).unwrap());
    }

    #[test]
    fn test_destroyed_entity_faults() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Velocity(1.0)).unwrap();
        world.destroy(e).unwrap();

        assert!(!world.is_alive(e));
        assert_eq!(world.has::<Velocity>(e), Err(EcsError::UnknownEntity(e)));
        assert_eq!(world.destroy(e), Err(EcsError::UnknownEntity(e)));
        assert!(matches!(world.attach(e, Velocity(1.0)), Err(EcsError::UnknownEntity(_))));
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut world = World::new();
        let a = world.spawn();
        world.destroy(a).unwrap();
        let b = world.spawn();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_failed_builder_commits_nothing() {
        let mut world = World::new();
        let result = world.create(|builder| {
            builder.attach(Velocity(1.0))?;
            Err(EcsError::builder("missing mesh"))
        });
        assert!(matches!(result, Err(EcsError::Builder(_))));
        assert!(world.is_empty());
        assert_eq!(world.query::<&Velocity>().count(), 0);
    }

    #[test]
    fn test_builder_rejects_duplicate() {
        let mut world = World::new();
        let result = world.create(|builder| {
            builder.attach(Velocity(1.0))?.attach(Velocity(2.0))?;
            Ok(())
        });
        assert!(matches!(result, Err(EcsError::DuplicateComponent { .. })));
        assert!(world.is_empty());
    }

    #[test]
    fn test_register_type_enables_erased_attach() {
        let mut world = World::new();
        let descriptor = world.register_type::<Position>().unwrap();
        let e = world.spawn();

        let mut value = descriptor.construct();
        descriptor
            .attribute("x")
            .unwrap()
            .write(&mut *value, &kiln_core::Value::Float(3.0))
            .unwrap();
        world.attach_erased(e, descriptor.id(), value).unwrap();

        assert_eq!(world.get::<Position>(e).unwrap().x, 3.0);
        let erased = world.get_erased(e, descriptor.id()).unwrap().unwrap();
        assert!(erased.downcast_ref::<Position>().is_some());
    }

    #[test]
    fn test_erased_attach_requires_registration() {
        let mut world = World::new();
        let e = world.spawn();
        let err = world
            .attach_erased(e, ComponentTypeId::of::<Velocity>(), Box::new(Velocity(1.0)))
            .unwrap_err();
        assert!(matches!(err, EcsError::Core(CoreError::NotRegistered(_))));
    }

    #[test]
    fn test_component_types() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Velocity(1.0)).unwrap();
        world.attach(e, Position::default()).unwrap();
        let types = world.component_types(e).unwrap();
        assert_eq!(types.len(), 2);
        assert!(types.contains(&ComponentTypeId::of::<Velocity>()));
    }

    #[test]
    fn test_resources() {
        let mut world = World::new();
        assert!(world.insert_resource(5u32).is_none());
        assert_eq!(world.insert_resource(6u32), Some(5));
        *world.resource_mut::<u32>().unwrap() += 1;
        assert_eq!(world.resource::<u32>(), Some(&7));
        assert_eq!(world.remove_resource::<u32>(), Some(7));
        assert!(world.resource::<u32>().is_none());
    }

    #[test]
    fn test_clear_keeps_registry() {
        let mut world = World::new();
        world.register_type::<Position>().unwrap();
        let e = world.spawn();
        world.attach(e, Position::default()).unwrap();
        world.clear();
        assert!(world.is_empty());
        assert!(world.registry().contains::<Position>());
        assert!(world.query::<&Position>().is_empty());
    }
}
