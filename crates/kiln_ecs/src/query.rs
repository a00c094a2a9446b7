//! Query - Lazy traversal of entities with specific components
//!
//! ```
//! use kiln_ecs::World;
//!
//! struct Position(f32);
//! struct Velocity(f32);
//! struct Frozen;
//!
//! let mut world = World::new();
//! let e = world.spawn();
//! world.attach(e, Position(0.0)).unwrap();
//! world.attach(e, Velocity(2.0)).unwrap();
//!
//! for (_, (mut pos, vel)) in world.query::<(&mut Position, &Velocity)>().without::<Frozen>() {
//!     pos.0 += vel.0;
//! }
//! assert_eq!(world.get::<Position>(e).unwrap().0, 2.0);
//! ```
//!
//! Results are unordered unless sorted by the caller through
//! [`Query::sorted_by`].
//!
//! Items are lock guards. Asking for an exclusive borrow of an instance that
//! is already borrowed (for example `&mut A` in a nested query over `&A`)
//! panics with a message naming the component.

use crate::component::{read_cell, type_id_of, write_cell, Component, ErasedColumn, Mut, Ref};
use crate::entity::Entity;
use crate::world::World;
use kiln_core::ComponentTypeId;
use std::cmp::Ordering;
use std::marker::PhantomData;

/// Something a query can fetch for each matching entity
pub trait QueryParam {
    /// What the query yields per entity
    type Item<'w>;

    /// Component types the entity must carry
    fn required(out: &mut Vec<ComponentTypeId>);

    /// Fetch the item for `entity`, or `None` if a component is absent
    fn fetch(world: &World, entity: Entity) -> Option<Self::Item<'_>>;
}

impl<'a, T: Component> QueryParam for &'a T {
    type Item<'w> = Ref<'w, T>;

    fn required(out: &mut Vec<ComponentTypeId>) {
        out.push(type_id_of::<T>());
    }

    fn fetch(world: &World, entity: Entity) -> Option<Self::Item<'_>> {
        let cell = world.column::<T>()?.cell(entity)?;
        Some(read_cell(cell, entity))
    }
}

impl<'a, T: Component> QueryParam for &'a mut T {
    type Item<'w> = Mut<'w, T>;

    fn required(out: &mut Vec<ComponentTypeId>) {
        out.push(type_id_of::<T>());
    }

    fn fetch(world: &World, entity: Entity) -> Option<Self::Item<'_>> {
        let cell = world.column::<T>()?.cell(entity)?;
        Some(write_cell(cell, entity))
    }
}

macro_rules! impl_query_tuple {
    ($($name:ident),*) => {
        impl<$($name: QueryParam),*> QueryParam for ($($name,)*) {
            type Item<'w> = ($($name::Item<'w>,)*);

            #[allow(unused_variables)]
            fn required(out: &mut Vec<ComponentTypeId>) {
                $($name::required(out);)*
            }

            #[allow(unused_variables)]
            fn fetch(world: &World, entity: Entity) -> Option<Self::Item<'_>> {
                Some(($($name::fetch(world, entity)?,)*))
            }
        }
    };
}

impl_query_tuple!();
impl_query_tuple!(A);
impl_query_tuple!(A, B);
impl_query_tuple!(A, B, C);
impl_query_tuple!(A, B, C, D);
impl_query_tuple!(A, B, C, D, E);
impl_query_tuple!(A, B, C, D, E, F);
impl_query_tuple!(A, B, C, D, E, F, G);
impl_query_tuple!(A, B, C, D, E, F, G, H);

/// A query over a world, with optional inclusion and exclusion filters
pub struct Query<'w, Q: QueryParam> {
    world: &'w World,
    with: Vec<ComponentTypeId>,
    without: Vec<ComponentTypeId>,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: QueryParam> Query<'w, Q> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self {
            world,
            with: Vec::new(),
            without: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Require `T` without fetching it
    pub fn with<T: Component>(mut self) -> Self {
        self.with.push(type_id_of::<T>());
        self
    }

    /// Skip entities carrying `T`
    pub fn without<T: Component>(mut self) -> Self {
        self.without.push(type_id_of::<T>());
        self
    }

    /// Iterate lazily over matching entities
    pub fn iter(&self) -> QueryIter<'w, Q> {
        let mut required = Vec::new();
        Q::required(&mut required);
        required.extend(self.with.iter().copied());

        let world = self.world;
        let mut required_columns = Vec::with_capacity(required.len());
        for id in &required {
            match world.column_by_id(*id) {
                Some(column) => required_columns.push(column),
                // A required type with no storage matches nothing
                None => return QueryIter::empty(world),
            }
        }
        let excluded_columns = self
            .without
            .iter()
            .filter_map(|id| world.column_by_id(*id))
            .collect();

        // Drive the walk from the smallest required column
        let smallest = required_columns.iter().min_by_key(|column| column.len()).copied();
        let candidates: Box<dyn Iterator<Item = Entity> + 'w> = match smallest {
            Some(column) => column.entities(),
            None => Box::new(world.entities()),
        };

        QueryIter {
            world,
            candidates,
            required: required_columns,
            excluded: excluded_columns,
            _marker: PhantomData,
        }
    }

    /// Matching entity ids, without borrowing any component
    pub fn entities(&self) -> Vec<Entity> {
        let mut iter = self.iter();
        let mut found = Vec::new();
        while let Some(entity) = iter.next_match() {
            found.push(entity);
        }
        found
    }

    /// Number of matching entities
    pub fn count(&self) -> usize {
        let mut iter = self.iter();
        let mut count = 0;
        while iter.next_match().is_some() {
            count += 1;
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next_match().is_none()
    }

    /// Collect every match and sort it with `compare`
    pub fn sorted_by<F>(&self, mut compare: F) -> Vec<(Entity, Q::Item<'w>)>
    where
        F: FnMut(&Q::Item<'w>, &Q::Item<'w>) -> Ordering,
    {
        let mut matches: Vec<_> = self.iter().collect();
        matches.sort_by(|a, b| compare(&a.1, &b.1));
        matches
    }
}

impl<'w, Q: QueryParam> IntoIterator for Query<'w, Q> {
    type Item = (Entity, Q::Item<'w>);
    type IntoIter = QueryIter<'w, Q>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over query matches
pub struct QueryIter<'w, Q: QueryParam> {
    world: &'w World,
    candidates: Box<dyn Iterator<Item = Entity> + 'w>,
    required: Vec<&'w dyn ErasedColumn>,
    excluded: Vec<&'w dyn ErasedColumn>,
    _marker: PhantomData<fn() -> Q>,
}

impl<'w, Q: QueryParam> QueryIter<'w, Q> {
    fn empty(world: &'w World) -> Self {
        Self {
            world,
            candidates: Box::new(std::iter::empty()),
            required: Vec::new(),
            excluded: Vec::new(),
            _marker: PhantomData,
        }
    }

    fn matches(&self, entity: Entity) -> bool {
        self.required.iter().all(|column| column.contains(entity))
            && !self.excluded.iter().any(|column| column.contains(entity))
    }

    fn next_match(&mut self) -> Option<Entity> {
        loop {
            let entity = self.candidates.next()?;
            if self.matches(entity) {
                return Some(entity);
            }
        }
    }
}

impl<'w, Q: QueryParam> Iterator for QueryIter<'w, Q> {
    type Item = (Entity, Q::Item<'w>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entity = self.next_match()?;
            if let Some(item) = Q::fetch(self.world, entity) {
                return Some((entity, item));
            }
        }
    }
}
