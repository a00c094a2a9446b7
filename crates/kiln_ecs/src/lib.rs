//! # kiln_ecs - Entity Component System
//!
//! The entity store at the heart of Kiln:
//!
//! ```text
//! ┌────────────────────────── World ───────────────────────────┐
//! │  entities      columns (one per component type)            │
//! │  #0 #1 #2 ...  Position: {#0, #2}  Execute: {#1}  ...       │
//! │                                                             │
//! │  TypeRegistry   resources   CommandQueue (deferred ops)     │
//! └─────────────────────────────────────────────────────────────┘
//!         ▲ query / attach / detach          ▲ commands()
//!         │                                  │
//!   function components (Execute, OnClick, ...) and plugins
//! ```
//!
//! - Entities are plain ids, never reused after destruction
//! - Any `Send + Sync + 'static` type is a component
//! - Queries are lazy, filterable with `with` / `without`
//! - Behavior is attached as function components and dispatched by query
//! - Structural changes during a pass go through [`World::commands`] and are
//!   applied by [`World::apply_commands`]

pub mod builder;
pub mod commands;
pub mod component;
pub mod entity;
pub mod error;
pub mod function;
pub mod query;
pub mod world;

pub use builder::EntityBuilder;
pub use commands::{CommandQueue, CommandReport, Commands};
pub use component::{Component, ErasedRef, Mut, Ref};
pub use entity::Entity;
pub use error::{EcsError, Result};
pub use query::{Query, QueryIter, QueryParam};
pub use world::World;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::builder::EntityBuilder;
    pub use crate::commands::{CommandReport, Commands};
    pub use crate::component::{Component, Mut, Ref};
    pub use crate::entity::Entity;
    pub use crate::error::{EcsError, Result};
    pub use crate::function::{
        DrawGizmos, Execute, GetEntityInPixel, Mat4, OnClick, OnMouseButton, OnMouseMove, OnScroll, OnTerminate,
    };
    pub use crate::query::Query;
    pub use crate::world::World;
    pub use kiln_core::prelude::*;
}
