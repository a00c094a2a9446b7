//! Error types for the entity store

use crate::entity::Entity;
use kiln_core::CoreError;
use thiserror::Error;

/// Result type for entity store operations
pub type Result<T> = std::result::Result<T, EcsError>;

/// Errors that can occur when manipulating the world
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EcsError {
    /// The entity was never created, or has been destroyed
    #[error("Entity {0} does not exist")]
    UnknownEntity(Entity),

    /// A required component is not attached
    #[error("Entity {entity} has no '{component}' component")]
    ComponentMissing {
        entity: Entity,
        component: &'static str,
    },

    /// `attach` found the component already present
    #[error("Entity {entity} already has a '{component}' component")]
    DuplicateComponent {
        entity: Entity,
        component: &'static str,
    },

    /// A builder passed to `create` gave up
    #[error("Entity builder failed: {0}")]
    Builder(String),

    /// Type registry or reflection failure
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl EcsError {
    pub fn missing<T: ?Sized>(entity: Entity) -> Self {
        Self::ComponentMissing {
            entity,
            component: std::any::type_name::<T>(),
        }
    }

    pub fn duplicate<T: ?Sized>(entity: Entity) -> Self {
        Self::DuplicateComponent {
            entity,
            component: std::any::type_name::<T>(),
        }
    }

    /// Create a builder error
    pub fn builder(message: impl Into<String>) -> Self {
        Self::Builder(message.into())
    }
}
