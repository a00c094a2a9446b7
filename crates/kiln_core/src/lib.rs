//! # kiln_core - Kiln Core
//!
//! Type identity and reflection primitives shared by the world, the plugin
//! loader and anything that serializes or inspects components:
//! - **Identity**: [`ComponentTypeId`] is derived from the type path, so the
//!   host and every plugin module agree on it without coordination.
//!   [`Erased`] values downcast through it rather than `TypeId`
//! - **Reflection**: [`Reflect`] lists a type's attributes once, in
//!   declaration order, through the [`reflect!`] macro
//! - **Registry**: [`TypeRegistry`] hands out one immutable
//!   [`TypeDescriptor`] per registered type
//!
//! ## Example
//!
//! ```
//! use kiln_core::prelude::*;
//!
//! #[derive(Default)]
//! struct Health {
//!     current: f32,
//!     max: f32,
//! }
//!
//! kiln_core::reflect!(Health { current, max });
//!
//! let mut registry = TypeRegistry::new();
//! let descriptor = registry.register::<Health>().unwrap();
//! assert_eq!(descriptor.name(), "Health");
//! assert_eq!(descriptor.attributes().len(), 2);
//! ```

pub mod erased;
pub mod error;
pub mod id;
pub mod reflect;
pub mod type_registry;
pub mod value;

pub use erased::*;
pub use error::*;
pub use id::*;
pub use reflect::*;
pub use type_registry::*;
pub use value::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::erased::Erased;
    pub use crate::error::{CoreError, ReflectError, Result};
    pub use crate::id::{ComponentTypeId, IdGenerator};
    pub use crate::reflect::{AttributeDescriptor, AttributeValue, Reflect};
    pub use crate::type_registry::{TypeDescriptor, TypeRegistry};
    pub use crate::value::{Value, ValueKind};
}
