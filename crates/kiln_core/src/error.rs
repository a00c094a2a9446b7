//! Error types for type registration and reflection

use crate::value::ValueKind;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised by the type registry
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// The type was never registered with this registry
    #[error("Component type '{0}' is not registered")]
    NotRegistered(String),

    /// Two distinct types asked for the same display name
    #[error("Component name '{name}' is already registered by '{existing}'")]
    NameConflict { name: String, existing: String },

    /// Reading or writing an attribute failed
    #[error(transparent)]
    Reflect(#[from] ReflectError),
}

impl CoreError {
    /// Create a not-registered error
    pub fn not_registered(name: impl Into<String>) -> Self {
        Self::NotRegistered(name.into())
    }
}

/// Errors raised while moving values in and out of reflected attributes
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReflectError {
    /// The value has the wrong shape for the attribute
    #[error("Expected {expected} value, found {found}")]
    TypeMismatch { expected: ValueKind, found: ValueKind },

    /// An integer does not fit the attribute's width
    #[error("Integer {value} is out of range for {target}")]
    OutOfRange { value: i128, target: &'static str },

    /// A fixed-size attribute received the wrong number of elements
    #[error("Expected {expected} elements, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    /// No attribute with that name is declared on the component
    #[error("Unknown attribute '{attribute}' on '{component}'")]
    UnknownAttribute { component: String, attribute: String },

    /// A named attribute failed to convert
    #[error("Attribute '{attribute}': {source}")]
    Attribute {
        attribute: String,
        #[source]
        source: Box<ReflectError>,
    },

    /// The erased value is not an instance of the described type
    #[error("Value is not a '{expected}' component")]
    WrongComponentType { expected: String },
}

impl ReflectError {
    /// Create a type mismatch error
    pub fn mismatch(expected: ValueKind, found: ValueKind) -> Self {
        Self::TypeMismatch { expected, found }
    }

    /// Attach the attribute name to a conversion error
    pub fn in_attribute(self, attribute: impl Into<String>) -> Self {
        Self::Attribute {
            attribute: attribute.into(),
            source: Box::new(self),
        }
    }
}
