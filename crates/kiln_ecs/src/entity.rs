//! Entity identifiers

use kiln_core::{AttributeValue, ReflectError, Value, ValueKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// An opaque entity identifier.
///
/// Identifiers are allocated from a monotonic counter and never reused, so a
/// destroyed entity's id can never alias a live one.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Entity(u64);

impl Entity {
    /// The "no entity" value
    pub const NULL: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    #[inline]
    pub const fn to_bits(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "Entity(null)")
        } else {
            write!(f, "Entity({})", self.0)
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Entities serialize as their raw id, with null as `Value::Null`
impl AttributeValue for Entity {
    fn to_value(&self) -> Value {
        if self.is_null() {
            Value::Null
        } else {
            Value::from(self.0)
        }
    }

    fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
        if value.is_null() {
            *self = Self::NULL;
            return Ok(());
        }
        let id = match value.as_uint() {
            Some(id) => id,
            None => {
                return Err(match value.as_int() {
                    Some(negative) => ReflectError::OutOfRange {
                        value: negative.into(),
                        target: "Entity",
                    },
                    None => ReflectError::mismatch(ValueKind::Int, value.kind()),
                })
            }
        };
        *self = Self(id);
        Ok(())
    }

    fn value_kind() -> ValueKind {
        ValueKind::Int
    }

    fn remap_entities(&mut self, map: &mut dyn FnMut(u64) -> u64) {
        if !self.is_null() {
            self.0 = map(self.0);
        }
    }
}
