//! Attribute reflection
//!
//! A component type opts into reflection by implementing [`Reflect`], usually
//! through the [`reflect!`](crate::reflect!) macro. The attribute list it
//! returns drives scene serialization and editor inspection; nothing else in
//! the engine needs to know the concrete field layout.

use crate::erased::{AsErased, Erased};
use crate::error::ReflectError;
use crate::id::ComponentTypeId;
use crate::value::{Value, ValueKind};
use std::fmt;

/// A field type that can be read into and written from a [`Value`]
pub trait AttributeValue: AsErased {
    /// Snapshot the field as a generic value
    fn to_value(&self) -> Value;

    /// Overwrite the field from a generic value. On error the field is untouched.
    fn apply(&mut self, value: &Value) -> Result<(), ReflectError>;

    /// The value shape this field reads and writes
    fn value_kind() -> ValueKind
    where
        Self: Sized;

    /// Rewrite the entity ids this field refers to. Only entity handles and
    /// containers of them hold any; everything else keeps the default no-op.
    fn remap_entities(&mut self, _map: &mut dyn FnMut(u64) -> u64) {}
}

impl dyn AttributeValue {
    /// Typed view of the attribute
    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.as_erased().downcast_ref::<T>()
    }

    /// Typed mutable view of the attribute
    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.as_erased_mut().downcast_mut::<T>()
    }
}

/// A component type with a declared, ordered attribute list
pub trait Reflect: Default + Send + Sync + 'static {
    /// Display name used by registries and serialized documents
    fn type_name() -> &'static str;

    /// Attributes in declaration order
    fn attributes() -> Vec<AttributeDescriptor>;
}

/// One named, typed field of a reflected component
pub struct AttributeDescriptor {
    name: &'static str,
    kind: ValueKind,
    owner: ComponentTypeId,
    accessor: Box<dyn ErasedAccessor>,
}

impl AttributeDescriptor {
    /// Describe the field reached through `get` / `get_mut` on component `C`
    pub fn new<C, F>(name: &'static str, get: fn(&C) -> &F, get_mut: fn(&mut C) -> &mut F) -> Self
    where
        C: Send + Sync + 'static,
        F: AttributeValue,
    {
        Self {
            name,
            kind: F::value_kind(),
            owner: ComponentTypeId::of::<C>(),
            accessor: Box::new(FieldAccessor { get, get_mut }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Whether this attribute belongs to `component`'s type
    pub fn applies_to(&self, component: &dyn Erased) -> bool {
        component.component_type_id() == self.owner
    }

    /// Borrow the field. `None` if `component` is not the owning type.
    pub fn get<'a>(&self, component: &'a dyn Erased) -> Option<&'a dyn AttributeValue> {
        self.accessor.get(component)
    }

    /// Mutably borrow the field. `None` if `component` is not the owning type.
    pub fn get_mut<'a>(&self, component: &'a mut dyn Erased) -> Option<&'a mut dyn AttributeValue> {
        self.accessor.get_mut(component)
    }

    /// Read the field as a generic value
    pub fn read(&self, component: &dyn Erased) -> Option<Value> {
        self.get(component).map(|field| field.to_value())
    }

    /// Write the field from a generic value
    pub fn write(&self, component: &mut dyn Erased, value: &Value) -> Result<(), ReflectError> {
        let field = self
            .get_mut(component)
            .ok_or_else(|| ReflectError::WrongComponentType {
                expected: format!("owner of '{}'", self.name),
            })?;
        field.apply(value).map_err(|e| e.in_attribute(self.name))
    }
}

impl fmt::Debug for AttributeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

trait ErasedAccessor: Send + Sync {
    fn get<'a>(&self, component: &'a dyn Erased) -> Option<&'a dyn AttributeValue>;
    fn get_mut<'a>(&self, component: &'a mut dyn Erased) -> Option<&'a mut dyn AttributeValue>;
}

struct FieldAccessor<C, F> {
    get: fn(&C) -> &F,
    get_mut: fn(&mut C) -> &mut F,
}

impl<C, F> ErasedAccessor for FieldAccessor<C, F>
where
    C: Send + Sync + 'static,
    F: AttributeValue,
{
    fn get<'a>(&self, component: &'a dyn Erased) -> Option<&'a dyn AttributeValue> {
        let component = component.downcast_ref::<C>()?;
        Some((self.get)(component))
    }

    fn get_mut<'a>(&self, component: &'a mut dyn Erased) -> Option<&'a mut dyn AttributeValue> {
        let component = component.downcast_mut::<C>()?;
        Some((self.get_mut)(component))
    }
}

/// Implement [`Reflect`] for a struct by listing its attribute fields.
///
/// ```
/// #[derive(Default)]
/// struct Transform {
///     position: [f32; 3],
///     scale: f32,
/// }
///
/// kiln_core::reflect!(Transform { position, scale });
///
/// #[derive(Default)]
/// struct Tag;
///
/// kiln_core::reflect!(Tag as "EditorTag" {});
/// ```
#[macro_export]
macro_rules! reflect {
    (@impl $ty:ident, $name:expr, $($field:ident),*) => {
        impl $crate::Reflect for $ty {
            fn type_name() -> &'static str {
                $name
            }

            fn attributes() -> ::std::vec::Vec<$crate::AttributeDescriptor> {
                ::std::vec![
                    $(
                        $crate::AttributeDescriptor::new(
                            stringify!($field),
                            |c: &$ty| &c.$field,
                            |c: &mut $ty| &mut c.$field,
                        )
                    ),*
                ]
            }
        }
    };
    ($ty:ident as $name:literal { $($field:ident),* $(,)? }) => {
        $crate::reflect!(@impl $ty, $name, $($field),*);
    };
    ($ty:ident { $($field:ident),* $(,)? }) => {
        $crate::reflect!(@impl $ty, stringify!($ty), $($field),*);
    };
}

// ========== AttributeValue implementations ==========

macro_rules! impl_int_attribute {
    ($($t:ty),*) => {
        $(
            impl AttributeValue for $t {
                fn to_value(&self) -> Value {
                    match i64::try_from(*self) {
                        Ok(n) => Value::Int(n),
                        // Only unsigned values above i64::MAX get here
                        Err(_) => Value::UInt(*self as u64),
                    }
                }

                fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
                    let wide = match value {
                        Value::UInt(n) => i128::from(*n),
                        _ => value
                            .as_int()
                            .map(i128::from)
                            .ok_or_else(|| ReflectError::mismatch(ValueKind::Int, value.kind()))?,
                    };
                    *self = <$t>::try_from(wide).map_err(|_| ReflectError::OutOfRange {
                        value: wide,
                        target: stringify!($t),
                    })?;
                    Ok(())
                }

                fn value_kind() -> ValueKind {
                    ValueKind::Int
                }
            }
        )*
    };
}

impl_int_attribute!(i8, i16, i32, i64, u8, u16, u32, u64, isize, usize);

macro_rules! impl_float_attribute {
    ($($t:ty),*) => {
        $(
            impl AttributeValue for $t {
                fn to_value(&self) -> Value {
                    Value::Float(*self as f64)
                }

                fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
                    let f = value
                        .as_float()
                        .ok_or_else(|| ReflectError::mismatch(ValueKind::Float, value.kind()))?;
                    *self = f as $t;
                    Ok(())
                }

                fn value_kind() -> ValueKind {
                    ValueKind::Float
                }
            }
        )*
    };
}

impl_float_attribute!(f32, f64);

impl AttributeValue for bool {
    fn to_value(&self) -> Value {
        Value::Bool(*self)
    }

    fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
        *self = value
            .as_bool()
            .ok_or_else(|| ReflectError::mismatch(ValueKind::Bool, value.kind()))?;
        Ok(())
    }

    fn value_kind() -> ValueKind {
        ValueKind::Bool
    }
}

impl AttributeValue for String {
    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }

    fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
        let s = value
            .as_str()
            .ok_or_else(|| ReflectError::mismatch(ValueKind::String, value.kind()))?;
        self.clear();
        self.push_str(s);
        Ok(())
    }

    fn value_kind() -> ValueKind {
        ValueKind::String
    }
}

impl<T: AttributeValue + Default> AttributeValue for Vec<T> {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(AttributeValue::to_value).collect())
    }

    fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
        let items = value
            .as_list()
            .ok_or_else(|| ReflectError::mismatch(ValueKind::List, value.kind()))?;
        let mut next = Vec::with_capacity(items.len());
        for item in items {
            let mut element = T::default();
            element.apply(item)?;
            next.push(element);
        }
        *self = next;
        Ok(())
    }

    fn value_kind() -> ValueKind {
        ValueKind::List
    }

    fn remap_entities(&mut self, map: &mut dyn FnMut(u64) -> u64) {
        for item in self.iter_mut() {
            item.remap_entities(map);
        }
    }
}

impl<T: AttributeValue + Default> AttributeValue for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.apply(value)?;
        *self = Some(inner);
        Ok(())
    }

    fn value_kind() -> ValueKind {
        T::value_kind()
    }

    fn remap_entities(&mut self, map: &mut dyn FnMut(u64) -> u64) {
        if let Some(inner) = self {
            inner.remap_entities(map);
        }
    }
}

impl<T: AttributeValue + Clone, const N: usize> AttributeValue for [T; N] {
    fn to_value(&self) -> Value {
        Value::List(self.iter().map(AttributeValue::to_value).collect())
    }

    fn apply(&mut self, value: &Value) -> Result<(), ReflectError> {
        let items = value
            .as_list()
            .ok_or_else(|| ReflectError::mismatch(ValueKind::List, value.kind()))?;
        if items.len() != N {
            return Err(ReflectError::LengthMismatch {
                expected: N,
                found: items.len(),
            });
        }
        let mut next = self.clone();
        for (slot, item) in next.iter_mut().zip(items) {
            slot.apply(item)?;
        }
        *self = next;
        Ok(())
    }

    fn value_kind() -> ValueKind {
        ValueKind::List
    }

    fn remap_entities(&mut self, map: &mut dyn FnMut(u64) -> u64) {
        for item in self.iter_mut() {
            item.remap_entities(map);
        }
    }
}
