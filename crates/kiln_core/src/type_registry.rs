//! Component type registry
//!
//! Maps component type identities to their reflected descriptors. A
//! descriptor is created once, on first registration, and shared from then on;
//! repeated registration of the same type is a no-op that returns the existing
//! descriptor.

use crate::erased::Erased;
use crate::error::{CoreError, ReflectError, Result};
use crate::id::ComponentTypeId;
use crate::reflect::{AttributeDescriptor, AttributeValue, Reflect};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Immutable description of a registered component type
pub struct TypeDescriptor {
    id: ComponentTypeId,
    name: &'static str,
    rust_name: &'static str,
    attributes: Vec<AttributeDescriptor>,
    construct: fn() -> Box<dyn Erased>,
}

fn construct_default<T: Reflect>() -> Box<dyn Erased> {
    Box::new(T::default())
}

impl TypeDescriptor {
    /// Build the descriptor for `T`
    pub fn of<T: Reflect>() -> Self {
        Self {
            id: ComponentTypeId::of::<T>(),
            name: T::type_name(),
            rust_name: std::any::type_name::<T>(),
            attributes: T::attributes(),
            construct: construct_default::<T>,
        }
    }

    pub fn id(&self) -> ComponentTypeId {
        self.id
    }

    /// Display name, as used in serialized documents
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Full Rust type path
    pub fn rust_name(&self) -> &'static str {
        self.rust_name
    }

    /// Whether this descriptor describes `T`
    pub fn is<T: 'static>(&self) -> bool {
        self.id == ComponentTypeId::of::<T>()
    }

    /// Attributes in declaration order
    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Look up an attribute by name
    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Construct a default instance
    pub fn construct(&self) -> Box<dyn Erased> {
        (self.construct)()
    }

    fn check_instance(&self, component: &dyn Erased) -> std::result::Result<(), ReflectError> {
        if component.component_type_id() == self.id {
            Ok(())
        } else {
            Err(ReflectError::WrongComponentType {
                expected: self.name.to_string(),
            })
        }
    }

    /// Visit every attribute of a type-erased instance, in declaration order
    pub fn for_each_attribute<V>(&self, component: &dyn Erased, mut visitor: V) -> std::result::Result<(), ReflectError>
    where
        V: FnMut(&str, &dyn AttributeValue),
    {
        self.check_instance(component)?;
        for attribute in &self.attributes {
            if let Some(value) = attribute.get(component) {
                visitor(attribute.name(), value);
            }
        }
        Ok(())
    }

    /// Visit every attribute of a type-erased instance mutably
    pub fn for_each_attribute_mut<V>(
        &self,
        component: &mut dyn Erased,
        mut visitor: V,
    ) -> std::result::Result<(), ReflectError>
    where
        V: FnMut(&str, &mut dyn AttributeValue),
    {
        self.check_instance(component)?;
        for attribute in &self.attributes {
            if let Some(value) = attribute.get_mut(component) {
                visitor(attribute.name(), value);
            }
        }
        Ok(())
    }

    /// Snapshot an instance as a map of attribute name to value
    pub fn to_value(&self, component: &dyn Erased) -> std::result::Result<Value, ReflectError> {
        let mut map = BTreeMap::new();
        self.for_each_attribute(component, |name, value| {
            map.insert(name.to_string(), value.to_value());
        })?;
        Ok(Value::Map(map))
    }

    /// Write attributes from a map keyed by attribute name.
    ///
    /// Attributes absent from the map keep their current value. Keys naming no
    /// declared attribute are rejected.
    pub fn apply_value(&self, component: &mut dyn Erased, value: &Value) -> std::result::Result<(), ReflectError> {
        self.check_instance(component)?;
        let map = value
            .as_map()
            .ok_or_else(|| ReflectError::mismatch(crate::ValueKind::Map, value.kind()))?;
        for (key, field_value) in map {
            let attribute = self.attribute(key).ok_or_else(|| ReflectError::UnknownAttribute {
                component: self.name.to_string(),
                attribute: key.clone(),
            })?;
            attribute.write(component, field_value)?;
        }
        Ok(())
    }

    /// Rewrite every entity id held by the instance's attributes
    pub fn remap_entities(
        &self,
        component: &mut dyn Erased,
        map: &mut dyn FnMut(u64) -> u64,
    ) -> std::result::Result<(), ReflectError> {
        self.for_each_attribute_mut(component, |_, value| value.remap_entities(map))
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("rust_name", &self.rust_name)
            .field("attributes", &self.attributes)
            .finish()
    }
}

/// Catalog of registered component types
#[derive(Default)]
pub struct TypeRegistry {
    by_id: BTreeMap<ComponentTypeId, Arc<TypeDescriptor>>,
    by_name: BTreeMap<&'static str, ComponentTypeId>,
}

impl TypeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T`, or return its existing descriptor if already registered.
    ///
    /// # Errors
    ///
    /// [`CoreError::NameConflict`] if a different type already uses
    /// `T::type_name()`.
    pub fn register<T: Reflect>(&mut self) -> Result<Arc<TypeDescriptor>> {
        let id = ComponentTypeId::of::<T>();
        if let Some(existing) = self.by_id.get(&id) {
            return Ok(existing.clone());
        }

        let name = T::type_name();
        if let Some(other) = self.by_name.get(name).and_then(|other| self.by_id.get(other)) {
            return Err(CoreError::NameConflict {
                name: name.to_string(),
                existing: other.rust_name().to_string(),
            });
        }

        let descriptor = Arc::new(TypeDescriptor::of::<T>());
        log::debug!(
            "Registered component type '{}' ({}) with {} attributes",
            name,
            descriptor.rust_name(),
            descriptor.attributes().len()
        );
        self.by_name.insert(name, id);
        self.by_id.insert(id, descriptor.clone());
        Ok(descriptor)
    }

    /// Descriptor for `T`
    pub fn descriptor<T: 'static>(&self) -> Result<Arc<TypeDescriptor>> {
        self.by_id
            .get(&ComponentTypeId::of::<T>())
            .cloned()
            .ok_or_else(|| CoreError::not_registered(std::any::type_name::<T>()))
    }

    /// Descriptor by type identity
    pub fn descriptor_by_id(&self, id: ComponentTypeId) -> Result<Arc<TypeDescriptor>> {
        self.by_id
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::not_registered(id.to_string()))
    }

    /// Descriptor by display name
    pub fn descriptor_by_name(&self, name: &str) -> Result<Arc<TypeDescriptor>> {
        self.by_name
            .get(name)
            .and_then(|id| self.by_id.get(id))
            .cloned()
            .ok_or_else(|| CoreError::not_registered(name))
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.by_id.contains_key(&ComponentTypeId::of::<T>())
    }

    pub fn contains_id(&self, id: ComponentTypeId) -> bool {
        self.by_id.contains_key(&id)
    }

    /// Visit each attribute of `component` in declaration order
    pub fn for_each_attribute<T, V>(&self, component: &T, visitor: V) -> Result<()>
    where
        T: Send + Sync + 'static,
        V: FnMut(&str, &dyn AttributeValue),
    {
        let descriptor = self.descriptor::<T>()?;
        descriptor.for_each_attribute(component, visitor)?;
        Ok(())
    }

    /// Visit each attribute of `component` mutably, in declaration order
    pub fn for_each_attribute_mut<T, V>(&self, component: &mut T, visitor: V) -> Result<()>
    where
        T: Send + Sync + 'static,
        V: FnMut(&str, &mut dyn AttributeValue),
    {
        let descriptor = self.descriptor::<T>()?;
        descriptor.for_each_attribute_mut(component, visitor)?;
        Ok(())
    }

    /// Iterate over all registered descriptors
    pub fn iter(&self) -> impl Iterator<Item = &Arc<TypeDescriptor>> {
        self.by_id.values()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("types", &self.by_name.keys().collect::<Vec<_>>())
            .finish()
    }
}
