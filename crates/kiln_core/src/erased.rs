//! Type-erased values with module-independent identity
//!
//! `dyn Any` compares `TypeId`s, and those are not guaranteed to agree between
//! the host executable and a separately built plugin module, even for the
//! same type from the same sources. Values that may cross that boundary are
//! typed as `dyn Erased`, whose downcasts compare [`ComponentTypeId`]s derived
//! from the type path instead.
//!
//! The check is sound as long as every module is built from the same sources
//! with the same toolchain (the plugin ABI contract) and a type path names a
//! single type within one build.

use crate::id::ComponentTypeId;

/// A `Send + Sync + 'static` value that can report its type identity
pub trait Erased: Send + Sync + 'static {
    /// Identity of the concrete type
    fn component_type_id(&self) -> ComponentTypeId;

    /// Rust path of the concrete type
    fn component_type_name(&self) -> &'static str;
}

impl<T: Send + Sync + 'static> Erased for T {
    fn component_type_id(&self) -> ComponentTypeId {
        ComponentTypeId::of::<T>()
    }

    fn component_type_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl dyn Erased {
    /// Whether the value is a `T`
    #[inline]
    pub fn is<T: 'static>(&self) -> bool {
        self.component_type_id() == ComponentTypeId::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        if self.is::<T>() {
            // SAFETY: identities match, so the value was created as a `T`
            Some(unsafe { &*(self as *const dyn Erased as *const T) })
        } else {
            None
        }
    }

    pub fn downcast_mut<T: 'static>(&mut self) -> Option<&mut T> {
        if self.is::<T>() {
            // SAFETY: as in `downcast_ref`
            Some(unsafe { &mut *(self as *mut dyn Erased as *mut T) })
        } else {
            None
        }
    }

    /// Take ownership of the value as a `T`, handing the box back on mismatch
    pub fn downcast<T: 'static>(self: Box<Self>) -> Result<Box<T>, Box<Self>> {
        if (*self).is::<T>() {
            // SAFETY: as in `downcast_ref`; the allocation was made for a `T`
            Ok(unsafe { Box::from_raw(Box::into_raw(self) as *mut T) })
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Debug for dyn Erased {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Erased").finish_non_exhaustive()
    }
}

/// Upcast from traits built on [`Erased`]
pub trait AsErased: Erased {
    fn as_erased(&self) -> &dyn Erased;
    fn as_erased_mut(&mut self) -> &mut dyn Erased;
}

impl<T: Erased> AsErased for T {
    fn as_erased(&self) -> &dyn Erased {
        self
    }

    fn as_erased_mut(&mut self) -> &mut dyn Erased {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Mass(f32);

    #[test]
    fn test_downcast_by_identity() {
        let mut value: Box<dyn Erased> = Box::new(Mass(2.0));
        assert!(value.is::<Mass>());
        assert!(!value.is::<f32>());
        assert_eq!(value.downcast_ref::<Mass>(), Some(&Mass(2.0)));
        assert_eq!(value.downcast_ref::<u32>(), None);

        value.downcast_mut::<Mass>().unwrap().0 = 3.0;
        assert_eq!((*value).component_type_name(), std::any::type_name::<Mass>());

        let value = value.downcast::<u32>().unwrap_err();
        assert_eq!(*value.downcast::<Mass>().unwrap(), Mass(3.0));
    }

    #[test]
    fn test_identity_comes_from_type_path() {
        let value: &dyn Erased = &Mass(1.0);
        assert_eq!(
            value.component_type_id(),
            ComponentTypeId::from_name(std::any::type_name::<Mass>())
        );
    }
}
