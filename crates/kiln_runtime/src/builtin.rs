//! Component types every Kiln world knows about

use kiln_core::reflect;
use kiln_ecs::World;

/// Display name of an entity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Name {
    pub value: String,
}

impl Name {
    pub fn new(value: impl Into<String>) -> Self {
        Self { value: value.into() }
    }
}

reflect!(Name { value });

/// Position, rotation (quaternion, xyzw) and scale
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            scale: [1.0; 3],
        }
    }
}

reflect!(Transform { position, rotation, scale });

/// An editor panel that can be switched on from the menu bar
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Editor {
    pub name: String,
    pub active: bool,
}

reflect!(Editor { name, active });

/// Scales game time for the whole world. The main loop multiplies the
/// configured time scale by the factor of every `TimeModulator` present.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeModulator {
    pub factor: f32,
}

impl Default for TimeModulator {
    fn default() -> Self {
        Self { factor: 1.0 }
    }
}

reflect!(TimeModulator { factor });

/// Register the built-in component types with `world`
pub fn register_builtin_types(world: &mut World) -> kiln_ecs::Result<()> {
    world.register_type::<Name>()?;
    world.register_type::<Transform>()?;
    world.register_type::<Editor>()?;
    world.register_type::<TimeModulator>()?;
    log::debug!("Registered built-in component types");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::Value;

    #[test]
    fn test_builtins_registered() {
        let mut world = World::new();
        register_builtin_types(&mut world).unwrap();
        register_builtin_types(&mut world).unwrap();

        let registry = world.registry();
        assert_eq!(registry.len(), 4);
        assert!(registry.descriptor_by_name("TimeModulator").is_ok());
        let transform = registry.descriptor_by_name("Transform").unwrap();
        let names: Vec<_> = transform.attributes().iter().map(|a| a.name()).collect();
        assert_eq!(names, ["position", "rotation", "scale"]);
    }

    #[test]
    fn test_transform_default_value() {
        let mut world = World::new();
        register_builtin_types(&mut world).unwrap();
        let descriptor = world.registry().descriptor::<Transform>().unwrap();

        let value = descriptor.to_value(&Transform::default()).unwrap();
        assert_eq!(
            value.get("scale"),
            Some(&Value::List(vec![Value::Float(1.0), Value::Float(1.0), Value::Float(1.0)]))
        );
    }
}
