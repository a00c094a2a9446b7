//! Scene save and load through the type registry
//!
//! A scene is a JSON document listing entities and, for each, its reflected
//! components keyed by registered type name:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entities": [
//!     { "id": 0,
//!       "components": { "Name": { "value": "camera" },
//!                       "Transform": { "position": [0.0, 2.0, 5.0] } } }
//!   ]
//! }
//! ```
//!
//! Components whose type is not registered are left out when saving and
//! skipped with a warning when loading. Attributes are matched by name, so
//! attribute order in the document does not matter.
//!
//! `id` is the entity's id in the saved world. Entity-valued attributes are
//! stored as those saved ids and rewritten on load to the entities created
//! for them; a reference to an id not present in the document loads as
//! [`Entity::NULL`]. Non-finite floats have no JSON form, so saving a
//! component holding one fails with [`SceneError::NonFinite`].

use kiln_core::{ReflectError, Value};
use kiln_ecs::{EcsError, Entity, World};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

/// Document version written by [`save`]
pub const SCENE_VERSION: u32 = 1;

/// Errors from scene IO
#[derive(Debug, Error)]
pub enum SceneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported scene version {0}")]
    UnsupportedVersion(u32),

    #[error("Component '{component}' attribute '{attribute}' holds a non-finite float")]
    NonFinite { component: String, attribute: String },

    #[error("Component '{component}': {source}")]
    Component {
        component: String,
        #[source]
        source: ReflectError,
    },

    #[error(transparent)]
    Ecs(#[from] EcsError),
}

/// Result type for scene operations
pub type SceneResult<T> = Result<T, SceneError>;

/// Serialized form of a scene
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    pub version: u32,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

impl Default for SceneDocument {
    fn default() -> Self {
        Self {
            version: SCENE_VERSION,
            entities: Vec::new(),
        }
    }
}

/// One saved entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// Id of the entity when it was saved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default)]
    pub components: BTreeMap<String, Value>,
}

fn is_finite(value: &Value) -> bool {
    match value {
        Value::Float(f) => f.is_finite(),
        Value::List(items) => items.iter().all(is_finite),
        Value::Map(map) => map.values().all(is_finite),
        _ => true,
    }
}

/// Snapshot every live entity's registered components
pub fn capture(world: &World) -> SceneResult<SceneDocument> {
    let mut document = SceneDocument::default();

    for entity in world.entities() {
        let mut record = EntityRecord {
            id: Some(entity.to_bits()),
            ..Default::default()
        };
        for id in world.component_types(entity)? {
            let Ok(descriptor) = world.registry().descriptor_by_id(id) else {
                continue;
            };
            let Some(component) = world.get_erased(entity, id)? else {
                continue;
            };
            let value = descriptor
                .to_value(&*component)
                .map_err(|source| SceneError::Component {
                    component: descriptor.name().to_string(),
                    source,
                })?;
            if let Some((attribute, _)) = value
                .as_map()
                .and_then(|map| map.iter().find(|(_, field)| !is_finite(field)))
            {
                return Err(SceneError::NonFinite {
                    component: descriptor.name().to_string(),
                    attribute: attribute.clone(),
                });
            }
            record.components.insert(descriptor.name().to_string(), value);
        }
        document.entities.push(record);
    }

    Ok(document)
}

/// Create entities for every record in `document`.
///
/// Every component is rebuilt before any entity is created, so a document
/// with a bad attribute leaves the world untouched. Entity references are
/// then rewritten from saved ids to the new entities. Returns the new
/// entities in document order.
pub fn instantiate(world: &mut World, document: &SceneDocument) -> SceneResult<Vec<Entity>> {
    if document.version != SCENE_VERSION {
        return Err(SceneError::UnsupportedVersion(document.version));
    }

    let mut staged = Vec::with_capacity(document.entities.len());
    for record in &document.entities {
        let mut components = Vec::with_capacity(record.components.len());
        for (name, value) in &record.components {
            let descriptor = match world.registry().descriptor_by_name(name) {
                Ok(descriptor) => descriptor,
                Err(_) => {
                    log::warn!("Skipping unregistered component '{}' in scene", name);
                    continue;
                }
            };
            let mut component = descriptor.construct();
            descriptor
                .apply_value(&mut *component, value)
                .map_err(|source| SceneError::Component {
                    component: name.clone(),
                    source,
                })?;
            components.push((descriptor, component));
        }
        staged.push(components);
    }

    let entities: Vec<Entity> = staged.iter().map(|_| world.spawn()).collect();
    let mut saved_ids = HashMap::with_capacity(entities.len());
    for (record, entity) in document.entities.iter().zip(&entities) {
        if let Some(id) = record.id {
            if saved_ids.insert(id, entity.to_bits()).is_some() {
                log::warn!("Duplicate entity id {} in scene, keeping the last", id);
            }
        }
    }
    let mut remap = |saved: u64| match saved_ids.get(&saved) {
        Some(new) => *new,
        None => {
            log::debug!("Scene refers to entity {} it does not contain", saved);
            Entity::NULL.to_bits()
        }
    };

    for (entity, components) in entities.iter().zip(staged) {
        for (descriptor, mut component) in components {
            descriptor
                .remap_entities(&mut *component, &mut remap)
                .map_err(|source| SceneError::Component {
                    component: descriptor.name().to_string(),
                    source,
                })?;
            world.attach_erased(*entity, descriptor.id(), component)?;
        }
    }
    Ok(entities)
}

/// Serialize the world's registered components as pretty JSON
pub fn to_json(world: &World) -> SceneResult<String> {
    Ok(serde_json::to_string_pretty(&capture(world)?)?)
}

/// Instantiate a scene from JSON text
pub fn from_json(world: &mut World, json: &str) -> SceneResult<Vec<Entity>> {
    let document: SceneDocument = serde_json::from_str(json)?;
    instantiate(world, &document)
}

/// Write the world to a scene file
pub fn save(world: &World, path: impl AsRef<Path>) -> SceneResult<()> {
    let path = path.as_ref();
    let json = to_json(world)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    log::info!("Saved scene to {}", path.display());
    Ok(())
}

/// Load a scene file into the world
pub fn load(world: &mut World, path: impl AsRef<Path>) -> SceneResult<Vec<Entity>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path)?;
    let entities = from_json(world, &json)?;
    log::info!("Loaded {} entities from {}", entities.len(), path.display());
    Ok(entities)
}

/// Load a scene file, treating any failure as an empty scene
pub fn load_permissive(world: &mut World, path: impl AsRef<Path>) -> Vec<Entity> {
    let path = path.as_ref();
    match load(world, path) {
        Ok(entities) => entities,
        Err(e) => {
            log::warn!("Scene {} not loaded: {}", path.display(), e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::{register_builtin_types, Name, Transform};

    #[derive(Debug, Default)]
    struct Follow {
        target: Entity,
        waypoints: Vec<Entity>,
    }

    kiln_core::reflect!(Follow { target, waypoints });

    fn world() -> World {
        let mut world = World::new();
        register_builtin_types(&mut world).unwrap();
        world
    }

    #[test]
    fn test_capture_skips_unregistered_components() {
        struct Velocity;

        let mut world = world();
        let e = world.spawn();
        world.attach(e, Name::new("rock")).unwrap();
        world.attach(e, Velocity).unwrap();

        let document = capture(&world).unwrap();
        assert_eq!(document.entities.len(), 1);
        let components: Vec<_> = document.entities[0].components.keys().cloned().collect();
        assert_eq!(components, ["Name"]);
    }

    #[test]
    fn test_unknown_component_is_skipped() {
        let mut world = world();
        let json = r#"{"version":1,"entities":[
            {"components":{"Name":{"value":"a"},"Mystery":{"x":1}}}
        ]}"#;

        let entities = from_json(&mut world, json).unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(world.get::<Name>(entities[0]).unwrap().value, "a");
    }

    #[test]
    fn test_partial_attributes_keep_defaults() {
        let mut world = world();
        let json = r#"{"version":1,"entities":[{"components":{"Transform":{"position":[1,2,3]}}}]}"#;

        let entities = from_json(&mut world, json).unwrap();
        let transform = world.get::<Transform>(entities[0]).unwrap();
        assert_eq!(transform.position, [1.0, 2.0, 3.0]);
        assert_eq!(transform.scale, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_bad_attribute_leaves_world_untouched() {
        let mut world = world();
        let json = r#"{"version":1,"entities":[
            {"components":{"Name":{"value":"ok"}}},
            {"components":{"Transform":{"position":[1,2]}}}
        ]}"#;

        let err = from_json(&mut world, json).unwrap_err();
        assert!(matches!(err, SceneError::Component { ref component, .. } if component == "Transform"));
        assert!(world.is_empty());
    }

    #[test]
    fn test_entity_references_follow_reload() {
        let mut world = world();
        world.register_type::<Follow>().unwrap();
        let leader = world.spawn();
        world.attach(leader, Name::new("leader")).unwrap();
        let stop = world.spawn();
        let follower = world.spawn();
        world
            .attach(follower, Follow {
                target: leader,
                waypoints: vec![stop, Entity::NULL],
            })
            .unwrap();
        let json = to_json(&world).unwrap();

        let mut loaded = World::new();
        register_builtin_types(&mut loaded).unwrap();
        loaded.register_type::<Follow>().unwrap();
        for _ in 0..10 {
            loaded.spawn();
        }
        let entities = from_json(&mut loaded, &json).unwrap();

        let follow = loaded.get::<Follow>(entities[2]).unwrap();
        assert_eq!(follow.target, entities[0]);
        assert_eq!(follow.waypoints, [entities[1], Entity::NULL]);
        assert_eq!(loaded.get::<Name>(follow.target).unwrap().value, "leader");
    }

    #[test]
    fn test_reference_outside_document_loads_as_null() {
        let mut world = world();
        world.register_type::<Follow>().unwrap();
        let json = r#"{"version":1,"entities":[{"id":4,"components":{"Follow":{"target":9}}}]}"#;

        let entities = from_json(&mut world, json).unwrap();
        assert!(world.get::<Follow>(entities[0]).unwrap().target.is_null());
    }

    #[test]
    fn test_non_finite_float_refuses_to_save() {
        let mut world = world();
        let e = world.spawn();
        world
            .attach(e, Transform {
                position: [0.0, f32::NAN, 0.0],
                ..Default::default()
            })
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.json");
        let err = save(&world, &path).unwrap_err();
        assert!(matches!(
            err,
            SceneError::NonFinite { ref component, ref attribute }
                if component == "Transform" && attribute == "position"
        ));
        assert!(!path.exists());

        world.get_mut::<Transform>(e).unwrap().position[1] = f32::INFINITY;
        assert!(matches!(to_json(&world), Err(SceneError::NonFinite { .. })));
    }

    #[test]
    fn test_version_checked() {
        let mut world = world();
        let err = from_json(&mut world, r#"{"version":7,"entities":[]}"#).unwrap_err();
        assert!(matches!(err, SceneError::UnsupportedVersion(7)));
    }

    #[test]
    fn test_load_permissive_missing_file() {
        let mut world = world();
        assert!(load_permissive(&mut world, "/no/such/scene.json").is_empty());
        assert!(world.is_empty());
    }

    #[test]
    fn test_load_permissive_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let mut world = world();
        assert!(load_permissive(&mut world, &path).is_empty());
    }
}
