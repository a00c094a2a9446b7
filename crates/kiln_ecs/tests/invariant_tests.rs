//! Invariant tests for kiln_ecs
//!
//! These tests pin down the entity store contract that plugins and the main
//! loop rely on.

use kiln_ecs::function::Execute;
use kiln_ecs::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq)]
struct Transform {
    position: [f32; 3],
}

kiln_core::reflect!(Transform { position });

#[derive(Debug, Default)]
struct Hidden;

#[derive(Debug, Default)]
struct Marker;

/// INVARIANT: attached components are observable through has and get
#[test]
fn invariant_attach_then_observe() {
    let mut world = World::new();
    let e = world
        .create(|builder| {
            builder.attach(Transform { position: [1.0, 2.0, 3.0] })?;
            Ok(())
        })
        .unwrap();

    assert!(world.has::<Transform>(e).unwrap());
    assert_eq!(world.get::<Transform>(e).unwrap().position, [1.0, 2.0, 3.0]);
}

/// INVARIANT: registering a type twice yields the identical descriptor
#[test]
fn invariant_registration_is_idempotent() {
    let mut world = World::new();
    let first = world.register_type::<Transform>().unwrap();
    let second = world.register_type::<Transform>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(world.registry().len(), 1);
}

/// INVARIANT: a destroyed id faults instead of answering false
#[test]
fn invariant_destroyed_entity_faults() {
    let mut world = World::new();
    let e = world.spawn();
    world.attach(e, Transform::default()).unwrap();
    world.destroy(e).unwrap();

    assert_eq!(world.has::<Transform>(e), Err(EcsError::UnknownEntity(e)));
    assert!(world.try_get::<Transform>(e).is_err());
}

/// INVARIANT: exclusion filters track attach and detach
#[test]
fn invariant_without_filter_follows_detach() {
    let mut world = World::new();
    let e = world.spawn();
    world.attach(e, Transform::default()).unwrap();
    world.attach(e, Hidden).unwrap();

    assert!(!world.query::<&Transform>().without::<Hidden>().entities().contains(&e));

    world.detach::<Hidden>(e).unwrap();
    assert!(world.query::<&Transform>().without::<Hidden>().entities().contains(&e));
}

/// INVARIANT: queued creations are invisible to the pass that queued them and
/// visible to the next one
#[test]
fn invariant_deferred_creation_applies_after_pass() {
    let mut world = World::new();
    for _ in 0..2 {
        world.create(|b| b.attach(Marker).map(|_| ())).unwrap();
    }

    let seen_during_pass = Arc::new(AtomicUsize::new(0));
    let seen = seen_during_pass.clone();
    let spawner = world.spawn();
    world
        .attach(spawner, Execute::new(move |world, _| {
            for _ in 0..3 {
                world.commands().create(|b| b.attach(Marker).map(|_| ()));
            }
            seen.store(world.query::<&Marker>().count(), Ordering::SeqCst);
            world.commands().detach::<Execute>(spawner);
        }))
        .unwrap();

    world.dispatch::<Execute>(|execute, world| execute.call(world, 0.016));
    assert_eq!(seen_during_pass.load(Ordering::SeqCst), 2);
    assert_eq!(world.query::<&Marker>().count(), 2);
    assert_eq!(world.pending_commands(), 4);

    let report = world.apply_commands();
    assert_eq!(report.applied, 4);
    assert!(report.is_clean());
    assert_eq!(world.query::<&Marker>().count(), 5);
}

/// INVARIANT: mutations queued while iterating a query are applied together
#[test]
fn invariant_destroy_during_query_is_deferred() {
    let mut world = World::new();
    for _ in 0..4 {
        world.create(|b| b.attach(Marker).map(|_| ())).unwrap();
    }

    for (entity, _) in world.query::<&Marker>() {
        world.commands().destroy(entity);
    }
    assert_eq!(world.len(), 4);

    world.apply_commands();
    assert!(world.is_empty());
}

/// INVARIANT: a failed deferred command is reported and does not stop the drain
#[test]
fn invariant_failed_command_does_not_stop_drain() {
    let mut world = World::new();
    let gone = world.spawn();
    world.destroy(gone).unwrap();
    let live = world.spawn();

    world.commands().destroy(gone);
    world.commands().attach(live, Marker);

    let report = world.apply_commands();
    assert_eq!(report.applied, 1);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, EcsError::UnknownEntity(_)));
    assert!(world.has::<Marker>(live).unwrap());
}

/// INVARIANT: a reserved entity is not alive until its create command runs
#[test]
fn invariant_reserved_entity_is_not_alive() {
    let mut world = World::new();
    let reserved = world.commands().create(|b| b.attach(Marker).map(|_| ()));

    assert!(!world.is_alive(reserved));
    assert!(world.has::<Marker>(reserved).is_err());

    world.apply_commands();
    assert!(world.has::<Marker>(reserved).unwrap());
}

/// INVARIANT: commands queued while applying are applied in the same drain
#[test]
fn invariant_nested_commands_drain() {
    let mut world = World::new();
    world.commands().run("spawn twice", |world| {
        world.commands().create(|b| b.attach(Marker).map(|_| ()));
        world.commands().create(|b| b.attach(Marker).map(|_| ()));
        Ok(())
    });

    let report = world.apply_commands();
    assert_eq!(report.applied, 3);
    assert_eq!(world.query::<&Marker>().count(), 2);
    assert_eq!(world.pending_commands(), 0);
}
