//! Invariant tests for kiln_runtime
//!
//! Main loop ordering and scene persistence as seen from outside the crate.

use kiln_ecs::function::{Execute, OnTerminate};
use kiln_ecs::World;
use kiln_runtime::{register_builtin_types, scene, Editor, MainLoop, MainLoopConfig, Name, RecentList, Transform};

struct Spawned(u32);

fn unpaced() -> MainLoopConfig {
    MainLoopConfig {
        max_delta_seconds: 0.25,
        target_tick_rate: None,
        ..Default::default()
    }
}

/// INVARIANT: entities queued during a tick are invisible to that tick's
/// handlers and visible to the next tick's
#[test]
fn invariant_queued_creation_visible_next_tick() {
    let mut world = World::new();
    for _ in 0..2 {
        world.create(|b| b.attach(Spawned(0)).map(|_| ())).unwrap();
    }

    let spawner = world.spawn();
    world
        .attach(spawner, Execute::new(|world, _| {
            let seen = world.query::<&Spawned>().count();
            for _ in 0..3 {
                world.commands().create(|b| b.attach(Spawned(1)).map(|_| ()));
            }
            world.commands().run("record", move |world| {
                world.insert_resource(seen);
                Ok(())
            });
        }))
        .unwrap();

    let mut main_loop = MainLoop::new(&unpaced());

    main_loop.tick(&mut world, 0.016);
    assert_eq!(world.resource::<usize>(), Some(&2));

    main_loop.tick(&mut world, 0.016);
    assert_eq!(world.resource::<usize>(), Some(&5));
}

/// INVARIANT: a handler never observes structural changes queued by an
/// earlier handler of the same tick
#[test]
fn invariant_same_tick_handlers_share_one_view() {
    let mut world = World::new();
    let creator = world.spawn();
    world
        .attach(creator, Execute::new(|world, _| {
            world.commands().create(|b| b.attach(Spawned(2)).map(|_| ()));
        }))
        .unwrap();
    let observer = world.spawn();
    world.attach(observer, Vec::<usize>::new()).unwrap();
    world
        .attach(observer, Execute::new(move |world, _| {
            let count = world.query::<&Spawned>().count();
            world.borrow_mut::<Vec<usize>>(observer).unwrap().push(count);
        }))
        .unwrap();

    let mut main_loop = MainLoop::new(&unpaced());
    main_loop.tick(&mut world, 0.016);
    main_loop.tick(&mut world, 0.016);

    assert_eq!(*world.get::<Vec<usize>>(observer).unwrap(), [0, 1]);
}

/// INVARIANT: every Execute handler runs exactly once per tick, in query order
#[test]
fn invariant_each_handler_once_per_tick() {
    let mut world = World::new();
    let log = world.spawn();
    world.attach(log, Vec::<u64>::new()).unwrap();

    let mut handlers = Vec::new();
    for _ in 0..3 {
        let e = world.spawn();
        world
            .attach(e, Execute::new(move |world, _| {
                world.borrow_mut::<Vec<u64>>(log).unwrap().push(e.to_bits());
            }))
            .unwrap();
        handlers.push(e.to_bits());
    }

    let mut main_loop = MainLoop::new(&unpaced());
    main_loop.tick(&mut world, 0.0);
    main_loop.tick(&mut world, 0.0);

    let expected: Vec<u64> = handlers.iter().chain(handlers.iter()).copied().collect();
    assert_eq!(*world.get::<Vec<u64>>(log).unwrap(), expected);
}

/// INVARIANT: saving, clearing and loading reproduces every registered
/// component value
#[test]
fn invariant_scene_round_trip_after_clear() {
    let mut world = World::new();
    register_builtin_types(&mut world).unwrap();

    let camera = world.spawn();
    world.attach(camera, Name::new("camera")).unwrap();
    world
        .attach(camera, Transform {
            position: [0.0, 2.0, 5.0],
            rotation: [0.0, 0.7071, 0.0, 0.7071],
            scale: [1.0, 1.0, 1.0],
        })
        .unwrap();
    let editor = world.spawn();
    world
        .attach(editor, Editor {
            name: "Entity Editor".to_string(),
            active: true,
        })
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.json");
    scene::save(&world, &path).unwrap();

    let before = scene::capture(&world).unwrap();
    world.clear();
    assert!(world.is_empty());

    let loaded = scene::load(&mut world, &path).unwrap();
    assert_eq!(loaded.len(), 2);
    assert_eq!(world.get::<Name>(loaded[0]).unwrap().value, "camera");
    assert_eq!(world.get::<Transform>(loaded[0]).unwrap().position, [0.0, 2.0, 5.0]);
    assert!(world.get::<Editor>(loaded[1]).unwrap().active);

    // Same components; only the entity ids are new
    let components = |document: &scene::SceneDocument| {
        document
            .entities
            .iter()
            .map(|record| record.components.clone())
            .collect::<Vec<_>>()
    };
    let after = scene::capture(&world).unwrap();
    assert_eq!(components(&after), components(&before));
    assert_ne!(after.entities[0].id, before.entities[0].id);
}

/// INVARIANT: a terminate handler's updates to the recent list survive a
/// save and reload
#[test]
fn invariant_recent_list_updated_at_shutdown() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("recentEditor.txt");

    let mut world = World::new();
    world.insert_resource(RecentList::load(&path, 4));
    let e = world.spawn();
    world
        .attach(e, OnTerminate::new(|world| {
            world.commands().run("remember editor", |world| {
                if let Some(recent) = world.resource_mut::<RecentList>() {
                    recent.push("Model Editor");
                }
                Ok(())
            });
        }))
        .unwrap();

    let mut main_loop = MainLoop::new(&unpaced());
    main_loop.shutdown(&mut world);
    world.resource::<RecentList>().unwrap().save().unwrap();

    assert_eq!(RecentList::load(&path, 4).items(), ["Model Editor"]);
}
