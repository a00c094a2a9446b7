//! Function components
//!
//! Behavior is attached to entities the same way data is: as a component
//! whose payload is a callable. The engine and plugins find behaviors by
//! querying for the function-component type, then call each one with the
//! world and the signature's arguments.
//!
//! Handlers get a shared `&World`. They edit component values through
//! [`World::borrow_mut`] and make structural changes (create, destroy,
//! attach, detach, resources) through [`World::commands`], which take effect
//! once the whole pass is over. Every handler in a pass therefore sees the
//! same set of entities.
//!
//! ```
//! use kiln_ecs::{function::Execute, World};
//!
//! struct Ticks(u32);
//!
//! let mut world = World::new();
//! let counter = world.spawn();
//! world.attach(counter, Ticks(0)).unwrap();
//! world
//!     .attach(counter, Execute::new(move |world, _dt| {
//!         world.borrow_mut::<Ticks>(counter).unwrap().0 += 1;
//!     }))
//!     .unwrap();
//!
//! world.dispatch::<Execute>(|execute, world| execute.call(world, 0.016));
//! assert_eq!(world.get::<Ticks>(counter).unwrap().0, 1);
//! ```

use crate::component::Component;
use crate::entity::Entity;
use crate::world::World;

/// Column-major 4x4 matrix, as passed to gizmo drawing
pub type Mat4 = [[f32; 4]; 4];

/// Declare a function-component type with a fixed call signature.
///
/// ```
/// kiln_ecs::function_component! {
///     /// Called when the player levels up
///     pub OnLevelUp(level: u32) -> bool
/// }
///
/// let handler = OnLevelUp::new(|_world, level| level > 1);
/// let world = kiln_ecs::World::new();
/// assert!(handler.call(&world, 2));
/// ```
#[macro_export]
macro_rules! function_component {
    ($(#[$meta:meta])* $vis:vis $name:ident ( $($arg:ident : $ty:ty),* $(,)? ) $(-> $ret:ty)?) => {
        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $name(
            ::std::sync::Arc<dyn Fn(&$crate::World, $($ty),*) $(-> $ret)? + Send + Sync>,
        );

        impl $name {
            /// Wrap a callable
            pub fn new<F>(f: F) -> Self
            where
                F: Fn(&$crate::World, $($ty),*) $(-> $ret)? + Send + Sync + 'static,
            {
                Self(::std::sync::Arc::new(f))
            }

            /// Invoke the callable
            #[allow(clippy::too_many_arguments)]
            pub fn call(&self, world: &$crate::World, $($arg: $ty),*) $(-> $ret)? {
                (self.0)(world, $($arg),*)
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(concat!(stringify!($name), "(..)"))
            }
        }
    };
}

function_component! {
    /// Per-tick update, called by the main loop with the elapsed seconds
    pub Execute(dt: f32)
}

function_component! {
    /// Click on the owning entity
    pub OnClick(button: i32)
}

function_component! {
    /// Cursor motion inside a window, with the relative movement since the last event
    pub OnMouseMove(window: Entity, coords: [f32; 2], rel: [f32; 2])
}

function_component! {
    pub OnMouseButton(window: Entity, coords: [f32; 2], button: i32, pressed: bool)
}

function_component! {
    pub OnScroll(window: Entity, coords: [f32; 2], delta: [f32; 2])
}

function_component! {
    /// Draw editor gizmos for the owning entity
    pub DrawGizmos(proj: Mat4, view: Mat4, window_size: [f32; 2], window_pos: [f32; 2])
}

function_component! {
    /// Which entity covers a pixel of a window, if any
    pub GetEntityInPixel(window: Entity, coords: [f32; 2]) -> Option<Entity>
}

function_component! {
    /// Called once when the main loop shuts down
    pub OnTerminate()
}

impl World {
    /// Snapshot every `F` handler, in query order
    pub fn handlers<F: Component + Clone>(&self) -> Vec<(Entity, F)> {
        self.query::<&F>()
            .iter()
            .map(|(entity, handler)| (entity, handler.clone()))
            .collect()
    }

    /// Invoke every `F` handler in turn through `invoke`.
    ///
    /// Handlers are snapshotted up front, so the pass covers exactly the
    /// handlers present when it started. Structural changes they queue are
    /// left for [`apply_commands`](Self::apply_commands). Returns the number
    /// of handlers invoked.
    pub fn dispatch<F>(&self, mut invoke: impl FnMut(&F, &World)) -> usize
    where
        F: Component + Clone,
    {
        let handlers = self.handlers::<F>();
        for (_, handler) in &handlers {
            invoke(handler, self);
        }
        handlers.len()
    }

    /// Ask every [`GetEntityInPixel`] handler, returning the first hit
    pub fn entity_in_pixel(&self, window: Entity, coords: [f32; 2]) -> Option<Entity> {
        self.handlers::<GetEntityInPixel>()
            .into_iter()
            .find_map(|(_, handler)| handler.call(self, window, coords))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_dispatch_invokes_each_handler_once() {
        let mut world = World::new();
        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let e = world.spawn();
            let calls = calls.clone();
            world
                .attach(e, Execute::new(move |_, _| {
                    calls.fetch_add(1, Ordering::SeqCst);
                }))
                .unwrap();
        }

        let invoked = world.dispatch::<Execute>(|execute, world| execute.call(world, 0.5));
        assert_eq!(invoked, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_detach_during_pass_waits_for_apply() {
        let mut world = World::new();
        let first = world.spawn();
        let second = world.spawn();
        let seen = Arc::new(AtomicUsize::new(0));

        world
            .attach(first, Execute::new(move |world, _| {
                world.commands().detach::<Execute>(second);
            }))
            .unwrap();
        let counter = seen.clone();
        world
            .attach(second, Execute::new(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            }))
            .unwrap();

        assert_eq!(world.dispatch::<Execute>(|execute, world| execute.call(world, 0.0)), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        world.apply_commands();
        assert_eq!(world.dispatch::<Execute>(|execute, world| execute.call(world, 0.0)), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_later_handler_does_not_see_entity_created_earlier_in_pass() {
        struct Marker;

        let mut world = World::new();
        let creator = world.spawn();
        world
            .attach(creator, Execute::new(|world, _| {
                world.commands().create(|b| b.attach(Marker).map(|_| ()));
            }))
            .unwrap();

        let counts = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let observer = world.spawn();
        let seen = counts.clone();
        world
            .attach(observer, Execute::new(move |world, _| {
                seen.lock().push(world.query::<&Marker>().count());
            }))
            .unwrap();

        world.dispatch::<Execute>(|f, w| f.call(w, 0.0));
        world.apply_commands();
        world.dispatch::<Execute>(|f, w| f.call(w, 0.0));

        assert_eq!(*counts.lock(), [0, 1]);
    }

    #[test]
    fn test_handler_can_detach_itself() {
        let mut world = World::new();
        let e = world.spawn();
        world
            .attach(e, Execute::new(move |world, _| {
                world.commands().detach::<Execute>(e);
            }))
            .unwrap();

        assert_eq!(world.dispatch::<Execute>(|f, w| f.call(w, 0.0)), 1);
        assert_eq!(world.apply_commands().applied, 1);
        assert_eq!(world.dispatch::<Execute>(|f, w| f.call(w, 0.0)), 0);
    }

    #[test]
    fn test_handler_edits_components_in_place() {
        struct Ticks(u32);

        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, Ticks(0)).unwrap();
        world
            .attach(e, Execute::new(move |world, _| {
                world.borrow_mut::<Ticks>(e).unwrap().0 += 1;
            }))
            .unwrap();

        world.dispatch::<Execute>(|f, w| f.call(w, 0.0));
        world.dispatch::<Execute>(|f, w| f.call(w, 0.0));
        assert_eq!(world.get::<Ticks>(e).unwrap().0, 2);
    }

    #[test]
    fn test_entity_in_pixel_first_hit() {
        let mut world = World::new();
        let window = world.spawn();
        let target = world.spawn();

        let miss = world.spawn();
        world
            .attach(miss, GetEntityInPixel::new(|_, _, _| None))
            .unwrap();
        let hit = world.spawn();
        world
            .attach(hit, GetEntityInPixel::new(move |_, w, coords| {
                (w == window && coords[0] > 10.0).then_some(target)
            }))
            .unwrap();

        assert_eq!(world.entity_in_pixel(window, [20.0, 0.0]), Some(target));
        assert_eq!(world.entity_in_pixel(window, [5.0, 0.0]), None);
    }

    #[test]
    fn test_handlers_are_components() {
        let mut world = World::new();
        let e = world.spawn();
        world.attach(e, OnTerminate::new(|_| {})).unwrap();
        assert!(world.has::<OnTerminate>(e).unwrap());
        assert_eq!(world.query::<&OnTerminate>().count(), 1);
        assert_eq!(format!("{:?}", world.handlers::<OnTerminate>()[0].1), "OnTerminate(..)");
    }
}
