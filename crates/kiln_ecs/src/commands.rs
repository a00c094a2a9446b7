//! Deferred structural mutations
//!
//! Handlers only get a shared `&World`, so they cannot create or destroy
//! entities directly. They queue the mutation here instead, and
//! [`World::apply_commands`] applies the whole queue once the pass has
//! returned.

use crate::builder::EntityBuilder;
use crate::component::Component;
use crate::entity::Entity;
use crate::error::{EcsError, Result};
use crate::world::World;
use parking_lot::Mutex;

type CommandFn = Box<dyn FnOnce(&mut World) -> Result<()> + Send>;

struct Command {
    label: String,
    apply: CommandFn,
}

/// Per-world queue of pending mutations
#[derive(Default)]
pub struct CommandQueue {
    pending: Mutex<Vec<Command>>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, label: String, apply: CommandFn) {
        self.pending.lock().push(Command { label, apply });
    }

    /// Number of queued commands
    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }

    fn take(&self) -> Vec<Command> {
        std::mem::take(&mut *self.pending.lock())
    }
}

impl std::fmt::Debug for CommandQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandQueue")
            .field("pending", &self.len())
            .finish()
    }
}

/// Outcome of draining the command queue
#[derive(Debug, Default)]
pub struct CommandReport {
    /// Commands applied successfully
    pub applied: usize,
    /// Commands that failed, with their label
    pub failed: Vec<(String, EcsError)>,
}

impl CommandReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Handle for queueing mutations against a world through a shared borrow
pub struct Commands<'w> {
    world: &'w World,
}

impl<'w> Commands<'w> {
    pub(crate) fn new(world: &'w World) -> Self {
        Self { world }
    }

    /// Queue creation of an entity.
    ///
    /// The id is reserved immediately and returned, but the entity only
    /// becomes visible once the queue is applied and `build` succeeds.
    pub fn create<B>(&self, build: B) -> Entity
    where
        B: FnOnce(&mut EntityBuilder) -> Result<()> + Send + 'static,
    {
        let entity = self.world.reserve_entity();
        self.world.command_queue().push(
            format!("create {}", entity),
            Box::new(move |world: &mut World| world.create_reserved(entity, build).map(|_| ())),
        );
        entity
    }

    /// Queue destruction of an entity
    pub fn destroy(&self, entity: Entity) {
        self.world.command_queue().push(
            format!("destroy {}", entity),
            Box::new(move |world: &mut World| world.destroy(entity)),
        );
    }

    /// Queue a strict attach
    pub fn attach<T: Component>(&self, entity: Entity, value: T) {
        self.world.command_queue().push(
            format!("attach {} to {}", std::any::type_name::<T>(), entity),
            Box::new(move |world: &mut World| world.attach(entity, value).map(|_| ())),
        );
    }

    /// Queue a detach; the removed value is dropped
    pub fn detach<T: Component>(&self, entity: Entity) {
        self.world.command_queue().push(
            format!("detach {} from {}", std::any::type_name::<T>(), entity),
            Box::new(move |world: &mut World| world.detach::<T>(entity).map(|_| ())),
        );
    }

    /// Queue an arbitrary mutation
    pub fn run<F>(&self, label: impl Into<String>, f: F)
    where
        F: FnOnce(&mut World) -> Result<()> + Send + 'static,
    {
        self.world.command_queue().push(label.into(), Box::new(f));
    }
}

/// Apply every queued command, including commands queued while applying.
pub(crate) fn drain(world: &mut World) -> CommandReport {
    let mut report = CommandReport::default();
    loop {
        let batch = world.command_queue().take();
        if batch.is_empty() {
            break;
        }
        for command in batch {
            match (command.apply)(world) {
                Ok(()) => report.applied += 1,
                Err(err) => {
                    log::warn!("Deferred command '{}' failed: {}", command.label, err);
                    report.failed.push((command.label, err));
                }
            }
        }
    }
    report
}
