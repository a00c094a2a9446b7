//! Editor selector plugin
//!
//! Adds two editor panels. On the first tick, the editors named in the
//! world's [`RecentList`] are switched on; at shutdown the active editors are
//! recorded as most recent, so the next run reopens them.
//!
//! Build with `cargo build -p kiln_sample_plugin` and copy the resulting
//! library into the configured plugin directory.

use kiln_ecs::function::{Execute, OnTerminate};
use kiln_ecs::World;
use kiln_plugin::PluginHost;
use kiln_runtime::{Editor, RecentList};

const EDITORS: [&str; 2] = ["Entity Editor", "Model Editor"];

fn init(host: &mut PluginHost<'_>) {
    if let Err(e) = populate(host.world()) {
        host.report_fault(e.to_string());
    }
}

kiln_plugin::declare_plugin!(init);

fn populate(world: &mut World) -> kiln_ecs::Result<()> {
    world.register_type::<Editor>()?;

    for name in EDITORS {
        world.create(|builder| {
            builder.attach(Editor {
                name: name.to_string(),
                active: false,
            })?;
            Ok(())
        })?;
    }

    let selector = world.spawn();
    world.attach(selector, Execute::new(move |world, _| {
        restore_active(world);
        // Runs once
        world.commands().detach::<Execute>(selector);
    }))?;
    world.attach(selector, OnTerminate::new(remember_active))?;

    log::info!("Editor selector ready with {} editors", EDITORS.len());
    Ok(())
}

fn restore_active(world: &World) {
    let Some(recent) = world.resource::<RecentList>() else {
        log::debug!("No recent list, editors left closed");
        return;
    };
    for (_, mut editor) in world.query::<&mut Editor>().iter() {
        editor.active = recent.contains(&editor.name);
    }
}

fn remember_active(world: &World) {
    let active: Vec<String> = world
        .query::<&Editor>()
        .iter()
        .filter(|(_, editor)| editor.active)
        .map(|(_, editor)| editor.name.clone())
        .collect();

    world.commands().run("remember active editors", move |world| {
        if let Some(recent) = world.resource_mut::<RecentList>() {
            for name in active.into_iter().rev() {
                recent.push(name);
            }
        }
        Ok(())
    });
}
