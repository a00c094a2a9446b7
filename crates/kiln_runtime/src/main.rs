//! Kiln engine binary
//!
//! Loads `kiln.toml`, registers the built-in component types, loads every
//! plugin in the plugin directory, optionally loads a startup scene, then
//! runs the main loop until Ctrl-C or a handler requests termination.
//!
//! Run with: cargo run --bin kiln

use kiln_ecs::World;
use kiln_plugin::{PluginError, PluginLoader};
use kiln_runtime::{register_builtin_types, scene, EngineConfig, MainLoop, RecentList};
use std::process::ExitCode;
use std::sync::atomic::Ordering;

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match EngineConfig::load(EngineConfig::DEFAULT_PATH) {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid {}: {}, using defaults", EngineConfig::DEFAULT_PATH, e);
            let mut config = EngineConfig::default();
            config.apply_env_overrides();
            config
        }
    };
    config.print_summary();

    let mut world = World::new();
    if let Err(e) = register_builtin_types(&mut world) {
        log::error!("Failed to register built-in types: {}", e);
        return ExitCode::FAILURE;
    }

    world.insert_resource(RecentList::load(
        &config.editor.recent_file,
        config.editor.recent_capacity,
    ));

    let mut loader = PluginLoader::new();
    match loader.rescan_directory(&config.plugins.directory, &config.plugins.entry_symbol, &mut world) {
        Ok(report) => {
            log::info!(
                "{} plugins loaded, {} skipped",
                report.loaded.len(),
                report.skipped.len()
            );
        }
        Err(PluginError::EntryFaulted { module, message }) => {
            log::error!("Plugin '{}' failed to initialize: {}", module, message);
            return ExitCode::FAILURE;
        }
        Err(e) => {
            log::error!("Plugin scan failed: {}", e);
            return ExitCode::FAILURE;
        }
    }
    // Plugins may have queued work from their entry points
    world.apply_commands();

    if let Some(path) = &config.scene.startup {
        scene::load_permissive(&mut world, path);
    }

    let mut main_loop = MainLoop::new(&config.main_loop);
    let shutdown_flag = main_loop.termination_flag().handle();
    if let Err(e) = ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        shutdown_flag.store(true, Ordering::Relaxed);
    }) {
        log::warn!("Failed to set signal handler: {}", e);
    }

    main_loop.run(&mut world);
    main_loop.shutdown(&mut world);

    if let Some(recent) = world.resource::<RecentList>() {
        if let Err(e) = recent.save() {
            log::warn!("Failed to save recent list {}: {}", recent.path().display(), e);
        }
    }

    ExitCode::SUCCESS
}
