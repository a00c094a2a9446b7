//! # kiln_plugin - Dynamic Plugin Loading
//!
//! Loads independently compiled modules into a running world. Each module
//! exports one entry symbol; the loader calls it once with an opaque handle,
//! and the plugin uses that handle to register component types and attach
//! function components.
//!
//! ## Architecture
//!
//! ```text
//! plugins/                     ┌──────────────┐
//!   a_editor.so  ──open──►     │ PluginLoader │ ──entry(handle)──► plugin init
//!   b_physics.so ──open──►     │  (sorted by  │                       │
//!   notes.txt    (ignored)     │   file name) │                       ▼
//!                              └──────────────┘          PluginHost { &mut World }
//! ```
//!
//! ## Plugin side
//!
//! ```no_run
//! use kiln_ecs::function::Execute;
//! use kiln_plugin::PluginHost;
//!
//! fn init(host: &mut PluginHost<'_>) {
//!     let world = host.world();
//!     let e = world.spawn();
//!     world.attach(e, Execute::new(|_world, dt| log::trace!("tick {dt}"))).unwrap();
//! }
//!
//! kiln_plugin::declare_plugin!(init);
//! ```
//!
//! Modules are never unloaded: function components registered by a plugin
//! refer to its code for as long as the world lives.

pub mod error;
pub mod host;
pub mod library;
pub mod loader;

pub use error::{PluginError, Result};
pub use host::{run_entry, PluginEntryFn, PluginHost, DEFAULT_ENTRY_SYMBOL};
pub use library::{DylibModule, DylibOpener, Module, ModuleOpener};
pub use loader::{LoadReport, LoadedPlugin, PluginLoader, PluginStatus};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{PluginError, Result};
    pub use crate::host::{PluginHost, DEFAULT_ENTRY_SYMBOL};
    pub use crate::loader::{LoadReport, PluginLoader, PluginStatus};
}
