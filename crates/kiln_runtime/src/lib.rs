//! # kiln_runtime - Engine Runtime
//!
//! Everything the `kiln` binary needs around the world itself:
//!
//! - [`MainLoop`]: ticks `Execute` handlers with a time-scaled delta and
//!   applies deferred commands until termination is requested
//! - [`EngineConfig`]: `kiln.toml` plus `KILN_*` environment overrides
//! - [`scene`]: JSON save/load through the type registry
//! - [`RecentList`]: line-oriented recently-used list
//! - [`builtin`]: component types registered in every world
//!
//! ## Example
//!
//! ```
//! use kiln_ecs::{function::Execute, World};
//! use kiln_runtime::{MainLoop, MainLoopConfig, TerminationFlag};
//!
//! let mut world = World::new();
//! let e = world.spawn();
//! world
//!     .attach(e, Execute::new(|world, _dt| {
//!         world.resource::<TerminationFlag>().unwrap().request();
//!     }))
//!     .unwrap();
//!
//! let mut main_loop = MainLoop::new(&MainLoopConfig::default());
//! main_loop.run(&mut world);
//! main_loop.shutdown(&mut world);
//! assert_eq!(main_loop.frame().frame, 1);
//! ```

pub mod builtin;
pub mod config;
pub mod main_loop;
pub mod recent;
pub mod scene;

pub use builtin::{register_builtin_types, Editor, Name, TimeModulator, Transform};
pub use config::{ConfigError, EditorConfig, EngineConfig, MainLoopConfig, PluginConfig, SceneConfig};
pub use main_loop::{FrameInfo, MainLoop, TerminationFlag};
pub use recent::RecentList;
pub use scene::{SceneDocument, SceneError};
