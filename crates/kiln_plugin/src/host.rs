//! The world handle passed across the plugin boundary
//!
//! A plugin's entry point receives an opaque pointer to a [`PluginHost`]. The
//! host and the plugin must be built with the same toolchain against the same
//! `kiln_*` sources: the pointer refers to Rust types whose layout is not
//! stable across compilers.
//!
//! A plugin module links its own copy of every crate, including `log`, whose
//! logger is process-global only per module. The host's logger travels with
//! the handle and is installed in the plugin's copy before `init` runs.

use kiln_ecs::World;
use std::any::Any;
use std::ffi::c_void;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Signature of a plugin entry point
pub type PluginEntryFn = unsafe extern "C" fn(host: *mut c_void);

/// Entry symbol looked up when none is configured
pub const DEFAULT_ENTRY_SYMBOL: &str = "kiln_load_plugin";

/// What a plugin sees during its entry call
pub struct PluginHost<'w> {
    world: &'w mut World,
    module: String,
    fault: Option<String>,
    logger: &'static dyn log::Log,
    max_level: log::LevelFilter,
}

impl<'w> PluginHost<'w> {
    pub fn new(world: &'w mut World, module: impl Into<String>) -> Self {
        Self {
            world,
            module: module.into(),
            fault: None,
            logger: log::logger(),
            max_level: log::max_level(),
        }
    }

    /// The live world
    pub fn world(&mut self) -> &mut World {
        &mut *self.world
    }

    /// Name of the module being loaded
    pub fn module_name(&self) -> &str {
        &self.module
    }

    /// Mark the entry call as failed. The loader aborts the scan.
    pub fn report_fault(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::error!("Plugin '{}' reported a fault: {}", self.module, message);
        self.fault = Some(message);
    }

    pub fn has_fault(&self) -> bool {
        self.fault.is_some()
    }

    pub(crate) fn take_fault(&mut self) -> Option<String> {
        self.fault.take()
    }

    /// The opaque handle handed to entry points
    pub fn as_handle(&mut self) -> *mut c_void {
        self as *mut Self as *mut c_void
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run a plugin initializer behind an entry point.
///
/// Panics raised by `init` are caught and recorded as a fault on the host, so
/// they never unwind across the `extern "C"` boundary.
///
/// # Safety
///
/// `handle` must be null or the pointer the loader passed to the entry point,
/// still live for the duration of this call.
pub unsafe fn run_entry<F>(handle: *mut c_void, init: F)
where
    F: FnOnce(&mut PluginHost<'_>),
{
    if handle.is_null() {
        log::error!("Plugin entry called with a null world handle");
        return;
    }
    let host = &mut *(handle as *mut PluginHost<'_>);
    // Fails harmlessly when this module already has a logger
    let _ = log::set_logger(host.logger);
    log::set_max_level(host.max_level);
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| init(&mut *host))) {
        host.report_fault(format!("panicked: {}", panic_message(payload.as_ref())));
    }
}

/// Export a plugin entry point.
///
/// ```no_run
/// use kiln_plugin::PluginHost;
///
/// fn init(host: &mut PluginHost<'_>) {
///     let world = host.world();
///     world.spawn();
/// }
///
/// kiln_plugin::declare_plugin!(init);
/// ```
///
/// The one-argument form exports `kiln_load_plugin`; pass a symbol name first
/// to export a different one.
#[macro_export]
macro_rules! declare_plugin {
    ($init:path) => {
        $crate::declare_plugin!(kiln_load_plugin, $init);
    };
    ($symbol:ident, $init:path) => {
        #[no_mangle]
        pub unsafe extern "C" fn $symbol(handle: *mut ::std::ffi::c_void) {
            $crate::host::run_entry(handle, $init);
        }
    };
}
