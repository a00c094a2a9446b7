//! Opening plugin modules and resolving their entry points

use crate::error::{PluginError, Result};
use crate::host::PluginEntryFn;
use libloading::{Library, Symbol};
use std::path::{Path, PathBuf};

/// An opened plugin module
pub trait Module: Send {
    /// Resolve the entry function exported under `symbol`
    fn entry(&self, symbol: &str) -> Result<PluginEntryFn>;
}

/// Opens modules from disk
pub trait ModuleOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Module>>;
}

/// Opens modules as native dynamic libraries
#[derive(Debug, Default, Clone, Copy)]
pub struct DylibOpener;

impl ModuleOpener for DylibOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn Module>> {
        Ok(Box::new(DylibModule::load(path)?))
    }
}

/// A native dynamic library
pub struct DylibModule {
    library: Library,
    path: PathBuf,
}

impl DylibModule {
    /// Load a library from a path
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Runs the library's initializers, which we cannot vet
        let library = unsafe { Library::new(path).map_err(|e| PluginError::open_failed(path, e.to_string()))? };

        log::debug!("Opened plugin module: {}", path.display());

        Ok(Self {
            library,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Module for DylibModule {
    fn entry(&self, symbol: &str) -> Result<PluginEntryFn> {
        let mut name = symbol.as_bytes().to_vec();
        name.push(0);

        let entry: Symbol<PluginEntryFn> = unsafe {
            self.library
                .get(&name)
                .map_err(|_| PluginError::entry_missing(&self.path, symbol))?
        };
        Ok(*entry)
    }
}
