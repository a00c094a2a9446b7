//! Directory scanning and plugin entry invocation

use crate::error::{PluginError, Result};
use crate::host::PluginHost;
use crate::library::{DylibOpener, Module, ModuleOpener};
use kiln_ecs::World;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};

/// Lifecycle of a plugin module. There is no way back from `Resident`:
/// modules stay mapped for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginStatus {
    Unloaded,
    Open,
    EntryInvoked,
    Resident,
    FailedEntry,
}

/// A module whose entry point has been invoked
pub struct LoadedPlugin {
    name: String,
    path: PathBuf,
    status: PluginStatus,
    // Function components registered by the plugin point into its code
    _module: ManuallyDrop<Box<dyn Module>>,
}

impl LoadedPlugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn status(&self) -> PluginStatus {
        self.status
    }
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("status", &self.status)
            .finish()
    }
}

/// Outcome of one directory scan
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Modules whose entry ran successfully, in load order
    pub loaded: Vec<String>,
    /// Modules passed over, with the reason
    pub skipped: Vec<(PathBuf, PluginError)>,
}

/// Loads plugin modules from a directory into a world
pub struct PluginLoader<O: ModuleOpener = DylibOpener> {
    opener: O,
    extension: String,
    plugins: Vec<LoadedPlugin>,
}

impl PluginLoader<DylibOpener> {
    /// Loader for native libraries with the platform's extension
    pub fn new() -> Self {
        Self::with_opener(DylibOpener, std::env::consts::DLL_EXTENSION)
    }
}

impl Default for PluginLoader<DylibOpener> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: ModuleOpener> PluginLoader<O> {
    /// Loader with a custom opener, treating files with `extension` as modules
    pub fn with_opener(opener: O, extension: impl Into<String>) -> Self {
        Self {
            opener,
            extension: extension.into(),
            plugins: Vec::new(),
        }
    }

    /// Plugins loaded so far, in load order
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    /// Whether a module with this name has been loaded
    pub fn is_loaded(&self, name: &str) -> bool {
        self.plugins.iter().any(|p| p.name == name)
    }

    fn module_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|source| PluginError::Scan {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(self.extension.as_str()))
            .collect();
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        Ok(files)
    }

    /// Load every module in `dir` not loaded yet, in file-name order.
    ///
    /// Each module is opened, its `entry_symbol` resolved, and the entry
    /// invoked once with a handle to `world`. Modules that fail to open or
    /// lack the symbol are skipped and listed in the report. A missing
    /// directory yields an empty report.
    ///
    /// # Errors
    ///
    /// [`PluginError::EntryFaulted`] if an entry panics or reports a fault.
    /// The scan stops there; modules already loaded, and whatever the failed
    /// entry registered before faulting, remain in the world.
    pub fn rescan_directory(
        &mut self,
        dir: impl AsRef<Path>,
        entry_symbol: &str,
        world: &mut World,
    ) -> Result<LoadReport> {
        let dir = dir.as_ref();
        let mut report = LoadReport::default();

        if !dir.is_dir() {
            log::warn!("Plugin directory '{}' does not exist, nothing loaded", dir.display());
            return Ok(report);
        }

        for path in self.module_files(dir)? {
            if self.plugins.iter().any(|p| p.path == path) {
                log::debug!("Plugin '{}' already resident", path.display());
                continue;
            }
            let name = module_name(&path);
            let mut status = PluginStatus::Unloaded;

            let module = match self.opener.open(&path) {
                Ok(module) => module,
                Err(err) => {
                    log::warn!("Skipping plugin '{}': {}", name, err);
                    report.skipped.push((path, err));
                    continue;
                }
            };

            advance(&name, &mut status, PluginStatus::Open);

            let entry = match module.entry(entry_symbol) {
                Ok(entry) => entry,
                Err(err) => {
                    log::warn!("Skipping plugin '{}': {}", name, err);
                    report.skipped.push((path, err));
                    continue;
                }
            };

            let mut host = PluginHost::new(world, name.clone());
            // `host` outlives the call, and the module is never unmapped
            unsafe { entry(host.as_handle()) };
            let fault = host.take_fault();
            advance(&name, &mut status, PluginStatus::EntryInvoked);

            let next = if fault.is_some() {
                PluginStatus::FailedEntry
            } else {
                PluginStatus::Resident
            };
            advance(&name, &mut status, next);
            self.plugins.push(LoadedPlugin {
                name: name.clone(),
                path,
                status,
                _module: ManuallyDrop::new(module),
            });

            if let Some(message) = fault {
                log::error!("Plugin '{}' faulted, aborting scan", name);
                return Err(PluginError::EntryFaulted { module: name, message });
            }

            log::info!("Loaded plugin '{}'", name);
            report.loaded.push(name);
        }

        Ok(report)
    }
}

fn advance(name: &str, status: &mut PluginStatus, next: PluginStatus) {
    log::trace!("Plugin '{}': {:?} -> {:?}", name, status, next);
    *status = next;
}

fn module_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_strips_extension() {
        assert_eq!(module_name(Path::new("/plugins/libeditor.so")), "libeditor");
        assert_eq!(module_name(Path::new("physics.dll")), "physics");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let mut world = World::new();
        let mut loader = PluginLoader::new();
        let report = loader
            .rescan_directory("/no/such/plugin/dir", "kiln_load_plugin", &mut world)
            .unwrap();
        assert!(report.loaded.is_empty());
        assert!(report.skipped.is_empty());
        assert!(loader.plugins().is_empty());
    }
}
