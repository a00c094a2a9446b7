//! Error types for plugin loading

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type for plugin operations
pub type Result<T> = std::result::Result<T, PluginError>;

/// Errors that can occur while loading plugin modules
#[derive(Debug, Error)]
pub enum PluginError {
    /// The module could not be opened as a dynamic library
    #[error("Failed to open plugin module '{path}': {message}")]
    OpenFailed { path: PathBuf, message: String },

    /// The module does not export the entry symbol
    #[error("Entry symbol '{symbol}' not found in plugin module '{path}'")]
    EntryMissing { path: PathBuf, symbol: String },

    /// The entry function panicked or reported a fault
    #[error("Plugin '{module}' faulted during its entry call: {message}")]
    EntryFaulted { module: String, message: String },

    /// The plugin directory could not be listed
    #[error("Failed to scan plugin directory '{path}': {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PluginError {
    /// Create an open failure
    pub fn open_failed(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::OpenFailed {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a missing entry error
    pub fn entry_missing(path: impl AsRef<Path>, symbol: impl Into<String>) -> Self {
        Self::EntryMissing {
            path: path.as_ref().to_path_buf(),
            symbol: symbol.into(),
        }
    }

    /// Whether the loader skips this error and continues the scan
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::OpenFailed { .. } | Self::EntryMissing { .. })
    }
}
