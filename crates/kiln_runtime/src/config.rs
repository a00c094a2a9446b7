//! Engine Configuration
//!
//! Settings are read from `kiln.toml` in the working directory, then
//! overridden from the environment.
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `KILN_PLUGIN_DIR`, `KILN_ENTRY_SYMBOL`, `KILN_SCENE`
//! 2. Config file: `kiln.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! [plugins]
//! directory = "plugins"
//! entry_symbol = "kiln_load_plugin"
//!
//! [main_loop]
//! max_delta_seconds = 0.25
//! target_tick_rate = 60
//! time_scale = 1.0
//!
//! [editor]
//! recent_file = "recentEditor.txt"
//! recent_capacity = 10
//!
//! [scene]
//! startup = "scenes/start.json"
//! ```

use kiln_plugin::DEFAULT_ENTRY_SYMBOL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading the engine configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Where plugins are loaded from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginConfig {
    /// Directory scanned for plugin modules
    pub directory: PathBuf,
    /// Symbol each module must export
    pub entry_symbol: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("plugins"),
            entry_symbol: DEFAULT_ENTRY_SYMBOL.to_string(),
        }
    }
}

/// Main loop pacing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MainLoopConfig {
    /// Upper bound on the delta passed to `Execute`, in seconds
    pub max_delta_seconds: f32,
    /// Ticks per second; `None` runs flat out
    pub target_tick_rate: Option<u32>,
    /// Multiplier applied to the clamped delta. 0 pauses game time.
    pub time_scale: f32,
}

impl Default for MainLoopConfig {
    fn default() -> Self {
        Self {
            max_delta_seconds: 0.25,
            target_tick_rate: Some(60),
            time_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Line-oriented list of recently used editors
    pub recent_file: PathBuf,
    pub recent_capacity: usize,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            recent_file: PathBuf::from("recentEditor.txt"),
            recent_capacity: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Scene loaded after plugins, if any
    pub startup: Option<PathBuf>,
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub plugins: PluginConfig,
    pub main_loop: MainLoopConfig,
    pub editor: EditorConfig,
    pub scene: SceneConfig,
    /// File the configuration was read from
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl EngineConfig {
    /// File read by [`load`](Self::load) when no path is given
    pub const DEFAULT_PATH: &'static str = "kiln.toml";

    /// Load from `path`, falling back to defaults if the file does not
    /// exist, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// A file that exists but cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// [`load`](Self::load) with overrides taken from `lookup` instead of the
    /// process environment
    pub fn load_with(path: impl AsRef<Path>, lookup: impl Fn(&str) -> Option<String>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let config = Self::load_from_file(path)?;
            log::info!("Loaded engine config from {}", path.display());
            config
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from a TOML string. Omitted keys keep their defaults.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `KILN_*` environment variables
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Override settings from any key lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("KILN_PLUGIN_DIR").filter(|v| !v.is_empty()) {
            self.plugins.directory = PathBuf::from(dir);
            log::info!("Plugin directory from env: {}", self.plugins.directory.display());
        }

        if let Some(symbol) = lookup("KILN_ENTRY_SYMBOL").filter(|v| !v.is_empty()) {
            self.plugins.entry_symbol = symbol;
            log::info!("Entry symbol from env: {}", self.plugins.entry_symbol);
        }

        if let Some(scene) = lookup("KILN_SCENE") {
            // An empty value disables the configured startup scene
            self.scene.startup = (!scene.is_empty()).then(|| PathBuf::from(scene));
            log::info!("Startup scene from env: {:?}", self.scene.startup);
        }
    }

    fn validate(&self) -> ConfigResult<()> {
        if !(self.main_loop.max_delta_seconds.is_finite() && self.main_loop.max_delta_seconds > 0.0) {
            return Err(ConfigError::Validation(format!(
                "main_loop.max_delta_seconds must be positive, got {}",
                self.main_loop.max_delta_seconds
            )));
        }
        if !(self.main_loop.time_scale.is_finite() && self.main_loop.time_scale >= 0.0) {
            return Err(ConfigError::Validation(format!(
                "main_loop.time_scale must be zero or positive, got {}",
                self.main_loop.time_scale
            )));
        }
        if self.main_loop.target_tick_rate == Some(0) {
            return Err(ConfigError::Validation(
                "main_loop.target_tick_rate must be at least 1".to_string(),
            ));
        }
        if self.plugins.entry_symbol.is_empty() {
            return Err(ConfigError::Validation("plugins.entry_symbol is empty".to_string()));
        }
        Ok(())
    }

    /// Log the effective configuration
    pub fn print_summary(&self) {
        log::info!("Engine Configuration:");
        log::info!(
            "  Plugins: {} (entry '{}')",
            self.plugins.directory.display(),
            self.plugins.entry_symbol
        );
        match self.main_loop.target_tick_rate {
            Some(rate) => log::info!(
                "  Main loop: {} Hz, max delta {}s",
                rate,
                self.main_loop.max_delta_seconds
            ),
            None => log::info!("  Main loop: unpaced, max delta {}s", self.main_loop.max_delta_seconds),
        }
        if self.main_loop.time_scale != 1.0 {
            log::info!("  Time scale: {}", self.main_loop.time_scale);
        }
        if let Some(scene) = &self.scene.startup {
            log::info!("  Startup scene: {}", scene.display());
        }
        if let Some(path) = &self.config_path {
            log::info!("  Config: {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.plugins.directory, PathBuf::from("plugins"));
        assert_eq!(config.plugins.entry_symbol, "kiln_load_plugin");
        assert_eq!(config.main_loop.target_tick_rate, Some(60));
        assert!(config.scene.startup.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [plugins]
            directory = "mods"

            [main_loop]
            target_tick_rate = 30
            "#,
        )
        .unwrap();

        assert_eq!(config.plugins.directory, PathBuf::from("mods"));
        assert_eq!(config.plugins.entry_symbol, "kiln_load_plugin");
        assert_eq!(config.main_loop.target_tick_rate, Some(30));
        assert_eq!(config.main_loop.max_delta_seconds, 0.25);
        assert_eq!(config.editor.recent_capacity, 10);
    }

    #[test]
    fn test_malformed_toml() {
        let err = EngineConfig::from_toml("[plugins\ndirectory = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation() {
        let err = EngineConfig::from_toml("[main_loop]\nmax_delta_seconds = -1.0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = EngineConfig::from_toml("[main_loop]\ntarget_tick_rate = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = EngineConfig::from_toml("[main_loop]\ntime_scale = -0.5").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_time_scale() {
        assert_eq!(EngineConfig::default().main_loop.time_scale, 1.0);
        let config = EngineConfig::from_toml("[main_loop]\ntime_scale = 0.5").unwrap();
        assert_eq!(config.main_loop.time_scale, 0.5);
        assert!(EngineConfig::from_toml("[main_loop]\ntime_scale = 0.0").is_ok());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [
            ("KILN_PLUGIN_DIR", "/opt/kiln/plugins"),
            ("KILN_ENTRY_SYMBOL", "custom_init"),
            ("KILN_SCENE", "level.json"),
        ]
        .into_iter()
        .collect();

        let mut config = EngineConfig::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.plugins.directory, PathBuf::from("/opt/kiln/plugins"));
        assert_eq!(config.plugins.entry_symbol, "custom_init");
        assert_eq!(config.scene.startup, Some(PathBuf::from("level.json")));
    }

    #[test]
    fn test_empty_scene_override_clears_startup() {
        let mut config = EngineConfig::from_toml("[scene]\nstartup = \"a.json\"").unwrap();
        config.apply_overrides(|key| (key == "KILN_SCENE").then(String::new));
        assert!(config.scene.startup.is_none());
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_with(dir.path().join("kiln.toml"), |_| None).unwrap();
        assert!(config.config_path.is_none());
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_load_applies_given_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.toml");
        std::fs::write(&path, "[plugins]\ndirectory = \"mods\"\n").unwrap();

        let config = EngineConfig::load_with(&path, |key| {
            (key == "KILN_PLUGIN_DIR").then(|| "env_mods".to_string())
        })
        .unwrap();
        assert_eq!(config.plugins.directory, PathBuf::from("env_mods"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_from_file_records_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiln.toml");
        std::fs::write(&path, "[editor]\nrecent_capacity = 3\n").unwrap();

        let config = EngineConfig::load_from_file(&path).unwrap();
        assert_eq!(config.editor.recent_capacity, 3);
        assert_eq!(config.config_path, Some(path));
    }
}
