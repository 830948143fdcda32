//! The settings store consumed by the catalog manager.
//!
//! The engine reads two values: the global "scripting plugins enabled"
//! flag (default false) and the list of disabled script paths, stored
//! relative to the scripting root. The disabled list is written back by
//! the manager's persistence routine.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ScriptError;

/// Read/write access to the persisted scripting preferences.
pub trait SettingsStore {
    /// The global "scripting plugins enabled" flag. Defaults to false.
    fn scripting_plugins_enabled(&self) -> bool;

    /// Disabled script paths, relative to the scripting root.
    fn disabled_scripts(&self) -> Vec<PathBuf>;

    /// Replace the disabled-scripts list.
    fn set_disabled_scripts(&mut self, paths: Vec<PathBuf>);
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsData {
    #[serde(default)]
    scripting_plugins_enabled: bool,
    #[serde(default)]
    disabled_scripts: Vec<PathBuf>,
}

/// TOML-file-backed settings store.
#[derive(Debug, Clone)]
pub struct TomlSettings {
    path: PathBuf,
    data: SettingsData,
}

impl TomlSettings {
    /// Default settings path: `<config dir>/scriptorium/settings.toml`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scriptorium")
            .join("settings.toml")
    }

    /// Load settings from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ScriptError> {
        let path = path.into();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            toml::from_str(&raw).map_err(|e| ScriptError::Settings {
                message: e.to_string(),
            })?
        } else {
            SettingsData::default()
        };
        Ok(Self { path, data })
    }

    /// Write the settings back to disk, creating parent directories as
    /// needed.
    pub fn save(&self) -> Result<(), ScriptError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let raw = toml::to_string_pretty(&self.data).map_err(|e| ScriptError::Settings {
            message: e.to_string(),
        })?;
        fs::write(&self.path, raw)?;
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Set the global scripting-plugins flag.
    pub fn set_scripting_plugins_enabled(&mut self, enabled: bool) {
        self.data.scripting_plugins_enabled = enabled;
    }
}

impl SettingsStore for TomlSettings {
    fn scripting_plugins_enabled(&self) -> bool {
        self.data.scripting_plugins_enabled
    }

    fn disabled_scripts(&self) -> Vec<PathBuf> {
        self.data.disabled_scripts.clone()
    }

    fn set_disabled_scripts(&mut self, paths: Vec<PathBuf>) {
        self.data.disabled_scripts = paths;
    }
}

/// In-memory settings store for tests and embedding hosts.
#[derive(Debug, Clone, Default)]
pub struct MemorySettings {
    /// The global scripting-plugins flag.
    pub plugins_enabled: bool,
    /// Disabled script paths, relative to the scripting root.
    pub disabled: Vec<PathBuf>,
}

impl MemorySettings {
    /// Create a store with the given global flag.
    pub fn new(plugins_enabled: bool) -> Self {
        Self {
            plugins_enabled,
            disabled: Vec::new(),
        }
    }
}

impl SettingsStore for MemorySettings {
    fn scripting_plugins_enabled(&self) -> bool {
        self.plugins_enabled
    }

    fn disabled_scripts(&self) -> Vec<PathBuf> {
        self.disabled.clone()
    }

    fn set_disabled_scripts(&mut self, paths: Vec<PathBuf>) {
        self.disabled = paths;
    }
}
