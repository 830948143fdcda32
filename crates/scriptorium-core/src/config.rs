//! Manager configuration.

use std::path::PathBuf;

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// Configuration for the script catalog manager.
#[derive(Debug, Clone, Builder, Serialize, Deserialize)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct ManagerConfig {
    /// Root of the scripting directory tree.
    pub script_root: PathBuf,

    /// Explicit backend plugin directory. When unset, the registry
    /// falls back to the environment override, then to a `plugins/`
    /// directory next to the executable.
    #[builder(default)]
    #[serde(default)]
    pub plugin_dir: Option<PathBuf>,
}

impl ManagerConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.script_root {
            Some(root) if root.as_os_str().is_empty() => {
                Err("Script root cannot be empty".to_string())
            }
            Some(_) => Ok(()),
            None => Err("Script root is required".to_string()),
        }
    }
}

impl ManagerConfig {
    /// Create a new config builder.
    pub fn builder() -> ManagerConfigBuilder {
        ManagerConfigBuilder::default()
    }

    /// Create a simple config rooted at `script_root`.
    pub fn new(script_root: impl Into<PathBuf>) -> Self {
        Self {
            script_root: script_root.into(),
            plugin_dir: None,
        }
    }

    /// Conventional scripting root:
    /// `<config dir>/scriptorium/scripts`.
    pub fn default_script_root() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("scriptorium")
            .join("scripts")
    }
}
