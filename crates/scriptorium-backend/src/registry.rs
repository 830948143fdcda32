//! The language backend registry.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use scriptorium_core::LanguageBackend;

use crate::builtin::RhaiBackend;
use crate::dynamic::DynamicBackend;

/// Environment variable overriding the backend plugin directory.
pub const PLUGIN_PATH_ENV: &str = "SCRIPTORIUM_PLUGIN_PATH";

/// Configuration for registry initialization.
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Explicit plugin directory. Takes precedence over the
    /// environment override and the executable-relative default.
    pub plugin_dir: Option<PathBuf>,
}

/// The ordered set of available scripting-language backends.
///
/// Registration order is built-in, then statically linked, then
/// dynamically loaded; later entries are appended, never prioritized.
/// Classification is first-match-wins over this order.
pub struct BackendRegistry {
    backends: Vec<Arc<dyn LanguageBackend>>,
}

impl BackendRegistry {
    /// Build the registry. Initialization is infallible; every
    /// individual plugin failure degrades to a skipped entry.
    pub fn initialize(config: &RegistryConfig) -> Self {
        let mut registry = Self {
            backends: Vec::new(),
        };

        // The built-in backend is always present and always first.
        registry.register(Arc::new(RhaiBackend::new()));

        #[cfg(feature = "lua")]
        registry.register(Arc::new(crate::lua::LuaBackend::new()));

        if let Some(dir) = resolve_plugin_dir(config) {
            registry.load_dynamic_backends(&dir);
        }

        registry
    }

    /// Append a backend. Public so hosts and tests can add statically
    /// linked backends of their own.
    pub fn register(&mut self, backend: Arc<dyn LanguageBackend>) {
        tracing::debug!(name = backend.name(), "registered language backend");
        self.backends.push(backend);
    }

    /// Ordered read-only view of the registered backends.
    pub fn backends(&self) -> &[Arc<dyn LanguageBackend>] {
        &self.backends
    }

    /// Attempt to load every regular file in `dir` as a dynamic
    /// backend, silently skipping the ones that fail.
    fn load_dynamic_backends(&mut self, dir: &Path) {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "no plugin directory");
                return;
            }
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            // SAFETY: plugin directories are host-controlled; loading
            // an untrusted library is the operator's call.
            match unsafe { DynamicBackend::load(&path) } {
                Ok(backend) => self.register(Arc::new(backend)),
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipped plugin file");
                }
            }
        }
    }
}

/// Resolve the plugin directory: explicit config, then the
/// environment override, then `plugins/` next to the executable.
fn resolve_plugin_dir(config: &RegistryConfig) -> Option<PathBuf> {
    if let Some(dir) = &config.plugin_dir {
        return Some(dir.clone());
    }
    if let Ok(dir) = std::env::var(PLUGIN_PATH_ENV) {
        if !dir.is_empty() {
            return Some(PathBuf::from(dir));
        }
    }
    let exe = std::env::current_exe().ok()?;
    Some(exe.parent()?.join("plugins"))
}
