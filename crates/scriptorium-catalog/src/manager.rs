//! The script manager: catalog ownership, hook dispatch, execution
//! entrypoint and disabled-list persistence.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

use scriptorium_backend::{BackendRegistry, RegistryConfig};
use scriptorium_core::{
    AppInfo, EnablementPolicy, LanguageBackend, ManagerConfig, Script, ScriptApi, ScriptContext,
    ScriptError, ScriptFolder, ScriptType, SettingsStore, Value,
};

use crate::sync::{SyncPass, SyncReport};

/// Notification sent after every successful reconciliation pass.
/// Views re-read the catalog when they receive one.
#[derive(Debug, Clone, Copy)]
pub struct CatalogChanged {
    /// Scripts newly discovered.
    pub added: usize,
    /// Scripts removed.
    pub removed: usize,
    /// Scripts retained unchanged.
    pub kept: usize,
}

/// Per-script outcome of a hook dispatch.
#[derive(Debug)]
pub struct HookRun {
    /// Script title.
    pub title: String,
    /// Script file path.
    pub path: PathBuf,
    /// What happened: result value, refusal, or execution failure.
    pub outcome: Result<Value, ScriptError>,
}

/// Owns the backend registry, the two catalog trees and the current
/// policy snapshot. One instance per process; all mutation happens on
/// the caller's thread.
pub struct ScriptManager {
    config: ManagerConfig,
    registry: BackendRegistry,
    standalone: ScriptFolder,
    hooks: ScriptFolder,
    policy: EnablementPolicy,
    app: AppInfo,
    changed_tx: broadcast::Sender<CatalogChanged>,
}

impl ScriptManager {
    /// Create a manager, initializing the backend registry from the
    /// configured plugin directory.
    pub fn new(config: ManagerConfig) -> Self {
        let registry = BackendRegistry::initialize(&RegistryConfig {
            plugin_dir: config.plugin_dir.clone(),
        });
        Self::with_registry(config, registry)
    }

    /// Create a manager around an already-built registry.
    pub fn with_registry(config: ManagerConfig, registry: BackendRegistry) -> Self {
        let (changed_tx, _) = broadcast::channel(16);
        Self {
            config,
            registry,
            standalone: ScriptFolder::new("scripts"),
            hooks: ScriptFolder::new("hooks"),
            policy: EnablementPolicy::default(),
            app: AppInfo::default(),
            changed_tx,
        }
    }

    /// Append a statically linked backend to the registry.
    pub fn register_backend(&mut self, backend: Arc<dyn LanguageBackend>) {
        self.registry.register(backend);
    }

    /// Subscribe to catalog-changed notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogChanged> {
        self.changed_tx.subscribe()
    }

    /// Reconcile the catalog trees against the scripting root.
    ///
    /// Snapshots the enablement policy and the disabled list from the
    /// settings store once, so discovery, dispatch and persistence all
    /// agree until the next pass. With `force_all` both trees are
    /// rebuilt from scratch.
    pub fn reload_scripts(&mut self, settings: &dyn SettingsStore, force_all: bool) -> SyncReport {
        self.policy = EnablementPolicy::from_settings(settings);

        let root = self.config.script_root.clone();
        let disabled: HashSet<PathBuf> = settings
            .disabled_scripts()
            .iter()
            .filter_map(|rel| root.join(rel).canonicalize().ok())
            .collect();

        let backends: Vec<Arc<dyn LanguageBackend>> = self.registry.backends().to_vec();
        let report = SyncPass::run(
            &backends,
            self.policy,
            &disabled,
            &root,
            &mut self.standalone,
            &mut self.hooks,
            force_all,
        );

        tracing::debug!(
            kept = report.kept,
            added = report.added,
            removed = report.removed,
            skipped = report.skipped.len(),
            "catalog reconciled"
        );
        let _ = self.changed_tx.send(CatalogChanged {
            added: report.added,
            removed: report.removed,
            kept: report.kept,
        });
        report
    }

    /// Read-only view of the standalone-script tree.
    pub fn scripts(&self) -> &ScriptFolder {
        &self.standalone
    }

    /// Read-only view of the hook-script tree.
    pub fn hooks(&self) -> &ScriptFolder {
        &self.hooks
    }

    /// The policy snapshot taken at the last reconciliation.
    pub fn policy(&self) -> EnablementPolicy {
        self.policy
    }

    /// Ordered view of the registered backends.
    pub fn backends(&self) -> &[Arc<dyn LanguageBackend>] {
        self.registry.backends()
    }

    /// Manager configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Every enabled hook script matching `name` case-insensitively,
    /// in current catalog order. No deduplication.
    pub fn hook_scripts(&self, name: &str) -> Vec<&Script> {
        let wanted = name.to_lowercase();
        self.hooks
            .scripts()
            .filter(|s| {
                s.script_type() == ScriptType::Hook
                    && s.is_enabled()
                    && self.policy.permits(s.backend().as_ref())
                    && s.hook_name().to_lowercase() == wanted
            })
            .collect()
    }

    /// Run every script returned by [`Self::hook_scripts`]
    /// independently; one failure never blocks the rest.
    pub fn run_hooks(&self, name: &str, context: &ScriptContext) -> Vec<HookRun> {
        self.hook_scripts(name)
            .into_iter()
            .map(|script| HookRun {
                title: script.title().to_string(),
                path: script.path().to_path_buf(),
                outcome: self.run_script(script, context, ScriptType::Hook),
            })
            .collect()
    }

    /// The execution entrypoint: validate the type, apply the policy
    /// gate and the per-script enable flag, then delegate to the
    /// owning backend. Each refusal reason is a distinct error
    /// variant, so callers can tell "refused" from "ran and failed".
    pub fn run_script(
        &self,
        script: &Script,
        context: &ScriptContext,
        expected: ScriptType,
    ) -> Result<Value, ScriptError> {
        if script.script_type() != expected {
            return Err(ScriptError::TypeMismatch {
                title: script.title().to_string(),
                expected,
            });
        }
        if !self.policy.permits(script.backend().as_ref()) {
            return Err(ScriptError::PolicyDenied);
        }
        if !script.is_enabled() {
            return Err(ScriptError::ScriptDisabled {
                title: script.title().to_string(),
            });
        }

        let mut api = ScriptApi::new(script, self.app.clone(), context);
        script.run(&mut api)
    }

    /// Find a standalone script by case-insensitive title or by path.
    pub fn find_standalone(&self, needle: &str) -> Option<&Script> {
        let lowered = needle.to_lowercase();
        let as_path = Path::new(needle).canonicalize().ok();
        self.standalone.scripts().find(|s| {
            s.title().to_lowercase() == lowered
                || as_path.as_deref().is_some_and(|p| s.path() == p)
        })
    }

    /// Flip the runtime enable flag of the script with the given path
    /// in either tree. Returns false when no such script is cataloged.
    pub fn set_script_enabled(&mut self, path: &Path, enabled: bool) -> bool {
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        for tree in [&mut self.standalone, &mut self.hooks] {
            if let Some(script) = tree.find_script_mut(&canonical) {
                script.set_enabled(enabled);
                return true;
            }
        }
        false
    }

    /// Walk both trees and persist the root-relative path of every
    /// disabled script. Scripts outside the root (symlink targets)
    /// are stored absolute so they still round-trip.
    pub fn save_disabled_list(&self, settings: &mut dyn SettingsStore) {
        let root = self
            .config
            .script_root
            .canonicalize()
            .unwrap_or_else(|_| self.config.script_root.clone());

        let disabled: Vec<PathBuf> = self
            .standalone
            .scripts()
            .chain(self.hooks.scripts())
            .filter(|s| !s.is_enabled())
            .map(|s| {
                s.path()
                    .strip_prefix(&root)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|_| s.path().to_path_buf())
            })
            .collect();

        settings.set_disabled_scripts(disabled);
    }
}
