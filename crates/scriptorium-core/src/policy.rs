//! The cross-cutting enablement policy.

use crate::backend::LanguageBackend;
use crate::settings::SettingsStore;

/// The rule that decides whether a backend's scripts may be retained
/// in the catalog or executed.
///
/// Built once per reconciliation pass from the settings store and
/// threaded explicitly into the synchronizer, the dispatcher and the
/// execution path, so catalog membership and dispatch can never
/// disagree. The built-in backend is always exempt from the global
/// gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EnablementPolicy {
    /// The global "scripting plugins enabled" setting.
    pub plugins_enabled: bool,
}

impl EnablementPolicy {
    /// Snapshot the policy from the settings store.
    pub fn from_settings(settings: &dyn SettingsStore) -> Self {
        Self {
            plugins_enabled: settings.scripting_plugins_enabled(),
        }
    }

    /// Whether scripts owned by `backend` are permitted.
    pub fn permits(&self, backend: &dyn LanguageBackend) -> bool {
        backend.is_builtin() || self.plugins_enabled
    }
}
