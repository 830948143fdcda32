//! The language-backend trait and the execution context bundle.
//!
//! A backend recognizes and executes scripts written in one scripting
//! language. Backends are registered once at startup and live for the
//! process lifetime; the catalog never owns one.

use std::collections::HashMap;
use std::path::Path;

use crate::error::ScriptError;
use crate::script::Script;
use crate::value::Value;

/// Trait every scripting-language backend must satisfy.
///
/// Implementations may be statically compiled into the host or loaded
/// from a plugin directory at startup.
pub trait LanguageBackend: Send + Sync {
    /// Display name of the language, e.g. "Rhai".
    fn name(&self) -> &str;

    /// URL with more information about the language.
    fn url(&self) -> &str;

    /// Line comment prefix used by the header parser, e.g. `//`.
    fn line_comment(&self) -> &str;

    /// Whether this backend can handle the given file.
    fn handles_file(&self, path: &Path) -> bool;

    /// Whether this is the built-in backend, which is exempt from the
    /// global scripting-plugins gate.
    fn is_builtin(&self) -> bool {
        false
    }

    /// Execute a script, returning its result value.
    fn execute(&self, script: &Script, api: &mut ScriptApi) -> Result<Value, ScriptError>;
}

/// Process-wide information about the hosting application.
#[derive(Debug, Clone)]
pub struct AppInfo {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
}

impl Default for AppInfo {
    fn default() -> Self {
        Self {
            name: "scriptorium".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Caller-supplied context for one script invocation.
///
/// `target` identifies the surface the script runs against (a window
/// class name in the original desktop host, a free-form identifier
/// here); `data` carries arbitrary key/value inputs the backend exposes
/// to the script.
#[derive(Debug, Clone, Default)]
pub struct ScriptContext {
    /// Identifier of the invoking surface; empty means "any".
    pub target: String,
    /// Key/value inputs exposed to the script.
    pub data: HashMap<String, Value>,
}

impl ScriptContext {
    /// Create a context for the given target surface.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            data: HashMap::new(),
        }
    }

    /// Add a data entry, builder-style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

/// The bundle handed to a backend for one execution: the invoking
/// script, the application handle, the caller's context, and a mutable
/// result slot host functions may write into.
pub struct ScriptApi<'a> {
    /// The script being executed.
    pub script: &'a Script,
    /// Process-wide application information.
    pub app: AppInfo,
    /// Caller-supplied invocation context.
    pub context: &'a ScriptContext,
    /// Result slot; backends may overwrite this from host functions.
    pub result: Value,
}

impl<'a> ScriptApi<'a> {
    /// Create the execution bundle for one invocation.
    pub fn new(script: &'a Script, app: AppInfo, context: &'a ScriptContext) -> Self {
        Self {
            script,
            app,
            context,
            result: Value::Null,
        }
    }
}
