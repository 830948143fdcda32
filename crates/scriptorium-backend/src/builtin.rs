//! The built-in Rhai backend.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use rhai::{Dynamic, Engine, Scope};

use scriptorium_core::{LanguageBackend, Script, ScriptApi, ScriptError, Value};

/// The built-in scripting backend, always registered first and always
/// exempt from the global scripting-plugins gate.
pub struct RhaiBackend {
    engine: Engine,
}

impl RhaiBackend {
    /// Create the backend with a hardened engine.
    pub fn new() -> Self {
        let mut engine = Engine::new();

        // Runaway-script limits.
        engine.set_max_expr_depths(64, 64);
        engine.set_max_call_levels(64);
        engine.set_max_operations(1_000_000);
        engine.set_max_modules(100);
        engine.set_max_string_size(1024 * 1024);
        engine.set_max_array_size(10_000);
        engine.set_max_map_size(10_000);

        engine.register_fn("log_info", |msg: &str| {
            tracing::info!(target: "script", "{}", msg);
        });
        engine.register_fn("log_warn", |msg: &str| {
            tracing::warn!(target: "script", "{}", msg);
        });
        engine.register_fn("log_error", |msg: &str| {
            tracing::error!(target: "script", "{}", msg);
        });

        Self { engine }
    }

    /// Convert a Rhai Dynamic to our Value type.
    fn dynamic_to_value(val: &Dynamic) -> Value {
        if val.is_unit() {
            Value::Null
        } else if val.is_bool() {
            Value::Bool(val.as_bool().unwrap_or(false))
        } else if val.is_int() {
            Value::Integer(val.as_int().unwrap_or(0))
        } else if val.is_float() {
            Value::Float(val.as_float().unwrap_or(0.0))
        } else if val.is_string() {
            Value::String(val.clone().into_string().unwrap_or_default())
        } else if val.is_array() {
            let arr = val.clone().into_array().unwrap_or_default();
            Value::Array(arr.iter().map(Self::dynamic_to_value).collect())
        } else if val.is_map() {
            let map = val.clone().cast::<rhai::Map>();
            let obj: HashMap<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k.to_string(), Self::dynamic_to_value(&v)))
                .collect();
            Value::Object(obj)
        } else {
            Value::Null
        }
    }

    /// Convert our Value type to a Rhai Dynamic.
    fn value_to_dynamic(val: &Value) -> Dynamic {
        match val {
            Value::Null => Dynamic::UNIT,
            Value::Bool(b) => Dynamic::from(*b),
            Value::Integer(i) => Dynamic::from(*i),
            Value::Float(f) => Dynamic::from(*f),
            Value::String(s) => Dynamic::from(s.clone()),
            Value::Array(arr) => {
                let rhai_arr: rhai::Array = arr.iter().map(Self::value_to_dynamic).collect();
                Dynamic::from(rhai_arr)
            }
            Value::Object(obj) => {
                let mut map = rhai::Map::new();
                for (k, v) in obj {
                    map.insert(k.clone().into(), Self::value_to_dynamic(v));
                }
                Dynamic::from(map)
            }
        }
    }
}

impl Default for RhaiBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for RhaiBackend {
    fn name(&self) -> &str {
        "Rhai"
    }

    fn url(&self) -> &str {
        "https://rhai.rs/"
    }

    fn line_comment(&self) -> &str {
        "//"
    }

    fn handles_file(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "rhai")
    }

    fn is_builtin(&self) -> bool {
        true
    }

    fn execute(&self, script: &Script, api: &mut ScriptApi) -> Result<Value, ScriptError> {
        let source = fs::read_to_string(script.path())?;

        let mut scope = Scope::new();
        scope.push_constant("script_title", script.title().to_string());
        scope.push_constant("script_file", script.path().to_string_lossy().to_string());
        scope.push_constant("app_name", api.app.name.clone());
        scope.push_constant("app_version", api.app.version.clone());
        scope.push_constant("target", api.context.target.clone());

        let mut context = rhai::Map::new();
        for (key, value) in &api.context.data {
            context.insert(key.clone().into(), Self::value_to_dynamic(value));
        }
        scope.push_constant("context", context);

        let result = self
            .engine
            .eval_with_scope::<Dynamic>(&mut scope, &source)
            .map_err(|e| ScriptError::execution(script.title(), e.to_string()))?;

        let value = Self::dynamic_to_value(&result);
        api.result = value.clone();
        Ok(value)
    }
}
