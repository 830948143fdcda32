//! Statically linked Lua backend (cargo feature `lua`).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use mlua::{Lua, Value as LuaValue};

use scriptorium_core::{LanguageBackend, Script, ScriptApi, ScriptError, Value};

/// Lua backend over `mlua`. Each execution gets a fresh interpreter
/// state, so scripts cannot leak globals into one another.
pub struct LuaBackend;

impl LuaBackend {
    /// Create the backend.
    pub fn new() -> Self {
        Self
    }

    fn fresh_state(&self) -> Result<Lua, mlua::Error> {
        let lua = Lua::new();
        // Scripts must not chain-load arbitrary files.
        lua.globals().set("loadfile", LuaValue::Nil)?;
        lua.globals().set("dofile", LuaValue::Nil)?;

        let log_info = lua.create_function(|_, msg: String| {
            tracing::info!(target: "script", "{}", msg);
            Ok(())
        })?;
        lua.globals().set("log_info", log_info)?;

        let log_warn = lua.create_function(|_, msg: String| {
            tracing::warn!(target: "script", "{}", msg);
            Ok(())
        })?;
        lua.globals().set("log_warn", log_warn)?;

        let log_error = lua.create_function(|_, msg: String| {
            tracing::error!(target: "script", "{}", msg);
            Ok(())
        })?;
        lua.globals().set("log_error", log_error)?;

        Ok(lua)
    }

    fn lua_to_value(val: &LuaValue) -> Value {
        match val {
            LuaValue::Nil => Value::Null,
            LuaValue::Boolean(b) => Value::Bool(*b),
            LuaValue::Integer(i) => Value::Integer(*i),
            LuaValue::Number(n) => Value::Float(*n),
            LuaValue::String(s) => Value::String(s.to_string_lossy().to_string()),
            LuaValue::Table(table) => {
                let len = table.raw_len();
                if len > 0 {
                    let mut arr = Vec::with_capacity(len);
                    for i in 1..=len {
                        let item: LuaValue = table.raw_get(i).unwrap_or(LuaValue::Nil);
                        arr.push(Self::lua_to_value(&item));
                    }
                    Value::Array(arr)
                } else {
                    let mut obj = HashMap::new();
                    for pair in table.clone().pairs::<String, LuaValue>() {
                        if let Ok((k, v)) = pair {
                            obj.insert(k, Self::lua_to_value(&v));
                        }
                    }
                    Value::Object(obj)
                }
            }
            _ => Value::Null,
        }
    }

    fn value_to_lua(lua: &Lua, val: &Value) -> Result<LuaValue, mlua::Error> {
        Ok(match val {
            Value::Null => LuaValue::Nil,
            Value::Bool(b) => LuaValue::Boolean(*b),
            Value::Integer(i) => LuaValue::Integer(*i),
            Value::Float(f) => LuaValue::Number(*f),
            Value::String(s) => LuaValue::String(lua.create_string(s)?),
            Value::Array(arr) => {
                let table = lua.create_table()?;
                for (i, item) in arr.iter().enumerate() {
                    table.raw_set(i + 1, Self::value_to_lua(lua, item)?)?;
                }
                LuaValue::Table(table)
            }
            Value::Object(obj) => {
                let table = lua.create_table()?;
                for (k, v) in obj {
                    table.raw_set(k.as_str(), Self::value_to_lua(lua, v)?)?;
                }
                LuaValue::Table(table)
            }
        })
    }
}

impl Default for LuaBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl LanguageBackend for LuaBackend {
    fn name(&self) -> &str {
        "Lua"
    }

    fn url(&self) -> &str {
        "https://www.lua.org/"
    }

    fn line_comment(&self) -> &str {
        "--"
    }

    fn handles_file(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "lua")
    }

    fn execute(&self, script: &Script, api: &mut ScriptApi) -> Result<Value, ScriptError> {
        let source = fs::read_to_string(script.path())?;
        let title = script.title().to_string();

        let run = || -> Result<Value, mlua::Error> {
            let lua = self.fresh_state()?;
            let globals = lua.globals();
            globals.set("script_title", title.as_str())?;
            globals.set("script_file", script.path().to_string_lossy().as_ref())?;
            globals.set("app_name", api.app.name.as_str())?;
            globals.set("app_version", api.app.version.as_str())?;
            globals.set("target", api.context.target.as_str())?;

            let context = lua.create_table()?;
            for (key, value) in &api.context.data {
                context.raw_set(key.as_str(), Self::value_to_lua(&lua, value)?)?;
            }
            globals.set("context", context)?;

            let result: LuaValue = lua.load(&source).set_name(&title).eval()?;
            Ok(Self::lua_to_value(&result))
        };

        let value = run().map_err(|e| ScriptError::execution(&title, e.to_string()))?;
        api.result = value.clone();
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptorium_core::{AppInfo, ScriptContext};
    use std::sync::Arc;

    #[test]
    fn test_handles_lua_files_only() {
        let backend = LuaBackend::new();
        assert!(backend.handles_file(Path::new("a.lua")));
        assert!(!backend.handles_file(Path::new("a.rhai")));
        assert!(!backend.is_builtin());
    }

    #[test]
    fn test_execute_lua_script() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sum.lua");
        fs::write(
            &path,
            "-- ScriptoriumScript\n-- Title: Sum\n-- Script-Type: standalone\n\nreturn 40 + 2\n",
        )
        .unwrap();
        let mut script = Script::discover(&path, Arc::new(LuaBackend::new())).unwrap();
        script.parse_header().unwrap();

        let ctx = ScriptContext::default();
        let mut api = ScriptApi::new(&script, AppInfo::default(), &ctx);
        let value = script.run(&mut api).unwrap();
        assert_eq!(value, Value::Integer(42));
    }
}
