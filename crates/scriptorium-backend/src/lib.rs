//! Language backends for scriptorium.
//!
//! This crate provides the concrete [`LanguageBackend`] implementations
//! and the registry that assembles them at startup:
//!
//! - the built-in Rhai backend, always present and exempt from the
//!   global scripting-plugins gate;
//! - an optional statically linked Lua backend (cargo feature `lua`);
//! - dynamic backends loaded from a plugin directory as cdylibs.
//!
//! [`LanguageBackend`]: scriptorium_core::LanguageBackend

mod builtin;
pub mod dynamic;
#[cfg(feature = "lua")]
mod lua;
mod registry;

pub use builtin::RhaiBackend;
pub use dynamic::{BACKEND_API_VERSION, BackendExport, DynamicBackend, ENTRY_SYMBOL};
#[cfg(feature = "lua")]
pub use lua::LuaBackend;
pub use registry::{BackendRegistry, PLUGIN_PATH_ENV, RegistryConfig};
