//! Core types and traits for scriptorium.
//!
//! This crate provides the fundamental data structures used throughout
//! the scriptorium engine: the script entity and its header convention,
//! the catalog tree, the language-backend trait, the enablement policy,
//! and the settings store consumed by the catalog manager.

mod backend;
mod catalog;
mod config;
mod error;
mod header;
mod policy;
mod script;
mod settings;
mod value;

pub use backend::{AppInfo, LanguageBackend, ScriptApi, ScriptContext};
pub use catalog::{CatalogEntry, ScriptFolder, ScriptIter};
pub use config::{ManagerConfig, ManagerConfigBuilder};
pub use error::{ScriptError, SkipEvent, SkipReason};
pub use header::{HEADER_MARKER, ScriptHeader};
pub use policy::EnablementPolicy;
pub use script::{FileSignature, Script, ScriptType};
pub use settings::{MemorySettings, SettingsStore, TomlSettings};
pub use value::Value;
