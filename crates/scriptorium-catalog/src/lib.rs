//! Catalog synchronizer and script manager for scriptorium.
//!
//! The [`ScriptManager`] owns the backend registry, the two catalog
//! trees (standalone and hook) and the current policy snapshot; the
//! synchronizer in [`sync`] reconciles the trees against the scripting
//! root directory incrementally, tolerating every per-file anomaly.

mod manager;
mod sync;

pub use manager::{CatalogChanged, HookRun, ScriptManager};
pub use sync::SyncReport;
