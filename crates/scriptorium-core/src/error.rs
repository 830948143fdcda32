//! Error types for the scripting engine.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::script::ScriptType;

/// Errors that can occur while loading, parsing or running scripts.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// Script file not found.
    #[error("Script not found: {path}")]
    NotFound { path: PathBuf },

    /// The script header could not be parsed.
    #[error("Invalid script header in {path}: {message}")]
    HeaderParse { path: PathBuf, message: String },

    /// The script is not of the type the caller asked for.
    #[error("Script \"{title}\" is not a {expected} script")]
    TypeMismatch { title: String, expected: ScriptType },

    /// The enablement policy refuses the script's backend.
    #[error("Scripting plugins are disabled in the preferences")]
    PolicyDenied,

    /// The script itself is disabled.
    #[error("Script \"{title}\" is disabled")]
    ScriptDisabled { title: String },

    /// The backend signalled an error while running the script.
    #[error("Script \"{title}\": {message}")]
    Execution { title: String, message: String },

    /// A dynamic backend library could not be loaded.
    #[error("Failed to load backend {path}: {message}")]
    BackendLoad { path: PathBuf, message: String },

    /// Settings could not be read or written.
    #[error("Settings error: {message}")]
    Settings { message: String },

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScriptError {
    /// Create an execution error, substituting the conventional fallback
    /// text when the backend provides no message.
    pub fn execution(title: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self::Execution {
            title: title.into(),
            message: if message.is_empty() {
                "unknown error".to_string()
            } else {
                message
            },
        }
    }
}

/// Why a directory entry was left out of the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// No backend recognized the file.
    Unmatched,
    /// The header failed to parse, or parsed to an invalid type.
    ParseFailed,
    /// Only policy-disabled backends would have handled the file.
    PolicyDenied,
    /// Symbolic link whose target does not exist.
    BrokenLink,
    /// The entry or directory could not be read.
    Unreadable,
}

/// A single entry the synchronizer chose to omit, and why.
///
/// Discovery never fails outright; these events are the audit trail of
/// everything it dropped along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkipEvent {
    /// Path of the skipped entry.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: SkipReason,
}

impl SkipEvent {
    /// Create a new skip event.
    pub fn new(path: impl Into<PathBuf>, reason: SkipReason) -> Self {
        Self {
            path: path.into(),
            reason,
        }
    }
}
