//! The script entity: one parsed script file.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::backend::{LanguageBackend, ScriptApi};
use crate::error::ScriptError;
use crate::header::ScriptHeader;
use crate::value::Value;

/// Kind of script, as declared in its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptType {
    /// Invoked directly by the user.
    Standalone,
    /// Runs automatically when a named lifecycle event fires.
    Hook,
    /// Unparsed, or the header declared no usable type.
    #[default]
    Invalid,
}

impl fmt::Display for ScriptType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standalone => write!(f, "standalone"),
            Self::Hook => write!(f, "hook"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}

/// Change-detection signature of a script file.
///
/// Modification time plus size; a missing file always counts as
/// changed. Size is included so same-second rewrites are still caught.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileSignature {
    modified: Option<SystemTime>,
    size: u64,
}

impl FileSignature {
    /// Capture the current signature of `path`. Missing files yield a
    /// signature that never matches a captured one.
    pub fn capture(path: &Path) -> Self {
        match fs::metadata(path) {
            Ok(meta) => Self {
                modified: meta.modified().ok(),
                size: meta.len(),
            },
            Err(_) => Self {
                modified: None,
                size: 0,
            },
        }
    }

    fn exists(&self) -> bool {
        self.modified.is_some()
    }
}

/// A parsed representation of one script file.
///
/// Invariant: the header and type are only meaningful after a
/// successful [`Script::parse_header`]; the synchronizer never inserts
/// an unparsed or failed-parse script into the catalog.
pub struct Script {
    path: PathBuf,
    header: ScriptHeader,
    script_type: ScriptType,
    enabled: bool,
    backend: Arc<dyn LanguageBackend>,
    signature: FileSignature,
}

impl Script {
    /// Construct a script for a discovered file. Fails if the file
    /// cannot be stat'ed. The header is not parsed yet.
    pub fn discover(
        path: impl Into<PathBuf>,
        backend: Arc<dyn LanguageBackend>,
    ) -> Result<Self, ScriptError> {
        let path = path.into();
        let signature = FileSignature::capture(&path);
        if !signature.exists() {
            return Err(ScriptError::NotFound { path });
        }
        Ok(Self {
            path,
            header: ScriptHeader::default(),
            script_type: ScriptType::Invalid,
            enabled: true,
            backend,
            signature,
        })
    }

    /// (Re-)parse the header from disk, refreshing the change
    /// signature on success. On failure the previous header and type
    /// are left untouched; callers treat the script as removed.
    pub fn parse_header(&mut self) -> Result<(), ScriptError> {
        let source = fs::read_to_string(&self.path)?;
        let (header, script_type) =
            ScriptHeader::parse(&source, self.backend.line_comment()).map_err(|message| {
                ScriptError::HeaderParse {
                    path: self.path.clone(),
                    message,
                }
            })?;
        self.enabled = header.enabled;
        self.header = header;
        self.script_type = script_type;
        self.signature = FileSignature::capture(&self.path);
        Ok(())
    }

    /// Whether the on-disk file differs from the captured signature.
    pub fn has_changed(&self) -> bool {
        FileSignature::capture(&self.path) != self.signature
    }

    /// Run the script through its owning backend.
    pub fn run(&self, api: &mut ScriptApi) -> Result<Value, ScriptError> {
        self.backend.execute(self, api)
    }

    /// Canonical absolute path of the script file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Display title from the header.
    pub fn title(&self) -> &str {
        &self.header.title
    }

    /// Description from the header.
    pub fn description(&self) -> &str {
        &self.header.description
    }

    /// The full parsed header.
    pub fn header(&self) -> &ScriptHeader {
        &self.header
    }

    /// Script type declared in the header.
    pub fn script_type(&self) -> ScriptType {
        self.script_type
    }

    /// Hook name; meaningful only for hook scripts.
    pub fn hook_name(&self) -> &str {
        &self.header.hook
    }

    /// Required execution context; empty means "any".
    pub fn context(&self) -> &str {
        &self.header.context
    }

    /// Key-binding descriptor from the header.
    pub fn shortcut(&self) -> &str {
        &self.header.shortcut
    }

    /// Whether the script may currently run.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Flip the runtime enable flag.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// The backend that owns this script.
    pub fn backend(&self) -> &Arc<dyn LanguageBackend> {
        &self.backend
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("path", &self.path)
            .field("title", &self.header.title)
            .field("type", &self.script_type)
            .field("enabled", &self.enabled)
            .field("backend", &self.backend.name())
            .finish()
    }
}
