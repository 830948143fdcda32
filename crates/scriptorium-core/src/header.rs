//! The script header convention.
//!
//! Every script file starts with a block of line comments. The first
//! non-blank comment line must carry the `ScriptoriumScript` marker;
//! the following comment lines are `Key: value` pairs with
//! case-insensitive keys. The comment prefix itself comes from the
//! backend that claimed the file, so the same convention works across
//! languages.
//!
//! ```text
//! // ScriptoriumScript
//! // Title: Insert citation
//! // Description: Inserts a citation at the cursor
//! // Script-Type: standalone
//! // Context: Editor
//! ```

use serde::{Deserialize, Serialize};

use crate::script::ScriptType;

/// Marker the first comment line of a script must carry.
pub const HEADER_MARKER: &str = "ScriptoriumScript";

/// Parsed header fields of a script file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptHeader {
    /// Display title (required).
    pub title: String,

    /// One-line description.
    #[serde(default)]
    pub description: String,

    /// Script author.
    #[serde(default)]
    pub author: String,

    /// Script version string.
    #[serde(default)]
    pub version: String,

    /// Hook name (meaningful only for hook scripts).
    #[serde(default)]
    pub hook: String,

    /// Required execution context; empty means "any".
    #[serde(default)]
    pub context: String,

    /// Key-binding descriptor, e.g. "Ctrl+Shift+I".
    #[serde(default)]
    pub shortcut: String,

    /// Enable flag declared in the file itself.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl Default for ScriptHeader {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            author: String::new(),
            version: String::new(),
            hook: String::new(),
            context: String::new(),
            shortcut: String::new(),
            enabled: true,
        }
    }
}

impl ScriptHeader {
    /// Parse the leading comment block of `source`, where `line_comment`
    /// is the backend's line comment prefix (e.g. `//` or `--`).
    ///
    /// Fails on a missing marker or empty title. An unrecognized or
    /// missing `Script-Type` parses successfully with type
    /// [`ScriptType::Invalid`]; the caller is expected to discard it.
    pub fn parse(source: &str, line_comment: &str) -> Result<(Self, ScriptType), String> {
        let mut header = Self::default();
        let mut script_type = ScriptType::Invalid;
        let mut saw_marker = false;

        for line in source.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                if saw_marker {
                    // A blank line terminates the header block.
                    break;
                }
                continue;
            }
            let Some(rest) = trimmed.strip_prefix(line_comment) else {
                break;
            };
            let rest = rest.trim();

            if !saw_marker {
                if rest == HEADER_MARKER {
                    saw_marker = true;
                    continue;
                }
                return Err(format!("missing {HEADER_MARKER} marker"));
            }

            let Some((key, value)) = rest.split_once(':') else {
                continue;
            };
            let value = value.trim();
            match key.trim().to_lowercase().as_str() {
                "title" => header.title = value.to_string(),
                "description" => header.description = value.to_string(),
                "author" => header.author = value.to_string(),
                "version" => header.version = value.to_string(),
                "hook" => header.hook = value.to_string(),
                "context" => header.context = value.to_string(),
                "shortcut" => header.shortcut = value.to_string(),
                "enabled" => header.enabled = parse_flag(value),
                "script-type" => {
                    script_type = match value.to_lowercase().as_str() {
                        "standalone" => ScriptType::Standalone,
                        "hook" => ScriptType::Hook,
                        _ => ScriptType::Invalid,
                    }
                }
                _ => {}
            }
        }

        if !saw_marker {
            return Err(format!("missing {HEADER_MARKER} marker"));
        }
        if header.title.is_empty() {
            return Err("missing title".to_string());
        }

        Ok((header, script_type))
    }
}

fn parse_flag(value: &str) -> bool {
    !matches!(value.to_lowercase().as_str(), "false" | "no" | "0")
}
