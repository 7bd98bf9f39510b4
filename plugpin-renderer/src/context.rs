//! Template context: serializable rendering payload built from plugin entries.
//!
//! All string values are escaped for Nix double-quoted strings before they
//! reach the template, and attribute keys are quoted only when they are not
//! plain Nix identifiers. Templates can therefore interpolate them verbatim.

use serde::{Deserialize, Serialize};

use plugpin_core::PluginEntry;

use crate::error::RenderError;

/// Words that cannot be used as bare attribute names.
const NIX_KEYWORDS: &[&str] = &[
    "assert", "else", "if", "in", "inherit", "let", "or", "rec", "then", "with",
];

/// Rendering payload for the generated artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactContext {
    /// Header comment, one element per line, without the `#` marker.
    pub header_lines: Vec<String>,
    /// Entries in processing order.
    pub entries: Vec<EntryCtx>,
}

/// One rendered attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryCtx {
    /// Attribute name, quoted if needed.
    pub key: String,
    pub owner: String,
    pub repo: String,
    pub version: String,
    pub sha256: String,
}

impl From<&PluginEntry> for EntryCtx {
    fn from(entry: &PluginEntry) -> Self {
        EntryCtx {
            key: attr_key(&entry.name),
            owner: escape_nix_string(&entry.owner),
            repo: escape_nix_string(&entry.repo),
            version: escape_nix_string(&entry.version),
            sha256: escape_nix_string(&entry.sha256),
        }
    }
}

impl ArtifactContext {
    /// Build an [`ArtifactContext`] from a header and ordered entries.
    pub fn new(header: &str, entries: &[PluginEntry]) -> Self {
        ArtifactContext {
            header_lines: header.lines().map(|l| l.trim_end().to_string()).collect(),
            entries: entries.iter().map(EntryCtx::from).collect(),
        }
    }

    /// Convert to a [`tera::Context`] for rendering.
    pub fn to_tera_context(&self) -> Result<tera::Context, RenderError> {
        tera::Context::from_serialize(self).map_err(RenderError::from)
    }
}

/// `true` if `name` can be used as a bare Nix attribute name.
pub fn is_nix_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '\'' | '-'))
        && !NIX_KEYWORDS.contains(&name)
}

/// Escape `s` for use inside a Nix `"…"` string.
pub fn escape_nix_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            other => out.push(other),
        }
    }
    out
}

fn attr_key(name: &str) -> String {
    if is_nix_identifier(name) {
        name.to_string()
    } else {
        format!("\"{}\"", escape_nix_string(name))
    }
}
