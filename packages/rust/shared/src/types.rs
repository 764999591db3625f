//! Core domain types for a documentation migration run.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// File name of the per-directory navigation manifest.
pub const MANIFEST_FILE_NAME: &str = "meta.json";

/// Extension of the structured-text sources.
pub const SOURCE_EXTENSION: &str = "rst";

/// Extension of the generated pages.
pub const PAGE_EXTENSION: &str = "mdx";

// ---------------------------------------------------------------------------
// SourceDocument
// ---------------------------------------------------------------------------

/// A structured-text source file, loaded once and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Path relative to the source root (e.g. `guide/install.rst`).
    pub rel_path: PathBuf,
    /// Raw file contents.
    pub text: String,
}

// ---------------------------------------------------------------------------
// NavigationEntry
// ---------------------------------------------------------------------------

/// One line of a `toctree` directive, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEntry {
    /// Display label (whitespace-collapsed).
    pub label: String,
    /// Target as written by the author (e.g. `bar`, `../api/index`).
    pub target: String,
}

// ---------------------------------------------------------------------------
// DirectoryManifest
// ---------------------------------------------------------------------------

/// The `meta.json` navigation manifest written for each destination directory.
///
/// Fields the site generator understands but this tool does not manage are kept
/// in `extra` and written back untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectoryManifest {
    /// Sidebar title of the directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ordered immediate children (page stems and directory names).
    #[serde(default)]
    pub pages: Vec<String>,
    /// Any other fields found in an existing manifest.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Conversion outcomes
// ---------------------------------------------------------------------------

/// A document that could not be converted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionFailure {
    /// Source path relative to the source root.
    pub source: PathBuf,
    /// Human-readable error description.
    pub message: String,
}

/// Outcome of converting a single source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    /// The destination page that was written.
    Written(PathBuf),
    /// The document failed; the batch carries on.
    Failed(ConversionFailure),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_preserves_unknown_fields() {
        let json = r#"{"icon":"Book","pages":["b","a"],"defaultOpen":true}"#;
        let parsed: DirectoryManifest = serde_json::from_str(json).expect("deserialize");
        assert_eq!(parsed.pages, vec!["b", "a"]);
        assert_eq!(parsed.title, None);
        assert_eq!(parsed.extra.len(), 2);

        let out = serde_json::to_string(&parsed).expect("serialize");
        assert!(out.contains("\"icon\":\"Book\""));
        assert!(out.contains("\"defaultOpen\":true"));
        assert!(!out.contains("title"));
    }

    #[test]
    fn manifest_with_wrong_pages_type_is_rejected() {
        let json = r#"{"pages":"index"}"#;
        assert!(serde_json::from_str::<DirectoryManifest>(json).is_err());
    }
}
