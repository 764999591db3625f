//! Global cross-reference index and per-document link resolution.
//!
//! The index is built once over every source document before any conversion
//! starts, so a reference can point at a label declared anywhere in the tree.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument, warn};

use docmigrate_markdown::{LinkResolver, anchor_labels, is_passthrough, unescape_angles};
use docmigrate_shared::SourceDocument;

use crate::routes::RouteMap;

/// Relative references that may be mapped to a route.
static PATH_LIKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._/-]+$").expect("path-like regex"));

// ---------------------------------------------------------------------------
// AnchorIndex
// ---------------------------------------------------------------------------

/// Label → `route#label` for every `.. _label:` declaration.
#[derive(Debug, Clone, Default)]
pub struct AnchorIndex {
    hrefs: BTreeMap<String, String>,
}

impl AnchorIndex {
    /// Index every label in `documents`.
    ///
    /// Documents are visited in sorted path order and a later declaration of
    /// the same label replaces the earlier one.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn build(documents: &[SourceDocument], routes: &RouteMap) -> Self {
        let mut ordered: Vec<&SourceDocument> = documents.iter().collect();
        ordered.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        let mut hrefs = BTreeMap::new();
        for doc in ordered {
            let route = routes.route_for(&doc.rel_path);
            for label in anchor_labels(&doc.text) {
                let href = format!("{route}#{label}");
                if let Some(previous) = hrefs.insert(label.clone(), href.clone()) {
                    warn!(
                        label = %label,
                        previous = %previous,
                        replacement = %href,
                        source = %doc.rel_path.display(),
                        "anchor label declared more than once"
                    );
                }
            }
        }

        debug!(labels = hrefs.len(), "anchor index built");
        Self { hrefs }
    }

    /// Href of `label`, if declared anywhere.
    pub fn get(&self, label: &str) -> Option<&str> {
        self.hrefs.get(label).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.hrefs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hrefs.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Per-document resolver
// ---------------------------------------------------------------------------

/// Link resolution in the context of one source document.
#[derive(Debug, Clone)]
pub struct DocumentLinks<'a> {
    index: &'a AnchorIndex,
    routes: &'a RouteMap,
    doc_dir: PathBuf,
}

impl<'a> DocumentLinks<'a> {
    pub fn new(index: &'a AnchorIndex, routes: &'a RouteMap, rel_path: &Path) -> Self {
        Self {
            index,
            routes,
            doc_dir: rel_path.parent().map(Path::to_path_buf).unwrap_or_default(),
        }
    }

    /// Resolve a raw link target to an href.
    ///
    /// Order: passthrough targets, anchor labels (as written, then without
    /// `.rst`), relative document paths, and finally the stripped target as-is.
    pub fn normalize_link(&self, target: &str) -> String {
        let unescaped = unescape_angles(target.trim());
        let target = unescaped.trim();

        if is_passthrough(target) {
            return target.to_string();
        }
        if let Some(href) = self.index.get(target) {
            return href.to_string();
        }

        let stripped = target.strip_suffix(".rst").unwrap_or(target);
        if let Some(href) = self.index.get(stripped) {
            return href.to_string();
        }

        if PATH_LIKE_RE.is_match(stripped) {
            if let Some(route) = self.routes.route_for_reference(&self.doc_dir, stripped) {
                return route;
            }
        }

        stripped.to_string()
    }
}

impl LinkResolver for DocumentLinks<'_> {
    fn resolve(&self, target: &str) -> String {
        self.normalize_link(target)
    }

    fn anchor_href(&self, label: &str) -> Option<&str> {
        self.index.get(label)
    }
}
