//! reStructuredText → MDX text transforms.
//!
//! The external converter turns reST into GitHub-flavoured Markdown; this crate
//! does everything around that step: protecting diagram directives from the
//! converter, reading anchors and toctrees from the source, and turning the
//! converter's output into MDX that renders (links resolved, code fenced, JSX
//! hazards escaped, frontmatter added).

mod cleanup;
pub mod directives;
pub mod frontmatter;
pub mod images;
pub mod links;
pub mod rst;
pub mod sanitize;
mod segments;

use tracing::{debug, instrument};

pub use directives::{DiagramBlocks, extract_diagrams};
pub use frontmatter::{add_frontmatter, append_navigation, extract_title, read_frontmatter_title};
pub use links::{LinkResolver, is_passthrough, unescape_angles};
pub use rst::{anchor_labels, toctree_entries};
pub use sanitize::sanitize;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Options for turning converter output into an MDX page.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Public prefix image paths are rewritten under (trailing slash included).
    pub image_prefix: String,
    /// Title used when the page has no leading `# ` heading.
    pub default_title: String,
}

/// A resolved navigation link for the `Pages in This Section` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavLink {
    /// Display label.
    pub label: String,
    /// Resolved href.
    pub href: String,
}

/// A finished MDX page.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// Extracted or default title.
    pub title: String,
    /// Full file content, frontmatter included.
    pub content: String,
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Turn restored converter output into a complete MDX page.
///
/// 1. Runs the cleanup pipeline (artifacts, links, sanitizing)
/// 2. Extracts the title from the leading heading
/// 3. Appends the navigation list, if any
/// 4. Wraps the body in frontmatter
#[instrument(skip_all, fields(nav_links = nav.len()))]
pub fn render_page(
    converted: &str,
    opts: &RenderOptions,
    resolver: &dyn LinkResolver,
    nav: &[NavLink],
) -> RenderedPage {
    let cleaned = cleanup::run_pipeline(converted, resolver, &opts.image_prefix);
    let (title, body) = extract_title(&cleaned, &opts.default_title);
    let body = append_navigation(&body, nav);
    let content = add_frontmatter(&title, &body);

    debug!(title = %title, len = content.len(), "page rendered");

    RenderedPage { title, content }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
