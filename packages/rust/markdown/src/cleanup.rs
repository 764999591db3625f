//! Post-conversion cleanup pipeline for converter output.
//!
//! Each cleanup pass is a function `&str -> String` applied in sequence.
//! The pipeline strips converter artifacts, rewrites links, and sanitizes the
//! result for MDX.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::links::{self, LinkResolver};
use crate::sanitize;
use crate::segments;

/// Run the full cleanup pipeline on raw converter output.
pub(crate) fn run_pipeline(md: &str, resolver: &dyn LinkResolver, image_prefix: &str) -> String {
    let mut result = md.to_string();

    result = strip_toctree_blocks(&result);
    result = convert_uml_blocks(&result);
    result = strip_contents_blocks(&result);
    result = fence_literal_blocks(&result);
    result = links::rewrite_links(&result, resolver);
    result = sanitize::sanitize(&result, image_prefix);
    result = clean_blank_lines(&result);
    result = ensure_trailing_newline(&result);

    result
}

// ---------------------------------------------------------------------------
// Pass 1: Drop rendered toctrees
// ---------------------------------------------------------------------------

/// Remove `<div class="toctree">` blocks; navigation is appended separately.
fn strip_toctree_blocks(md: &str) -> String {
    static TOCTREE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?s)\n*<div class="toctree"[^>]*>.*?</div>\n*"#).expect("valid regex")
    });

    TOCTREE_RE.replace_all(md, "\n\n").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 2: Diagrams the preprocessor did not catch
// ---------------------------------------------------------------------------

/// Turn `<div class="uml">` blocks into `text` fences.
fn convert_uml_blocks(md: &str) -> String {
    static UML_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?s)\n*<div class="uml">\s*(.*?)\s*</div>\n*"#).expect("valid regex")
    });

    UML_RE
        .replace_all(md, |caps: &Captures<'_>| {
            format!("\n\n```text\n{}\n```\n\n", caps[1].trim())
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Pass 3: Drop the local table of contents
// ---------------------------------------------------------------------------

/// Remove `<div class="contents">` blocks; the site renders its own TOC.
fn strip_contents_blocks(md: &str) -> String {
    static CONTENTS_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r#"(?ms)^\s*<div class="contents".*?</div>\s*$"#).expect("valid regex")
    });

    CONTENTS_RE.replace_all(md, "").into_owned()
}

// ---------------------------------------------------------------------------
// Pass 4: Fence literal blocks
// ---------------------------------------------------------------------------

/// Fence indented literal blocks before links are rewritten, so references
/// inside them stay verbatim.
fn fence_literal_blocks(md: &str) -> String {
    segments::map_prose(md, sanitize::promote_indented_code)
}

// ---------------------------------------------------------------------------
// Pass 5: Collapse blank lines
// ---------------------------------------------------------------------------

fn clean_blank_lines(md: &str) -> String {
    crate::frontmatter::collapse_blank_lines(md)
}

// ---------------------------------------------------------------------------
// Pass 6: Ensure trailing newline
// ---------------------------------------------------------------------------

/// Trim surrounding blank lines and end with exactly one newline.
fn ensure_trailing_newline(md: &str) -> String {
    let trimmed = md.trim_start_matches('\n').trim_end();
    format!("{trimmed}\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
