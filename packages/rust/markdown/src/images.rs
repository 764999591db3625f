//! Image path rewriting.
//!
//! Sources reference images relative to wherever the `.rst` file lived; the
//! site serves them from one public directory instead.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Path segment that marks a conventional image directory.
const IMAGE_MARKER: &str = "images/";

static HTML_IMG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(<img\s+[^>]*src=")([^"]+)(")"#).expect("html img regex")
});

static MD_IMG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"!\[([^\]]*)\]\(([^)]+)\)").expect("markdown image regex"));

/// Rewrite `<img src>` and `![alt](src)` references under `prefix`.
pub(crate) fn rewrite_image_paths(text: &str, prefix: &str) -> String {
    let text = HTML_IMG_RE.replace_all(text, |caps: &Captures<'_>| {
        format!(
            "{}{}{}",
            &caps[1],
            normalize_image_src(&caps[2], prefix),
            &caps[3]
        )
    });

    MD_IMG_RE
        .replace_all(&text, |caps: &Captures<'_>| {
            format!("![{}]({})", &caps[1], normalize_image_src(&caps[2], prefix))
        })
        .into_owned()
}

/// Root a source path under `prefix` if it points into an image directory.
///
/// `../../images/arch/overview.png` becomes `<prefix>arch/overview.png`;
/// anything without the marker is only trimmed.
pub fn normalize_image_src(src: &str, prefix: &str) -> String {
    let cleaned = src.trim();
    match cleaned.find(IMAGE_MARKER) {
        Some(idx) => format!("{prefix}{}", &cleaned[idx + IMAGE_MARKER.len()..]),
        None => cleaned.to_string(),
    }
}
