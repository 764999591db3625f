//! Page titles and the frontmatter header.

use std::sync::LazyLock;

use regex::Regex;

use crate::NavLink;
use crate::sanitize::escape_inline_text;

static MULTI_BLANK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

static FRONTMATTER_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^title:\s*(.+?)\s*$").expect("valid regex"));

/// Heading of the appended navigation section.
pub const NAVIGATION_HEADING: &str = "## Pages in This Section";

/// Split a leading `# Title` off the body.
///
/// Returns `default_title` and the untouched body when the first line is not
/// a top-level heading.
pub fn extract_title(md: &str, default_title: &str) -> (String, String) {
    let mut lines = md.lines();
    match lines.next().and_then(|first| first.strip_prefix("# ")) {
        Some(title) => {
            let body = lines.collect::<Vec<_>>().join("\n");
            (title.trim().to_string(), body.trim_start_matches('\n').to_string())
        }
        None => (default_title.to_string(), md.to_string()),
    }
}

/// Append a `Pages in This Section` list after all other content.
///
/// Labels are escaped for MDX since they bypass the sanitizer.
pub fn append_navigation(body: &str, links: &[NavLink]) -> String {
    if links.is_empty() {
        return body.to_string();
    }

    let mut out = body.trim_end().to_string();
    out.push_str("\n\n");
    out.push_str(NAVIGATION_HEADING);
    out.push_str("\n\n");
    for link in links {
        out.push_str(&format!("- [{}]({})\n", escape_inline_text(&link.label), link.href));
    }
    out
}

/// Wrap `body` in a frontmatter header carrying the quoted title.
///
/// Blank-line runs collapse to one and the output ends with exactly one newline.
pub fn add_frontmatter(title: &str, body: &str) -> String {
    let header = format!("---\ntitle: {}\n---\n", quote_title(title));
    let body = collapse_blank_lines(body);
    let body = body.trim_start_matches('\n').trim_end();
    if body.is_empty() {
        header
    } else {
        format!("{header}\n{body}\n")
    }
}

/// Collapse runs of 2+ blank lines into exactly one.
pub fn collapse_blank_lines(md: &str) -> String {
    MULTI_BLANK_RE.replace_all(md, "\n\n").into_owned()
}

/// Title from an existing page's frontmatter, quoted or bare.
///
/// Only the first 20 lines are searched.
pub fn read_frontmatter_title(page: &str) -> Option<String> {
    let mut lines = page.lines();
    if lines.next()?.trim() != "---" {
        return None;
    }

    for line in lines.take(19) {
        if line.trim() == "---" {
            break;
        }
        if let Some(caps) = FRONTMATTER_TITLE_RE.captures(line) {
            let raw = &caps[1];
            if raw.starts_with('"') {
                if let Ok(title) = serde_json::from_str::<String>(raw) {
                    return Some(title);
                }
            }
            return Some(raw.trim_matches('"').to_string());
        }
    }
    None
}

/// JSON string literal; also a valid double-quoted YAML scalar.
fn quote_title(title: &str) -> String {
    serde_json::Value::String(title.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn leading_heading_becomes_title() {
        let (title, body) = extract_title("# Getting Started \n\n\nFirst paragraph.\n", "Untitled");
        assert_eq!(title, "Getting Started");
        assert_eq!(body, "First paragraph.");
    }

    #[test]
    fn missing_heading_uses_default() {
        let md = "Intro text\n\n# Later Heading\n";
        let (title, body) = extract_title(md, "Untitled");
        assert_eq!(title, "Untitled");
        assert_eq!(body, md);
    }

    #[test]
    fn second_level_heading_is_not_a_title() {
        let (title, _) = extract_title("## Section\n", "Fallback");
        assert_eq!(title, "Fallback");
    }

    #[test]
    fn frontmatter_quotes_title_and_normalizes_spacing() {
        let page = add_frontmatter("Say \"hi\"", "\n\nPara one.\n\n\n\nPara two.\n\n\n");
        assert_eq!(
            page,
            "---\ntitle: \"Say \\\"hi\\\"\"\n---\n\nPara one.\n\nPara two.\n"
        );
    }

    #[test]
    fn empty_body_yields_header_only() {
        assert_eq!(add_frontmatter("Untitled", "\n"), "---\ntitle: \"Untitled\"\n---\n");
    }

    #[test]
    fn navigation_is_appended_last() {
        let links = vec![
            NavLink { label: "Bar".into(), href: "/docs/x/foo/bar".into() },
            NavLink { label: "baz".into(), href: "/docs/x/foo/baz".into() },
        ];
        assert_eq!(
            append_navigation("Body text.\n", &links),
            "Body text.\n\n## Pages in This Section\n\n- [Bar](/docs/x/foo/bar)\n- [baz](/docs/x/foo/baz)\n"
        );
        assert_eq!(append_navigation("Body", &[]), "Body");
    }

    #[test]
    fn navigation_labels_are_escaped() {
        let links = vec![NavLink { label: "Vec<T> {x}".into(), href: "/docs/x/vec".into() }];
        assert_eq!(
            append_navigation("Body", &links),
            "Body\n\n## Pages in This Section\n\n- [Vec&lt;T&gt; \\{x\\}](/docs/x/vec)\n"
        );
    }

    #[test]
    fn control_characters_in_titles_are_escaped() {
        let page = add_frontmatter("Tab\there\u{1}", "");
        assert_eq!(page, "---\ntitle: \"Tab\\there\\u0001\"\n---\n");
        assert_eq!(read_frontmatter_title(&page), Some("Tab\there\u{1}".to_string()));
    }

    #[test]
    fn reads_quoted_and_bare_titles() {
        assert_eq!(
            read_frontmatter_title("---\ntitle: \"Say \\\"hi\\\"\"\n---\n\nBody"),
            Some("Say \"hi\"".to_string())
        );
        assert_eq!(
            read_frontmatter_title("---\nicon: Book\ntitle: Plain Title\n---\n"),
            Some("Plain Title".to_string())
        );
        assert_eq!(read_frontmatter_title("# No frontmatter\n"), None);
        assert_eq!(read_frontmatter_title("---\nicon: x\n---\ntitle: late\n"), None);
    }

    #[test]
    fn generated_header_reads_back() {
        let page = add_frontmatter("API \\ Reference", "Body");
        assert_eq!(read_frontmatter_title(&page), Some("API \\ Reference".to_string()));
    }
}
