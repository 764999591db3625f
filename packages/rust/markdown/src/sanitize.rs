//! Making converted Markdown safe to embed in MDX.
//!
//! MDX reads `<` as the start of a JSX element and `{` as the start of an
//! expression, even in plain prose. Fenced code is exempt, so the text is split
//! first and each kind is handled on its own. Running [`sanitize`] on its own
//! output changes nothing.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

use crate::images::rewrite_image_paths;
use crate::segments;

/// HTML tags passed through to MDX as-is.
const HTML_TAG_WHITELIST: &[&str] = &[
    "a",
    "abbr",
    "b",
    "blockquote",
    "br",
    "code",
    "div",
    "em",
    "figcaption",
    "figure",
    "i",
    "img",
    "kbd",
    "li",
    "ol",
    "p",
    "pre",
    "span",
    "strong",
    "sub",
    "summary",
    "sup",
    "table",
    "tbody",
    "td",
    "th",
    "thead",
    "tr",
    "ul",
];

/// Fence languages the site cannot highlight; shown as plain text instead.
const PLAIN_TEXT_LANGUAGES: &[&str] = &["plantuml", "none", "math"];

/// HTML attribute → JSX prop.
static JSX_ATTRS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        ("class", "className"),
        ("for", "htmlFor"),
        ("colspan", "colSpan"),
        ("rowspan", "rowSpan"),
        ("tabindex", "tabIndex"),
    ]
    .into_iter()
    .map(|(attr, prop)| {
        let re = Regex::new(&format!(r"(<[A-Za-z][^>]*?)\b{attr}=")).expect("jsx attr regex");
        (re, prop)
    })
    .collect()
});

static FENCE_OPEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([ \t]*)(`{3,})[ \t]*([^\s`]+)?[ \t]*$").expect("fence open regex")
});

/// `[text](more text <https://url>)`: the converter pushed part of the label out.
static MALFORMED_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[([^\]]+)\]\(([^)\n]*?)\s+<?(https?://[^)\s>]+)>?\)")
        .expect("malformed link regex")
});

static ANGLE_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([^<>\n]+)>").expect("angle token regex"));

static TAG_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/?([A-Za-z][A-Za-z0-9:-]*)(?:\s|/|$)").expect("tag name regex")
});

static LT_BEFORE_DIGIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([0-9-])").expect("lt before digit regex"));

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-+*]\s+|\d+[.)]\s+)").expect("list item regex"));

/// Sanitize converted Markdown for MDX.
///
/// Indented code is promoted to fences first, so the promoted blocks are
/// treated as code by every later pass.
pub fn sanitize(text: &str, image_prefix: &str) -> String {
    let promoted = segments::map_prose(text, promote_indented_code);
    segments::map_segments(&promoted, sanitize_fenced_block, |segment| {
        sanitize_prose(segment, image_prefix)
    })
}

// ---------------------------------------------------------------------------
// Fenced blocks
// ---------------------------------------------------------------------------

fn sanitize_fenced_block(block: &str) -> String {
    let (first, rest) = match block.find('\n') {
        Some(idx) => block.split_at(idx),
        None => (block, ""),
    };

    let Some(caps) = FENCE_OPEN_RE.captures(first) else {
        return block.to_string();
    };
    let lang = caps.get(3).map_or("", |m| m.as_str()).to_lowercase();
    if PLAIN_TEXT_LANGUAGES.contains(&lang.as_str()) {
        return format!("{}{}text{rest}", &caps[1], &caps[2]);
    }
    block.to_string()
}

// ---------------------------------------------------------------------------
// Indented code promotion
// ---------------------------------------------------------------------------

/// Turn indented code blocks into fenced ones.
///
/// A block starts at a line indented by four or more spaces that is not a list
/// item and follows a blank line (or the start of the segment). It runs over
/// blank lines until a line that is less indented or a list item.
pub(crate) fn promote_indented_code(segment: &str) -> String {
    let lines: Vec<&str> = segment.lines().collect();
    if lines.is_empty() {
        return segment.to_string();
    }

    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let after_blank = i == 0 || lines[i - 1].trim().is_empty();

        if line.starts_with("    ") && !looks_like_list_item(line) && after_blank {
            let mut j = i;
            let mut block_lines: Vec<&str> = Vec::new();
            let mut min_indent: Option<usize> = None;

            while j < lines.len() {
                let current = lines[j];
                if current.trim().is_empty() {
                    block_lines.push(current);
                    j += 1;
                    continue;
                }
                if !current.starts_with("    ") || looks_like_list_item(current) {
                    break;
                }
                let indent = leading_spaces(current);
                min_indent = Some(min_indent.map_or(indent, |m| m.min(indent)));
                block_lines.push(current);
                j += 1;
            }

            if let Some(common) = min_indent.filter(|&c| c >= 4) {
                let outer = " ".repeat(common - 4);
                let fence = fence_for(&block_lines);
                out.push(format!("{outer}{fence}"));
                for raw in &block_lines {
                    if raw.trim().is_empty() {
                        out.push(outer.clone());
                    } else {
                        out.push(format!("{outer}{}", &raw[common..]));
                    }
                }
                out.push(format!("{outer}{fence}"));
                i = j;
                continue;
            }
        }

        out.push(line.to_string());
        i += 1;
    }

    let mut converted = out.join("\n");
    if segment.ends_with('\n') {
        converted.push('\n');
    }
    converted
}

/// A backtick fence longer than any backtick run inside the block.
fn fence_for(block_lines: &[&str]) -> String {
    let longest = block_lines
        .iter()
        .flat_map(|line| line.split(|c| c != '`'))
        .map(str::len)
        .max()
        .unwrap_or(0);
    "`".repeat(longest.max(2) + 1)
}

fn looks_like_list_item(line: &str) -> bool {
    LIST_ITEM_RE.is_match(line.trim_start())
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

// ---------------------------------------------------------------------------
// Prose
// ---------------------------------------------------------------------------

fn sanitize_prose(segment: &str, image_prefix: &str) -> String {
    let segment = rewrite_image_paths(segment, image_prefix);
    let segment = rewrite_jsx_attrs(&segment);
    let segment = fix_malformed_links(&segment);
    let segment = ANGLE_TOKEN_RE
        .replace_all(&segment, replace_angle_token)
        .into_owned();
    let segment = segment
        .replace("<<<", "&lt;&lt;&lt;")
        .replace("<>", "&lt;&gt;");
    let segment = LT_BEFORE_DIGIT_RE
        .replace_all(&segment, "&lt;${1}")
        .into_owned();
    escape_braces(&segment)
}

fn rewrite_jsx_attrs(segment: &str) -> String {
    JSX_ATTRS
        .iter()
        .fold(segment.to_string(), |text, (re, prop)| {
            re.replace_all(&text, format!("${{1}}{prop}=").as_str())
                .into_owned()
        })
}

/// Merge text the converter pushed outside a link label back into it:
/// `[Forcibly downgrading pip to](v10 … <https://…>)`.
fn fix_malformed_links(segment: &str) -> String {
    MALFORMED_LINK_RE
        .replace_all(segment, |caps: &Captures<'_>| {
            let extra = caps[2].split_whitespace().collect::<Vec<_>>().join(" ");
            let merged = format!("{} {extra}", &caps[1]);
            format!("[{}]({})", merged.trim(), &caps[3])
        })
        .into_owned()
}

fn replace_angle_token(caps: &Captures<'_>) -> String {
    let token = caps[1].trim();
    let lower = token.to_lowercase();

    if is_scheme_address(token, &lower) {
        return format!("[{token}]({token})");
    }
    if lower.starts_with("mailto:") {
        let email = &token["mailto:".len()..];
        return format!("[{email}]({token})");
    }
    if token.contains('@') && !token.contains([' ', '/', ':']) {
        return format!("[{token}](mailto:{token})");
    }

    let is_known_tag = TAG_NAME_RE
        .captures(token)
        .is_some_and(|tag| HTML_TAG_WHITELIST.contains(&tag[1].to_lowercase().as_str()));
    if is_known_tag {
        return caps[0].to_string();
    }

    format!("&lt;{token}&gt;")
}

fn is_scheme_address(token: &str, lower: &str) -> bool {
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return true;
    }
    token.contains("://") && !token.contains(char::is_whitespace) && Url::parse(token).is_ok()
}

/// Escape inline text placed outside the sanitized body, such as navigation
/// labels: every angle bracket becomes an entity and braces are escaped.
pub(crate) fn escape_inline_text(text: &str) -> String {
    escape_braces(&text.replace('<', "&lt;").replace('>', "&gt;"))
}

/// Backslash-escape `{` and `}` unless already escaped.
fn escape_braces(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut prev = None;
    for c in segment.chars() {
        if matches!(c, '{' | '}') && prev != Some('\\') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const PREFIX: &str = "/legacy/images/";

    fn clean(text: &str) -> String {
        sanitize(text, PREFIX)
    }

    #[test]
    fn plain_text_fence_languages_are_neutralized() {
        assert_eq!(clean("```plantuml\nA -> B\n```\n"), "```text\nA -> B\n```\n");
        assert_eq!(clean("```None\nraw\n```\n"), "```text\nraw\n```\n");
        assert_eq!(clean("```rust\nlet x = {};\n```\n"), "```rust\nlet x = {};\n```\n");
    }

    #[test]
    fn fenced_content_is_not_escaped() {
        let text = "```\n<not-a-tag> {braces}\n```\n";
        assert_eq!(clean(text), text);
    }

    #[test]
    fn indented_block_is_promoted_to_fence() {
        let text = "Run this:\n\n    $ make build\n      --verbose\n\n    $ make test\n\nDone.\n";
        assert_eq!(
            clean(text),
            "Run this:\n\n```\n$ make build\n  --verbose\n\n$ make test\n\n```\nDone.\n"
        );
    }

    #[test]
    fn promoted_fence_outgrows_backticks_in_the_block() {
        let text = "Literal:\n\n    wrap ``` in {x}\n";
        assert_eq!(clean(text), "Literal:\n\n````\nwrap ``` in {x}\n````\n");
    }

    #[test]
    fn longer_fences_keep_inner_fence_lines_as_code() {
        let text = "````plantuml\n```\n{a}\n````\n\nAfter {b} <tok>\n";
        assert_eq!(clean(text), "````text\n```\n{a}\n````\n\nAfter \\{b\\} &lt;tok&gt;\n");
    }

    #[test]
    fn inline_text_escaping() {
        assert_eq!(escape_inline_text("Vec<T> {x}"), "Vec&lt;T&gt; \\{x\\}");
        assert_eq!(escape_inline_text("plain"), "plain");
    }

    #[test]
    fn nested_indented_block_keeps_outer_indentation() {
        let text = "- item\n\n        code {x}\n        more\n";
        assert_eq!(clean(text), "- item\n\n    ```\n    code {x}\n    more\n    ```\n");
    }

    #[test]
    fn list_items_and_continuations_are_not_promoted() {
        let text = "    - nested item\n\nParagraph\n    continuation line\n";
        assert_eq!(clean(text), text);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let text = "Intro {x}\n\n    indented <code>\n\n<https://example.com> and <user@example.com>\n\n<div class=\"note\">a <3 b</div>\n\n- item\n\n        deep {y}\n";
        let once = clean(text);
        assert_eq!(clean(&once), once);
    }

    #[test]
    fn jsx_attributes_are_renamed_inside_tags_only() {
        assert_eq!(
            clean("<td class=\"x\" colspan=\"2\">cell</td> class=prose"),
            "<td className=\"x\" colSpan=\"2\">cell</td> class=prose"
        );
        // Renamed, then escaped because `label` is not a passthrough tag.
        assert_eq!(clean("<label for=\"a\">"), "&lt;label htmlFor=\"a\"&gt;");
    }

    #[test]
    fn malformed_link_is_merged() {
        assert_eq!(
            clean("[Forcibly downgrading pip to](v10 of pip <https://pip.pypa.io/en/stable>)"),
            "[Forcibly downgrading pip to v10 of pip](https://pip.pypa.io/en/stable)"
        );
    }

    #[test]
    fn angle_tokens_are_linked_kept_or_escaped() {
        assert_eq!(clean("<https://example.com/a>"), "[https://example.com/a](https://example.com/a)");
        assert_eq!(clean("<ftp://files.example.com/x>"), "[ftp://files.example.com/x](ftp://files.example.com/x)");
        assert_eq!(clean("<mailto:ops@example.com>"), "[ops@example.com](mailto:ops@example.com)");
        assert_eq!(clean("<ops@example.com>"), "[ops@example.com](mailto:ops@example.com)");
        assert_eq!(clean("a<br/>b <span>x</span>"), "a<br/>b <span>x</span>");
        assert_eq!(clean("kubos-<version>.tar"), "kubos-&lt;version&gt;.tar");
    }

    #[test]
    fn defensive_literal_escapes() {
        assert_eq!(clean("x <<< y"), "x &lt;&lt;&lt; y");
        assert_eq!(clean("Vec<>"), "Vec&lt;&gt;");
        assert_eq!(clean("a <5 and b <-1"), "a &lt;5 and b &lt;-1");
    }

    #[test]
    fn braces_are_escaped_once() {
        assert_eq!(clean("use {foo} and \\{bar\\}"), "use \\{foo\\} and \\{bar\\}");
    }

    #[test]
    fn image_paths_are_rewritten_in_prose() {
        assert_eq!(
            clean("![arch](../images/arch.png)"),
            "![arch](/legacy/images/arch.png)"
        );
    }
}
