//! Cross-reference rewriting.
//!
//! Turns the converter's leftover reST reference syntax into Markdown links:
//! `` `text <target>` `` spans, code spans that look like relative paths, and
//! code spans naming a declared anchor.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::rst::collapse_whitespace;
use crate::segments;

/// Resolves link targets for the document being converted.
///
/// Implemented by the pipeline on top of the global anchor index, so that
/// resolution sees every label in the tree.
pub trait LinkResolver {
    /// Resolve a raw link target to the href to emit.
    fn resolve(&self, target: &str) -> String;

    /// Href of a declared anchor label, if any.
    fn anchor_href(&self, label: &str) -> Option<&str>;
}

/// Matches `` `Label text <target>` ``.
static INLINE_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`<>]+?)\s*<([^`<>]+?)>`").expect("inline link regex"));

/// Matches code spans holding a multi-segment relative path.
static BARE_PATH_CODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"`((?:\.\./)*[A-Za-z0-9._-]+(?:/[A-Za-z0-9._-]+)+)`").expect("bare path regex")
});

/// Matches any single-line code span.
static CODE_SPAN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("code span regex"));

/// Targets that are never looked up or route-mapped.
pub fn is_passthrough(target: &str) -> bool {
    target.starts_with("http://")
        || target.starts_with("https://")
        || target.starts_with("mailto:")
        || target.starts_with('#')
        || target.starts_with('/')
}

/// Undo the converter's backslash escaping of angle brackets.
pub fn unescape_angles(text: &str) -> String {
    text.replace("\\<", "<").replace("\\>", ">")
}

/// Rewrite references in every prose segment of `md`.
pub fn rewrite_links(md: &str, resolver: &dyn LinkResolver) -> String {
    segments::map_prose(md, |segment| rewrite_prose(segment, resolver))
}

fn rewrite_prose(segment: &str, resolver: &dyn LinkResolver) -> String {
    let text = unescape_angles(segment);

    let text = replace_isolated(&INLINE_LINK_RE, &text, |caps| {
        let label = collapse_whitespace(&caps[1]);
        Some(format!("[{label}]({})", resolver.resolve(&caps[2])))
    });

    let text = replace_isolated(&BARE_PATH_CODE_RE, &text, |caps| {
        let target = &caps[1];
        Some(format!("[{target}]({})", resolver.resolve(target)))
    });

    replace_isolated(&CODE_SPAN_RE, &text, |caps| {
        let label = &caps[1];
        resolver
            .anchor_href(label)
            .map(|href| format!("[{label}]({href})"))
    })
}

/// Replace matches not touching another backtick (so double-backtick spans stay
/// intact). Returning `None` keeps the original match.
fn replace_isolated(
    re: &Regex,
    text: &str,
    mut rewrite: impl FnMut(&Captures<'_>) -> Option<String>,
) -> String {
    re.replace_all(text, |caps: &Captures<'_>| {
        let whole = caps.get(0).map_or(0..0, |m| m.range());
        let before = text[..whole.start].ends_with('`');
        let after = text[whole.end..].starts_with('`');
        if before || after {
            return caps[0].to_string();
        }
        rewrite(caps).unwrap_or_else(|| caps[0].to_string())
    })
    .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    struct StubResolver {
        anchors: HashMap<String, String>,
    }

    impl StubResolver {
        fn new(anchors: &[(&str, &str)]) -> Self {
            Self {
                anchors: anchors
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            }
        }
    }

    impl LinkResolver for StubResolver {
        fn resolve(&self, target: &str) -> String {
            let target = target.trim();
            if is_passthrough(target) {
                return target.to_string();
            }
            if let Some(href) = self.anchors.get(target) {
                return href.clone();
            }
            let stripped = target.strip_suffix(".rst").unwrap_or(target);
            format!("/docs/test/{stripped}")
        }

        fn anchor_href(&self, label: &str) -> Option<&str> {
            self.anchors.get(label).map(String::as_str)
        }
    }

    #[test]
    fn inline_reference_becomes_link() {
        let resolver = StubResolver::new(&[("install-guide", "/docs/test/guide#install-guide")]);
        let md = "See `Installing the\n  SDK <install-guide>` and `Other <other_doc.rst>`.";
        assert_eq!(
            rewrite_links(md, &resolver),
            "See [Installing the SDK](/docs/test/guide#install-guide) and [Other](/docs/test/other_doc)."
        );
    }

    #[test]
    fn escaped_angles_are_unescaped_first() {
        let resolver = StubResolver::new(&[]);
        let md = "Read `the docs \\<https://example.com\\>`.";
        assert_eq!(
            rewrite_links(md, &resolver),
            "Read [the docs](https://example.com)."
        );
    }

    #[test]
    fn bare_path_code_span_becomes_link() {
        let resolver = StubResolver::new(&[]);
        let md = "Edit `../services/app-service` or `config/file.rst`, not `single`.";
        assert_eq!(
            rewrite_links(md, &resolver),
            "Edit [../services/app-service](/docs/test/../services/app-service) or [config/file.rst](/docs/test/config/file), not `single`."
        );
    }

    #[test]
    fn anchor_code_span_becomes_link() {
        let resolver = StubResolver::new(&[("mission-apps", "/docs/test/apps#mission-apps")]);
        let md = "Look at `mission-apps` and `unrelated`.";
        assert_eq!(
            rewrite_links(md, &resolver),
            "Look at [mission-apps](/docs/test/apps#mission-apps) and `unrelated`."
        );
    }

    #[test]
    fn fenced_code_is_not_rewritten() {
        let resolver = StubResolver::new(&[("label", "/docs/test#label")]);
        let md = "```\n`label` and `a/b`\n```\n";
        assert_eq!(rewrite_links(md, &resolver), md);
    }

    #[test]
    fn double_backtick_spans_are_left_alone() {
        let resolver = StubResolver::new(&[("label", "/docs/test#label")]);
        let md = "Literal ``label`` stays.";
        assert_eq!(rewrite_links(md, &resolver), md);
    }
}
