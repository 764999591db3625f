//! Scanning raw reStructuredText for cross-reference targets and `toctree` entries.
//!
//! These run on the *source* text, before the converter sees it.

use std::sync::LazyLock;

use regex::Regex;

use docmigrate_shared::NavigationEntry;

/// Matches `.. _label:` on a line of its own.
static ANCHOR_DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\.\.\s+_([A-Za-z0-9._:-]+):\s*$").expect("anchor definition regex")
});

/// Matches `Label text <target>`.
static TOCTREE_LABELED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+?)\s*<([^>]+)>$").expect("toctree entry regex"));

/// Every cross-reference label declared in `source`, in order of appearance.
pub fn anchor_labels(source: &str) -> Vec<String> {
    source
        .lines()
        .filter_map(|line| ANCHOR_DEF_RE.captures(line))
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Entries of every `toctree` directive in `source`, in declaration order.
///
/// Option lines (`:maxdepth: 2`) and blank lines are skipped; the block ends at
/// the first non-blank line that is not indented.
pub fn toctree_entries(source: &str) -> Vec<NavigationEntry> {
    let lines: Vec<&str> = source.lines().collect();
    let mut entries = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if !lines[i].trim().starts_with(".. toctree::") {
            i += 1;
            continue;
        }

        i += 1;
        while i < lines.len() {
            let line = lines[i];
            let stripped = line.trim();
            if !stripped.is_empty() && !line.starts_with([' ', '\t']) {
                break;
            }
            i += 1;
            if stripped.is_empty() || stripped.starts_with(':') {
                continue;
            }
            entries.push(parse_entry(stripped));
        }
    }

    entries
}

fn parse_entry(entry: &str) -> NavigationEntry {
    match TOCTREE_LABELED_RE.captures(entry) {
        Some(caps) => NavigationEntry {
            label: collapse_whitespace(&caps[1]),
            target: caps[2].trim().to_string(),
        },
        None => NavigationEntry {
            label: entry.to_string(),
            target: entry.to_string(),
        },
    }
}

/// Collapse every whitespace run to a single space.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anchor_labels_are_collected_in_order() {
        let source = ".. _getting-started:\n\nGetting Started\n===============\n\n   .. _sdk:cli_v2:  \n.. note:: not an anchor\n";
        assert_eq!(anchor_labels(source), vec!["getting-started", "sdk:cli_v2"]);
    }

    #[test]
    fn anchor_with_trailing_text_is_ignored() {
        assert!(anchor_labels(".. _foo: https://example.com\n").is_empty());
    }

    #[test]
    fn toctree_entries_with_and_without_labels() {
        let source = "Title\n=====\n\n.. toctree::\n   :maxdepth: 1\n\n   Bar <bar>\n   baz\n   Long\n   Label   Text <sub/index>\n\nAfter the tree.\n";
        let entries = toctree_entries(source);
        assert_eq!(
            entries,
            vec![
                NavigationEntry { label: "Bar".into(), target: "bar".into() },
                NavigationEntry { label: "baz".into(), target: "baz".into() },
                NavigationEntry { label: "Long".into(), target: "Long".into() },
                NavigationEntry { label: "Label Text".into(), target: "sub/index".into() },
            ]
        );
    }

    #[test]
    fn multiple_toctrees_are_concatenated() {
        let source = ".. toctree::\n\n   one\n\nText\n\n.. toctree::\n   :hidden:\n\n   two\n";
        let targets: Vec<_> = toctree_entries(source).into_iter().map(|e| e.target).collect();
        assert_eq!(targets, vec!["one", "two"]);
    }

    #[test]
    fn document_without_toctree_has_no_entries() {
        assert!(toctree_entries("Just text\n\n   indented\n").is_empty());
    }
}
