//! Diagram directive placeholders.
//!
//! The external converter does not understand `.. uml::` directives and would
//! mangle their content, so each directive is swapped for a numbered token
//! before conversion and swapped back for a fenced block afterwards.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Prefix of every placeholder token; the block index follows it.
pub const PLACEHOLDER_PREFIX: &str = "DOCMIGRATE_UML_PLACEHOLDER_";

static DIRECTIVE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\s*)\.\.\s+uml::\s*$").expect("uml directive regex"));

/// Diagram sources captured from one document, indexed by placeholder number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiagramBlocks {
    blocks: Vec<String>,
}

impl DiagramBlocks {
    /// Number of captured diagrams.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the document had no diagrams.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Diagram source for placeholder `index`.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.blocks.get(index).map(String::as_str)
    }

    /// Replace placeholder lines in converted output with fenced `text` blocks.
    ///
    /// Each placeholder is restored at most once; unknown tokens stay as they are.
    pub fn restore(&self, converted: &str) -> String {
        if self.blocks.is_empty() {
            return converted.to_string();
        }

        let mut restored: HashSet<usize> = HashSet::new();
        let mut out: Vec<String> = Vec::new();

        for line in converted.lines() {
            match self.placeholder_index(line) {
                Some(index) if restored.insert(index) => {
                    out.push(format!("```text\n{}\n```", self.blocks[index]));
                }
                _ => out.push(line.to_string()),
            }
        }

        debug!(restored = restored.len(), total = self.blocks.len(), "restored diagrams");

        let mut result = out.join("\n");
        if converted.ends_with('\n') {
            result.push('\n');
        }
        result
    }

    /// Index of the placeholder a line consists of, ignoring whitespace and
    /// backslash escapes the converter may have added.
    fn placeholder_index(&self, line: &str) -> Option<usize> {
        let token: String = line.trim().chars().filter(|&c| c != '\\').collect();
        let index: usize = token.strip_prefix(PLACEHOLDER_PREFIX)?.parse().ok()?;
        (index < self.blocks.len()).then_some(index)
    }
}

/// Placeholder token for block `index`.
pub fn placeholder(index: usize) -> String {
    format!("{PLACEHOLDER_PREFIX}{index}")
}

/// Swap every `.. uml::` directive in `source` for a placeholder line.
///
/// Directive content is every following line indented deeper than the directive,
/// blank lines included. The smallest content indentation is stripped from each
/// line. A directive with no content is left untouched.
pub fn extract_diagrams(source: &str) -> (String, DiagramBlocks) {
    let lines: Vec<&str> = source.lines().collect();
    let mut out: Vec<String> = Vec::with_capacity(lines.len());
    let mut blocks = DiagramBlocks::default();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let Some(caps) = DIRECTIVE_RE.captures(line) else {
            out.push(line.to_string());
            i += 1;
            continue;
        };

        let directive_indent = caps.get(1).map_or("", |m| m.as_str());
        let base_indent = directive_indent.len();
        let mut j = i + 1;
        let mut block_lines: Vec<&str> = Vec::new();
        let mut content_indent: Option<usize> = None;

        while j < lines.len() {
            let next = lines[j];
            if next.trim().is_empty() {
                block_lines.push("");
                j += 1;
                continue;
            }

            let indent = leading_spaces(next);
            if indent <= base_indent {
                break;
            }

            content_indent = Some(content_indent.map_or(indent, |current| current.min(indent)));
            block_lines.push(next);
            j += 1;
        }

        let Some(content_indent) = content_indent else {
            out.push(line.to_string());
            i += 1;
            continue;
        };

        let diagram = block_lines
            .iter()
            .map(|raw| if raw.is_empty() { "" } else { &raw[content_indent..] })
            .collect::<Vec<_>>()
            .join("\n");
        let diagram = diagram.trim_matches('\n').to_string();

        // Isolate the token so the converter keeps it as its own paragraph.
        if out.last().is_some_and(|last| !last.is_empty()) {
            out.push(String::new());
        }
        out.push(format!("{directive_indent}{}", placeholder(blocks.len())));
        out.push(String::new());
        blocks.blocks.push(diagram);

        i = j;
    }

    let mut result = out.join("\n");
    if source.ends_with('\n') {
        result.push('\n');
    }
    (result, blocks)
}

fn leading_spaces(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn directive_becomes_isolated_placeholder() {
        let source = "Intro text.\n.. uml::\n\n   Alice -> Bob\n   Bob -> Alice\n\nAfter.\n";
        let (prepared, blocks) = extract_diagrams(source);

        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks.get(0), Some("Alice -> Bob\nBob -> Alice"));
        assert_eq!(
            prepared,
            "Intro text.\n\nDOCMIGRATE_UML_PLACEHOLDER_0\n\nAfter.\n"
        );
    }

    #[test]
    fn minimum_indentation_keeps_relative_nesting() {
        let source = ".. uml::\n\n      @startuml\n    start\n      :step;\n    stop\n";
        let (_, blocks) = extract_diagrams(source);
        assert_eq!(blocks.get(0), Some("  @startuml\nstart\n  :step;\nstop"));
    }

    #[test]
    fn empty_directive_is_left_untouched() {
        let source = "Text\n.. uml::\nNot content\n";
        let (prepared, blocks) = extract_diagrams(source);
        assert!(blocks.is_empty());
        assert_eq!(prepared, source);
    }

    #[test]
    fn indices_are_sequential_within_a_document() {
        let source = ".. uml::\n\n   A\n\n.. uml::\n\n   B\n";
        let (prepared, blocks) = extract_diagrams(source);
        assert_eq!(blocks.len(), 2);
        assert!(prepared.contains(&placeholder(0)));
        assert!(prepared.contains(&placeholder(1)));
    }

    #[test]
    fn nested_directive_keeps_its_indentation() {
        let source = ".. note::\n\n   .. uml::\n\n      A -> B\n\n   Back in the note.\n";
        let (prepared, blocks) = extract_diagrams(source);
        assert_eq!(blocks.get(0), Some("A -> B"));
        assert!(prepared.contains("\n   DOCMIGRATE_UML_PLACEHOLDER_0\n"));
        assert!(prepared.contains("   Back in the note."));
    }

    #[test]
    fn round_trip_reproduces_diagram_source() {
        let diagram = "@startuml\n  Alice -> Bob: hi\n\n  Bob --> Alice\n@enduml";
        let indented: String = diagram
            .lines()
            .map(|l| if l.is_empty() { String::new() } else { format!("    {l}") })
            .collect::<Vec<_>>()
            .join("\n");
        let source = format!("Some prose before.\n\n.. uml::\n\n{indented}\n\nMore prose.\n");

        let (prepared, blocks) = extract_diagrams(&source);
        // Stand-in for the converter: prose passes through, token line preserved.
        let restored = blocks.restore(&prepared);

        assert!(restored.contains(&format!("```text\n{diagram}\n```")));
        assert!(restored.contains("Some prose before."));
        assert!(restored.contains("More prose."));
    }

    #[test]
    fn restore_tolerates_escaped_underscores_and_whitespace() {
        let (_, blocks) = extract_diagrams(".. uml::\n\n   A -> B\n");
        let converted = "Before\n\n  DOCMIGRATE\\_UML\\_PLACEHOLDER\\_0  \n\nAfter";
        assert_eq!(
            blocks.restore(converted),
            "Before\n\n```text\nA -> B\n```\n\nAfter"
        );
    }

    #[test]
    fn restore_happens_once_and_ignores_unknown_tokens() {
        let (_, blocks) = extract_diagrams(".. uml::\n\n   A\n");
        let converted = format!("{p}\n{p}\n{q}\n", p = placeholder(0), q = placeholder(7));
        let restored = blocks.restore(&converted);
        assert_eq!(restored.matches("```text").count(), 1);
        assert!(restored.contains(&placeholder(0)));
        assert!(restored.contains(&placeholder(7)));
    }
}
