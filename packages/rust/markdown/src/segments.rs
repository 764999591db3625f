//! Splitting converted Markdown into fenced code regions and prose.
//!
//! Every rewrite in this crate is scoped to one of the two kinds; nothing is
//! allowed to cross a fence boundary.

/// Kind of a contiguous region of Markdown text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentKind {
    /// A fenced code block, opening and closing fence lines included.
    Fenced,
    /// Everything else.
    Prose,
}

/// A borrowed region of the input text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Segment<'a> {
    pub kind: SegmentKind,
    pub text: &'a str,
}

/// Length of the backtick run opening a fence, if `line` opens one.
pub(crate) fn fence_open_len(line: &str) -> Option<usize> {
    let run = backtick_run(line.trim_start());
    (run >= 3).then_some(run)
}

/// A line closes a fence opened with `open_len` backticks when it holds
/// nothing but backticks, at least as many as the opener.
pub(crate) fn is_fence_close(line: &str, open_len: usize) -> bool {
    let trimmed = line.trim();
    trimmed.bytes().all(|b| b == b'`') && trimmed.len() >= open_len.max(3)
}

fn backtick_run(s: &str) -> usize {
    s.bytes().take_while(|&b| b == b'`').count()
}

/// Split `text` into alternating prose and fenced segments.
///
/// An opening fence without a matching close is treated as prose.
pub(crate) fn split(text: &str) -> Vec<Segment<'_>> {
    let lines = line_spans(text);
    let mut segments = Vec::new();
    let mut prose_start = 0;
    let mut i = 0;

    while i < lines.len() {
        let (start, line) = lines[i];
        if let Some(open_len) = fence_open_len(line) {
            let close = (i + 1..lines.len()).find(|&j| is_fence_close(lines[j].1, open_len));
            if let Some(close) = close {
                if prose_start < start {
                    segments.push(Segment {
                        kind: SegmentKind::Prose,
                        text: &text[prose_start..start],
                    });
                }
                let (close_start, close_line) = lines[close];
                let end = close_start + close_line.len();
                segments.push(Segment {
                    kind: SegmentKind::Fenced,
                    text: &text[start..end],
                });
                prose_start = end;
                i = close + 1;
                continue;
            }
        }
        i += 1;
    }

    if prose_start < text.len() {
        segments.push(Segment {
            kind: SegmentKind::Prose,
            text: &text[prose_start..],
        });
    }

    segments
}

/// Rebuild `text`, passing fenced and prose segments through their own transform.
pub(crate) fn map_segments(
    text: &str,
    mut fenced: impl FnMut(&str) -> String,
    mut prose: impl FnMut(&str) -> String,
) -> String {
    let mut out = String::with_capacity(text.len());
    for segment in split(text) {
        match segment.kind {
            SegmentKind::Fenced => out.push_str(&fenced(segment.text)),
            SegmentKind::Prose => out.push_str(&prose(segment.text)),
        }
    }
    out
}

/// Rebuild `text`, transforming only the prose segments.
pub(crate) fn map_prose(text: &str, prose: impl FnMut(&str) -> String) -> String {
    map_segments(text, str::to_string, prose)
}

/// Byte offset and content (newline included) of every line.
fn line_spans(text: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    text.split_inclusive('\n')
        .map(|line| {
            let start = offset;
            offset += line.len();
            (start, line)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_separates_fences_from_prose() {
        let text = "intro\n```rust\nlet x = 1;\n```\noutro\n";
        let segments = split(text);
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].kind, SegmentKind::Prose);
        assert_eq!(segments[0].text, "intro\n");
        assert_eq!(segments[1].kind, SegmentKind::Fenced);
        assert_eq!(segments[1].text, "```rust\nlet x = 1;\n```\n");
        assert_eq!(segments[2].text, "outro\n");
    }

    #[test]
    fn unclosed_fence_is_prose() {
        let text = "```text\nnever closed\n";
        let segments = split(text);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].kind, SegmentKind::Prose);
    }

    #[test]
    fn indented_fences_are_recognized() {
        let text = "- item\n\n    ```\n    code\n    ```\n";
        let segments = split(text);
        assert_eq!(segments[1].kind, SegmentKind::Fenced);
        assert_eq!(segments[1].text, "    ```\n    code\n    ```\n");
    }

    #[test]
    fn shorter_fence_inside_longer_one_stays_code() {
        let text = "a\n````\n```\ninner\n````\nb\n```\nreal\n```\nc\n";
        let kinds: Vec<(SegmentKind, &str)> = split(text).iter().map(|s| (s.kind, s.text)).collect();
        assert_eq!(
            kinds,
            vec![
                (SegmentKind::Prose, "a\n"),
                (SegmentKind::Fenced, "````\n```\ninner\n````\n"),
                (SegmentKind::Prose, "b\n"),
                (SegmentKind::Fenced, "```\nreal\n```\n"),
                (SegmentKind::Prose, "c\n"),
            ]
        );
    }

    #[test]
    fn close_needs_a_bare_run_at_least_as_long() {
        assert!(is_fence_close("````\n", 4));
        assert!(is_fence_close("`````", 4));
        assert!(!is_fence_close("```", 4));
        assert!(!is_fence_close("```rust", 3));
        assert_eq!(fence_open_len("  ````text"), Some(4));
        assert_eq!(fence_open_len("``inline``"), None);
    }

    #[test]
    fn map_prose_leaves_fences_alone() {
        let text = "a\n```\na\n```\na";
        let out = map_prose(text, |s| s.replace('a', "b"));
        assert_eq!(out, "b\n```\na\n```\nb");
    }
}
