//! Inline `#tag` marker scanning.
//!
//! Scans body text (after the front matter block) for marker-prefixed tokens,
//! recording the byte span of every occurrence so rewrites can replace exactly the
//! marker and nothing else.
//!
//! Regions that are code, not prose, are excluded:
//! - fenced blocks (``` or ~~~),
//! - inline code spans (backtick runs).
//!
//! A `#` that is part of a URL fragment or glued to a preceding word is not a tag.

use regex::Regex;
use std::sync::OnceLock;

use crate::normalize::normalize_tag;

/// One accepted inline tag occurrence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineOccurrence {
    /// Normalized tag.
    pub tag: String,
    /// Raw token as written, without the `#` marker.
    pub raw: String,
    /// Byte offset of the `#` marker in the document.
    pub offset: usize,
    /// Byte length of the marker plus token.
    pub len: usize,
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#([A-Za-z0-9][A-Za-z0-9_/-]*)").unwrap())
}

/// Scan `text` for inline tags, starting at `body_start`.
///
/// Tokens that fail validation (see [`normalize_tag`]) are dropped silently; inline
/// scanning itself never fails.
pub fn scan_inline_tags(text: &str, body_start: usize) -> Vec<InlineOccurrence> {
    let mut out = Vec::new();
    let body = &text[body_start.min(text.len())..];

    let mut in_fence: Option<char> = None;

    let mut line_start = 0usize;
    for line in body.split_inclusive('\n') {
        let abs_line_start = body_start + line_start;
        line_start += line.len();

        let stripped = line.trim_start();
        if let Some(fence_char) = in_fence {
            if is_fence_line(stripped, fence_char) {
                in_fence = None;
            }
            continue;
        }
        if is_fence_line(stripped, '`') {
            in_fence = Some('`');
            continue;
        }
        if is_fence_line(stripped, '~') {
            in_fence = Some('~');
            continue;
        }

        let code_spans = inline_code_spans(line);

        for caps in marker_re().captures_iter(line) {
            let m = caps.get(0).unwrap();
            if code_spans.iter().any(|&(s, e)| m.start() >= s && m.start() < e) {
                continue;
            }
            if !marker_stands_alone(line, m.start()) {
                continue;
            }
            let raw = caps.get(1).unwrap().as_str();
            if let Some(tag) = normalize_tag(raw) {
                out.push(InlineOccurrence {
                    tag,
                    raw: raw.to_string(),
                    offset: abs_line_start + m.start(),
                    len: m.len(),
                });
            }
        }
    }

    out
}

fn is_fence_line(stripped: &str, fence_char: char) -> bool {
    stripped.chars().take_while(|&c| c == fence_char).count() >= 3
}

/// Byte ranges of inline code spans (single-backtick pairs) within one line.
fn inline_code_spans(line: &str) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;
    for (i, c) in line.char_indices() {
        if c == '`' {
            match open.take() {
                Some(start) => spans.push((start, i + 1)),
                None => open = Some(i),
            }
        }
    }
    spans
}

/// A marker only counts when it begins a token: the preceding character must not be
/// part of a word, another marker, an entity (`&#x2026;`), or a URL.
fn marker_stands_alone(line: &str, marker_start: usize) -> bool {
    let before = &line[..marker_start];
    if let Some(prev) = before.chars().next_back() {
        if prev.is_alphanumeric() || prev == '#' || prev == '&' {
            return false;
        }
    }
    // `https://example.com/#section`: the run of non-whitespace before the marker
    // carries a scheme separator.
    let word_start = before
        .rfind(|c: char| c.is_whitespace())
        .map(|i| i + 1)
        .unwrap_or(0);
    !before[word_start..].contains("://")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(text: &str) -> Vec<String> {
        scan_inline_tags(text, 0).into_iter().map(|o| o.tag).collect()
    }

    #[test]
    fn plain_markers() {
        assert_eq!(tags("Working on #projects and #deep-work today"), vec![
            "projects".to_string(),
            "deep-work".to_string()
        ]);
    }

    #[test]
    fn nested_path_segments() {
        let occ = scan_inline_tags("status: #area/health/sleep", 0);
        assert_eq!(occ.len(), 1);
        assert_eq!(occ[0].tag, "area/health/sleep");
        assert_eq!(occ[0].len, "#area/health/sleep".len());
    }

    #[test]
    fn offsets_are_document_absolute() {
        let doc = "prefix\nsee #alpha here";
        let occ = scan_inline_tags(doc, 0);
        assert_eq!(occ[0].offset, doc.find("#alpha").unwrap());
    }

    #[test]
    fn fenced_code_is_skipped() {
        let doc = "#keep\n```\n#skip\n```\n#keep-too\n";
        assert_eq!(tags(doc), vec!["keep".to_string(), "keep-too".to_string()]);
    }

    #[test]
    fn tilde_fences_too() {
        let doc = "~~~\n#skip\n~~~\n#keep\n";
        assert_eq!(tags(doc), vec!["keep".to_string()]);
    }

    #[test]
    fn inline_code_spans_are_skipped() {
        assert_eq!(tags("use `#not-a-tag` but #real"), vec!["real".to_string()]);
    }

    #[test]
    fn url_fragments_are_not_tags() {
        assert!(tags("see https://example.com/page#section").is_empty());
        assert!(tags("see https://example.com/#section").is_empty());
    }

    #[test]
    fn entities_and_glued_hashes_are_not_tags() {
        assert!(tags("&#x2026; and word#glued and ##double").is_empty());
    }

    #[test]
    fn body_start_skips_header_region() {
        let doc = "---\ntags: [x]\n---\n#inline-one\n";
        let start = doc.find("#inline-one").unwrap();
        let occ = scan_inline_tags(doc, doc.find("\n#").unwrap() + 1);
        assert_eq!(occ[0].offset, start);
    }
}
