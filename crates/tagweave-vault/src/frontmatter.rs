//! YAML front matter parsing (header tags).
//!
//! A header block is a `---` delimited YAML region starting at byte 0, terminated by
//! a `---` or `...` line. Tags live under a `tags:` or `tag:` key and may be written
//! as a block sequence, an inline array, or a (possibly comma-separated) scalar.
//!
//! Besides the tag values themselves we record:
//! - the byte span of the whole block,
//! - the byte span of the tags entry,
//! - the representation style,
//!
//! so the operation engine can rewrite tags without reflowing anything else.

use crate::error::VaultError;

/// How the tags entry is written in the YAML source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderStyle {
    /// Block sequence (`tags:` followed by `- item` lines).
    Sequence,
    /// Inline array (`tags: [a, b]`).
    InlineArray,
    /// Scalar (`tags: a` or `tags: a, b`).
    Scalar,
}

/// Parsed front matter block.
#[derive(Debug, Clone)]
pub struct FrontMatter {
    /// Byte range of the block, including both delimiter lines.
    pub block_span: (usize, usize),
    /// Raw tag values in declaration order (before normalization).
    pub raw_tags: Vec<String>,
    /// The key the tags were found under (`tags` or `tag`), if any.
    pub key: Option<String>,
    /// Representation style of the tags entry. `Sequence` when no entry exists.
    pub style: HeaderStyle,
    /// Byte range of the tags entry (key line through its last value line).
    pub entry_span: Option<(usize, usize)>,
}

/// Locate the delimited block without parsing its contents.
///
/// Used to skip the header region when YAML parsing failed, so malformed metadata is
/// not re-scanned as body text.
pub fn block_span_lenient(text: &str) -> Option<(usize, usize)> {
    let mut lines = line_spans(text);
    let (first_start, first_end) = lines.next()?;
    if text[first_start..first_end].trim_end() != "---" {
        return None;
    }
    for (start, end) in lines {
        let line = text[start..end].trim_end();
        if line == "---" || line == "..." {
            return Some((0, end));
        }
    }
    None
}

/// Parse the front matter block at the start of `text`.
///
/// Returns `Ok(None)` when the document has no block at all. A block that exists but
/// cannot be decoded is an error, scoped to this document by the caller.
pub fn parse_front_matter(text: &str) -> Result<Option<FrontMatter>, VaultError> {
    if !text.starts_with("---") {
        return Ok(None);
    }
    let first_line_end = text.find('\n').map(|i| i + 1).unwrap_or(text.len());
    if text[..first_line_end].trim_end() != "---" {
        return Ok(None);
    }

    let block_span = match block_span_lenient(text) {
        Some(span) => span,
        None => return Err(VaultError::UnterminatedHeader),
    };

    // Inner YAML source, without the delimiter lines.
    let inner_start = first_line_end;
    let inner_end = {
        // block_span.1 is past the terminator line; walk back over it.
        let terminator_start = text[..block_span.1]
            .trim_end_matches('\n')
            .rfind('\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        terminator_start
    };
    let inner = &text[inner_start..inner_end];

    let value: serde_yaml::Value = serde_yaml::from_str(inner)
        .map_err(|e| VaultError::MalformedHeader(e.to_string()))?;

    let mut fm = FrontMatter {
        block_span,
        raw_tags: Vec::new(),
        key: None,
        style: HeaderStyle::Sequence,
        entry_span: None,
    };

    let mapping = match value {
        serde_yaml::Value::Mapping(m) => m,
        serde_yaml::Value::Null => return Ok(Some(fm)),
        other => {
            return Err(VaultError::MalformedHeader(format!(
                "front matter is not a mapping (found {})",
                yaml_kind(&other)
            )))
        }
    };

    for key in ["tags", "tag"] {
        if let Some(value) = mapping.get(key) {
            fm.raw_tags = tags_from_value(value)?;
            fm.key = Some(key.to_string());
            let (style, entry_span) = locate_entry(text, inner_start, inner_end, key);
            fm.style = style;
            fm.entry_span = entry_span;
            break;
        }
    }

    Ok(Some(fm))
}

fn tags_from_value(value: &serde_yaml::Value) -> Result<Vec<String>, VaultError> {
    match value {
        serde_yaml::Value::Sequence(items) => {
            let mut out = Vec::new();
            for item in items {
                match item {
                    serde_yaml::Value::String(s) => out.push(s.clone()),
                    serde_yaml::Value::Number(n) => out.push(n.to_string()),
                    serde_yaml::Value::Bool(b) => out.push(b.to_string()),
                    serde_yaml::Value::Null => {}
                    other => {
                        return Err(VaultError::MalformedHeader(format!(
                            "tag list item is a {}",
                            yaml_kind(other)
                        )))
                    }
                }
            }
            Ok(out)
        }
        serde_yaml::Value::String(s) => Ok(split_scalar(s)),
        serde_yaml::Value::Number(n) => Ok(vec![n.to_string()]),
        serde_yaml::Value::Null => Ok(Vec::new()),
        other => Err(VaultError::MalformedHeader(format!(
            "tags value is a {}",
            yaml_kind(other)
        ))),
    }
}

/// A scalar tags value may hold several comma-separated tags.
fn split_scalar(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Find the tags entry in the raw block text: its style and byte span.
fn locate_entry(
    text: &str,
    inner_start: usize,
    inner_end: usize,
    key: &str,
) -> (HeaderStyle, Option<(usize, usize)>) {
    let mut entry_start = None;
    let mut entry_end = None;
    let mut style = HeaderStyle::Sequence;

    for (start, end) in line_spans(&text[inner_start..inner_end]) {
        let (start, end) = (inner_start + start, inner_start + end);
        let line = &text[start..end];
        let trimmed = line.trim_end();

        if entry_start.is_none() {
            let Some(rest) = trimmed.strip_prefix(key).and_then(|r| r.strip_prefix(':')) else {
                continue;
            };
            entry_start = Some(start);
            entry_end = Some(end);
            let value = rest.trim();
            if value.starts_with('[') {
                style = HeaderStyle::InlineArray;
                break;
            } else if value.is_empty() {
                style = HeaderStyle::Sequence;
                // Entry continues over the following `- item` lines.
            } else {
                style = HeaderStyle::Scalar;
                break;
            }
        } else {
            let stripped = line.trim_start();
            if stripped.starts_with("- ") || stripped.trim_end() == "-" {
                entry_end = Some(end);
            } else {
                break;
            }
        }
    }

    match (entry_start, entry_end) {
        (Some(s), Some(e)) => (style, Some((s, e))),
        _ => (style, None),
    }
}

fn yaml_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

/// Iterate `(start, end)` byte spans of lines, `end` past the trailing newline.
fn line_spans(text: &str) -> impl Iterator<Item = (usize, usize)> + '_ {
    let mut pos = 0;
    std::iter::from_fn(move || {
        if pos >= text.len() {
            return None;
        }
        let start = pos;
        let end = match text[pos..].find('\n') {
            Some(i) => pos + i + 1,
            None => text.len(),
        };
        pos = end;
        Some((start, end))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_front_matter() {
        assert!(parse_front_matter("# Title\nbody").unwrap().is_none());
    }

    #[test]
    fn block_sequence_tags() {
        let doc = "---\ntitle: Note\ntags:\n  - work\n  - Deep-Focus\n---\nbody\n";
        let fm = parse_front_matter(doc).unwrap().unwrap();
        assert_eq!(fm.raw_tags, vec!["work", "Deep-Focus"]);
        assert_eq!(fm.style, HeaderStyle::Sequence);
        assert_eq!(fm.key.as_deref(), Some("tags"));
        let (s, e) = fm.entry_span.unwrap();
        assert_eq!(&doc[s..e], "tags:\n  - work\n  - Deep-Focus\n");
    }

    #[test]
    fn inline_array_tags() {
        let doc = "---\ntags: [a1, b2]\n---\n";
        let fm = parse_front_matter(doc).unwrap().unwrap();
        assert_eq!(fm.raw_tags, vec!["a1", "b2"]);
        assert_eq!(fm.style, HeaderStyle::InlineArray);
    }

    #[test]
    fn comma_separated_scalar() {
        let doc = "---\ntag: work, notes\n---\n";
        let fm = parse_front_matter(doc).unwrap().unwrap();
        assert_eq!(fm.raw_tags, vec!["work", "notes"]);
        assert_eq!(fm.style, HeaderStyle::Scalar);
        assert_eq!(fm.key.as_deref(), Some("tag"));
    }

    #[test]
    fn malformed_yaml_is_an_error() {
        let doc = "---\ntags: [unclosed\n---\n";
        assert!(parse_front_matter(doc).is_err());
    }

    #[test]
    fn unterminated_block_is_an_error() {
        let doc = "---\ntags: [a]\nbody without terminator\n";
        assert!(matches!(
            parse_front_matter(doc),
            Err(VaultError::UnterminatedHeader)
        ));
    }

    #[test]
    fn numeric_items_are_rendered_not_dropped() {
        // Validation rejects them later; parsing is faithful.
        let doc = "---\ntags:\n  - 2024\n  - plans\n---\n";
        let fm = parse_front_matter(doc).unwrap().unwrap();
        assert_eq!(fm.raw_tags, vec!["2024", "plans"]);
    }
}
