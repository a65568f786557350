//! Content transformation: apply one tag edit to a document's raw text.
//!
//! The contract is formatting preservation:
//! - header rewrites keep the original representation style (block sequence,
//!   inline array, scalar) and only change tag values,
//! - inline rewrites replace exactly the recorded byte span of a marker,
//! - everything else in the document is byte-identical.
//!
//! Transformation is pure (text in, text out) so preview and execute modes share
//! it verbatim; only the write step differs.

use tagweave_vault::{
    extract_document, frontmatter, normalize_tag, HeaderStyle, TagSource,
};

use crate::EngineError;

/// One atomic tag edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocEdit {
    Rename { from: String, to: String },
    Remove { tag: String },
    Add { tags: Vec<String> },
}

impl std::fmt::Display for DocEdit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocEdit::Rename { from, to } => write!(f, "rename {from} -> {to}"),
            DocEdit::Remove { tag } => write!(f, "remove {tag}"),
            DocEdit::Add { tags } => write!(f, "add {}", tags.join(", ")),
        }
    }
}

/// An edit restricted to header tags, inline tags, or both.
#[derive(Debug, Clone)]
pub struct ScopedEdit {
    pub edit: DocEdit,
    pub scope: TagSource,
}

impl ScopedEdit {
    fn touches_header(&self) -> bool {
        matches!(self.scope, TagSource::Header | TagSource::Both)
    }

    fn touches_inline(&self) -> bool {
        matches!(self.scope, TagSource::Inline | TagSource::Both)
    }
}

/// A byte-span replacement; applied back-to-front so spans stay valid.
struct Splice {
    start: usize,
    end: usize,
    replacement: String,
}

/// Apply `edit` to `text`.
///
/// Returns `Ok(None)` when the document needs no change (the edit is a no-op for
/// it); reapplying an already-applied edit is therefore idempotent.
pub fn transform_document(text: &str, edit: &ScopedEdit) -> Result<Option<String>, EngineError> {
    let mut splices: Vec<Splice> = Vec::new();
    let mut body_start = 0usize;

    // Header side. A malformed header is skipped here exactly like the extractor
    // skips it: the document still gets its inline rewrite.
    match frontmatter::parse_front_matter(text) {
        Ok(Some(header)) => {
            body_start = header.block_span.1;
            if edit.touches_header() {
                splices.extend(header_splices(text, &header, &edit.edit)?);
            }
        }
        Ok(None) => {
            if edit.touches_header() {
                if let DocEdit::Add { tags } = &edit.edit {
                    // No front matter at all: create a minimal block.
                    let rendered = format!("---\ntags: [{}]\n---\n", tags.join(", "));
                    splices.push(Splice {
                        start: 0,
                        end: 0,
                        replacement: rendered,
                    });
                }
            }
        }
        Err(_) => {
            body_start = frontmatter::block_span_lenient(text).map(|s| s.1).unwrap_or(0);
        }
    }

    if edit.touches_inline() {
        splices.extend(inline_splices(text, body_start, &edit.edit));
    }

    if splices.is_empty() {
        return Ok(None);
    }

    splices.sort_by(|a, b| b.start.cmp(&a.start));
    let mut out = text.to_string();
    for splice in splices {
        out.replace_range(splice.start..splice.end, &splice.replacement);
    }
    Ok(Some(out))
}

/// Number of atomic tag changes the edit causes in `text` (for run statistics).
pub fn count_tag_changes(text: &str, edit: &ScopedEdit) -> usize {
    let before = extract_document(text);
    let mut changes = 0usize;

    if edit.touches_header() {
        changes += match &edit.edit {
            DocEdit::Rename { from, .. } | DocEdit::Remove { tag: from } => {
                before.header_tags.iter().filter(|t| *t == from).count()
            }
            DocEdit::Add { tags } => tags
                .iter()
                .filter(|t| !before.header_tags.contains(t))
                .count(),
        };
    }
    if edit.touches_inline() {
        changes += match &edit.edit {
            DocEdit::Rename { from, .. } | DocEdit::Remove { tag: from } => {
                before.inline.iter().filter(|o| o.tag == *from).count()
            }
            DocEdit::Add { .. } => 0,
        };
    }
    changes
}

fn header_splices(
    text: &str,
    header: &tagweave_vault::FrontMatter,
    edit: &DocEdit,
) -> Result<Vec<Splice>, EngineError> {
    let Some(new_tags) = edited_tag_list(&header.raw_tags, edit) else {
        return Ok(Vec::new());
    };

    let Some((start, end)) = header.entry_span else {
        if header.raw_tags.is_empty() {
            // Adding to a header that has no tags entry yet: insert one.
            let insert_at = insertion_point(text, header);
            return Ok(vec![Splice {
                start: insert_at,
                end: insert_at,
                replacement: format!("tags: [{}]\n", new_tags.join(", ")),
            }]);
        }
        // Tags exist but their entry could not be located; refuse rather than
        // guess at a rewrite. The validator would catch a stale tag anyway.
        return Err(EngineError::Validation(
            "tags entry could not be located in the header".to_string(),
        ));
    };

    let key = header.key.as_deref().unwrap_or("tags");
    let replacement = if new_tags.is_empty() {
        String::new()
    } else {
        render_entry(key, header.style, &detect_indent(&text[start..end]), &new_tags)
    };
    Ok(vec![Splice {
        start,
        end,
        replacement,
    }])
}

/// Apply the edit to the raw header tag list. `None` means no change.
fn edited_tag_list(raw_tags: &[String], edit: &DocEdit) -> Option<Vec<String>> {
    let normalized: Vec<Option<String>> = raw_tags.iter().map(|t| normalize_tag(t)).collect();

    match edit {
        DocEdit::Rename { from, to } => {
            if !normalized.iter().flatten().any(|t| t == from) {
                return None;
            }
            let mut out = Vec::new();
            let mut target_present = normalized.iter().flatten().any(|t| t == to);
            for (raw, norm) in raw_tags.iter().zip(&normalized) {
                match norm {
                    Some(n) if n == from => {
                        // Replace the first occurrence; fold the rest away.
                        if !target_present {
                            out.push(to.clone());
                            target_present = true;
                        }
                    }
                    _ => out.push(raw.clone()),
                }
            }
            Some(out)
        }
        DocEdit::Remove { tag } => {
            if !normalized.iter().flatten().any(|t| t == tag) {
                return None;
            }
            Some(
                raw_tags
                    .iter()
                    .zip(&normalized)
                    .filter(|(_, n)| n.as_deref() != Some(tag.as_str()))
                    .map(|(raw, _)| raw.clone())
                    .collect(),
            )
        }
        DocEdit::Add { tags } => {
            let missing: Vec<&String> = tags
                .iter()
                .filter(|t| !normalized.iter().flatten().any(|n| n == *t))
                .collect();
            if missing.is_empty() {
                return None;
            }
            let mut out = raw_tags.to_vec();
            out.extend(missing.into_iter().cloned());
            Some(out)
        }
    }
}

/// Insert new entries just before the closing delimiter line.
fn insertion_point(text: &str, header: &tagweave_vault::FrontMatter) -> usize {
    let end = header.block_span.1;
    text[..end]
        .trim_end_matches('\n')
        .rfind('\n')
        .map(|i| i + 1)
        .unwrap_or(end)
}

fn detect_indent(entry_text: &str) -> String {
    for line in entry_text.lines().skip(1) {
        let indent: String = line.chars().take_while(|c| *c == ' ').collect();
        if line.trim_start().starts_with('-') {
            return indent;
        }
    }
    "  ".to_string()
}

fn render_entry(key: &str, style: HeaderStyle, indent: &str, tags: &[String]) -> String {
    match style {
        HeaderStyle::Sequence => {
            let mut out = format!("{key}:\n");
            for tag in tags {
                out.push_str(&format!("{indent}- {tag}\n"));
            }
            out
        }
        HeaderStyle::InlineArray => format!("{key}: [{}]\n", tags.join(", ")),
        HeaderStyle::Scalar => format!("{key}: {}\n", tags.join(", ")),
    }
}

fn inline_splices(text: &str, body_start: usize, edit: &DocEdit) -> Vec<Splice> {
    let occurrences = tagweave_vault::scan_inline_tags(text, body_start);
    let mut out = Vec::new();

    for occ in occurrences {
        match edit {
            DocEdit::Rename { from, to } if occ.tag == *from => out.push(Splice {
                start: occ.offset,
                end: occ.offset + occ.len,
                replacement: format!("#{to}"),
            }),
            DocEdit::Remove { tag } if occ.tag == *tag => {
                // Take a single preceding space with the marker so prose does not
                // end up with doubled spaces.
                let start = if occ.offset > 0 && text.as_bytes()[occ.offset - 1] == b' ' {
                    occ.offset - 1
                } else {
                    occ.offset
                };
                out.push(Splice {
                    start,
                    end: occ.offset + occ.len,
                    replacement: String::new(),
                });
            }
            _ => {}
        }
    }
    out
}

/// Re-parse transformed content and confirm the edit's expected post-state.
///
/// `old_text` is the pre-transform content: a header that was already malformed
/// before the edit stays a per-document extraction error, not a transform failure.
pub fn validate_transform(
    old_text: &str,
    new_text: &str,
    edit: &ScopedEdit,
) -> Result<(), EngineError> {
    let after = extract_document(new_text);

    if edit.touches_header() && !after.errors.is_empty() {
        let before = extract_document(old_text);
        if before.errors.is_empty() {
            return Err(EngineError::Validation(format!(
                "header no longer parses after transform: {}",
                after.errors.join("; ")
            )));
        }
    }

    let header_has = |tag: &str| after.header_tags.iter().any(|t| t == tag);
    let inline_has = |tag: &str| after.inline.iter().any(|o| o.tag == tag);
    let in_scope = |tag: &str, scoped: &ScopedEdit| {
        (scoped.touches_header() && header_has(tag))
            || (scoped.touches_inline() && inline_has(tag))
    };

    match &edit.edit {
        DocEdit::Rename { from, to } => {
            if in_scope(from, edit) {
                return Err(EngineError::Validation(format!(
                    "source tag `{from}` still present after rename"
                )));
            }
            if !in_scope(to, edit) {
                return Err(EngineError::Validation(format!(
                    "target tag `{to}` missing after rename"
                )));
            }
        }
        DocEdit::Remove { tag } => {
            if in_scope(tag, edit) {
                return Err(EngineError::Validation(format!(
                    "tag `{tag}` still present after removal"
                )));
            }
        }
        DocEdit::Add { tags } => {
            for tag in tags {
                if !header_has(tag) {
                    return Err(EngineError::Validation(format!(
                        "tag `{tag}` missing after add"
                    )));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rename(from: &str, to: &str) -> ScopedEdit {
        ScopedEdit {
            edit: DocEdit::Rename {
                from: from.to_string(),
                to: to.to_string(),
            },
            scope: TagSource::Both,
        }
    }

    #[test]
    fn sequence_style_is_preserved() {
        let doc = "---\ntitle: Note\ntags:\n  - work\n  - notes\n---\nBody stays.\n";
        let out = transform_document(doc, &rename("work", "projects"))
            .unwrap()
            .unwrap();
        assert_eq!(
            out,
            "---\ntitle: Note\ntags:\n  - projects\n  - notes\n---\nBody stays.\n"
        );
    }

    #[test]
    fn inline_array_style_is_preserved() {
        let doc = "---\ntags: [work, notes]\n---\n";
        let out = transform_document(doc, &rename("work", "projects"))
            .unwrap()
            .unwrap();
        assert_eq!(out, "---\ntags: [projects, notes]\n---\n");
    }

    #[test]
    fn scalar_style_is_preserved() {
        let doc = "---\ntag: work, notes\n---\n";
        let out = transform_document(doc, &rename("notes", "journal"))
            .unwrap()
            .unwrap();
        assert_eq!(out, "---\ntag: work, journal\n---\n");
    }

    #[test]
    fn rename_to_existing_tag_dedupes() {
        let doc = "---\ntags: [work, projects]\n---\n";
        let out = transform_document(doc, &rename("work", "projects"))
            .unwrap()
            .unwrap();
        assert_eq!(out, "---\ntags: [projects]\n---\n");
    }

    #[test]
    fn inline_marker_span_is_rewritten_exactly() {
        let doc = "Leading text #work trailing text #keep\n";
        let out = transform_document(doc, &rename("work", "projects"))
            .unwrap()
            .unwrap();
        assert_eq!(out, "Leading text #projects trailing text #keep\n");
    }

    #[test]
    fn absent_source_tag_is_a_noop() {
        let doc = "---\ntags: [other]\n---\nNo markers here.\n";
        assert!(transform_document(doc, &rename("work", "projects"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn header_scope_leaves_inline_alone() {
        let doc = "---\ntags: [work]\n---\nStill #work inline.\n";
        let edit = ScopedEdit {
            scope: TagSource::Header,
            ..rename("work", "projects")
        };
        let out = transform_document(doc, &edit).unwrap().unwrap();
        assert_eq!(out, "---\ntags: [projects]\n---\nStill #work inline.\n");
        validate_transform(doc, &out, &edit).unwrap();
    }

    #[test]
    fn remove_drops_entry_when_list_empties() {
        let doc = "---\ntitle: Note\ntags: [work]\n---\n";
        let edit = ScopedEdit {
            edit: DocEdit::Remove {
                tag: "work".to_string(),
            },
            scope: TagSource::Both,
        };
        let out = transform_document(doc, &edit).unwrap().unwrap();
        assert_eq!(out, "---\ntitle: Note\n---\n");
    }

    #[test]
    fn remove_inline_takes_one_space() {
        let doc = "Some prose #work here.\n";
        let edit = ScopedEdit {
            edit: DocEdit::Remove {
                tag: "work".to_string(),
            },
            scope: TagSource::Both,
        };
        let out = transform_document(doc, &edit).unwrap().unwrap();
        assert_eq!(out, "Some prose here.\n");
    }

    #[test]
    fn add_creates_front_matter_when_missing() {
        let doc = "Just a body.\n";
        let edit = ScopedEdit {
            edit: DocEdit::Add {
                tags: vec!["inbox".to_string()],
            },
            scope: TagSource::Header,
        };
        let out = transform_document(doc, &edit).unwrap().unwrap();
        assert_eq!(out, "---\ntags: [inbox]\n---\nJust a body.\n");
        validate_transform(doc, &out, &edit).unwrap();
    }

    #[test]
    fn add_appends_entry_to_existing_header() {
        let doc = "---\ntitle: Note\n---\nBody.\n";
        let edit = ScopedEdit {
            edit: DocEdit::Add {
                tags: vec!["inbox".to_string()],
            },
            scope: TagSource::Header,
        };
        let out = transform_document(doc, &edit).unwrap().unwrap();
        assert_eq!(out, "---\ntitle: Note\ntags: [inbox]\n---\nBody.\n");
    }

    #[test]
    fn validation_catches_incomplete_renames() {
        let unchanged = "---\ntags: [work]\n---\n";
        assert!(validate_transform(unchanged, unchanged, &rename("work", "projects")).is_err());
        let done = "---\ntags: [projects]\n---\n";
        validate_transform(unchanged, done, &rename("work", "projects")).unwrap();
    }

    #[test]
    fn malformed_header_still_gets_inline_rewrite() {
        let doc = "---\ntags: [unclosed\n---\nBody with #work marker.\n";
        let edit = rename("work", "projects");
        let out = transform_document(doc, &edit).unwrap().unwrap();
        assert_eq!(out, "---\ntags: [unclosed\n---\nBody with #projects marker.\n");
        // The header was malformed before the edit; that is an extraction error,
        // not a transform failure.
        validate_transform(doc, &out, &edit).unwrap();
    }

    #[test]
    fn custom_indent_is_kept() {
        let doc = "---\ntags:\n    - work\n---\n";
        let out = transform_document(doc, &rename("work", "projects"))
            .unwrap()
            .unwrap();
        assert_eq!(out, "---\ntags:\n    - projects\n---\n");
    }

    #[test]
    fn counts_atomic_changes() {
        let doc = "---\ntags: [work]\n---\n#work and #work again\n";
        assert_eq!(count_tag_changes(doc, &rename("work", "projects")), 3);
    }
}
