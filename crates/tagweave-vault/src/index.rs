//! The vault-wide extraction index.
//!
//! Folds per-document extractions into one immutable mapping
//! `tag → {usage count, containing documents, source kind}`. The fold is
//! commutative: documents may be added in any order and the built index is
//! identical (BTree storage, per-document deduplication, errors sorted at build).

use std::collections::{BTreeMap, BTreeSet};

use crate::{DocumentExtraction, TagSource};

/// Index entry for one tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEntry {
    /// Usage count: one per containing document. Always equals `files.len()`.
    pub count: usize,
    /// Relative paths of the documents the tag appears in.
    pub files: BTreeSet<String>,
    /// Header-only, inline-only, or both across the whole vault.
    pub source: TagSource,
}

/// A parse error scoped to one document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentError {
    pub path: String,
    pub message: String,
}

/// Immutable vault-wide tag index. Built once, shared read-only by analyzers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagIndex {
    tags: BTreeMap<String, TagEntry>,
    errors: Vec<DocumentError>,
    documents: BTreeSet<String>,
}

impl TagIndex {
    pub fn get(&self, tag: &str) -> Option<&TagEntry> {
        self.tags.get(tag)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagEntry)> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Documents that contributed to the index (parse failures included).
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Per-document parse errors, sorted by path.
    pub fn errors(&self) -> &[DocumentError] {
        &self.errors
    }

    /// Inverted view: document → set of tags it carries.
    pub fn documents(&self) -> BTreeMap<&str, BTreeSet<&str>> {
        let mut out: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for (tag, entry) in &self.tags {
            for file in &entry.files {
                out.entry(file.as_str()).or_default().insert(tag.as_str());
            }
        }
        out
    }
}

/// Accumulates per-document extractions into a [`TagIndex`].
#[derive(Debug, Default)]
pub struct IndexBuilder {
    tags: BTreeMap<String, TagEntry>,
    errors: Vec<DocumentError>,
    documents: BTreeSet<String>,
}

impl IndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one document's extraction into the index.
    ///
    /// A tag counts once per containing document regardless of how many times it
    /// occurs inside it; raw occurrence counts only matter to the rewrite engine.
    /// Errors are tracked separately so one document's failure never drops tags
    /// extracted from the others.
    pub fn add_document(&mut self, rel_path: &str, extraction: &DocumentExtraction) {
        self.documents.insert(rel_path.to_string());

        for (tag, source) in extraction.distinct_tags() {
            let entry = self.tags.entry(tag).or_insert_with(|| TagEntry {
                count: 0,
                files: BTreeSet::new(),
                source,
            });
            if entry.files.insert(rel_path.to_string()) {
                entry.count = entry.files.len();
            }
            entry.source = entry.source.widen(source);
        }

        for message in &extraction.errors {
            self.errors.push(DocumentError {
                path: rel_path.to_string(),
                message: message.clone(),
            });
        }
    }

    pub fn build(mut self) -> TagIndex {
        self.errors.sort();
        TagIndex {
            tags: self.tags,
            errors: self.errors,
            documents: self.documents,
        }
    }
}
