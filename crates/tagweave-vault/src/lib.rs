//! Vault ingestion for Tagweave.
//!
//! Extracts tag vocabulary from a markdown vault:
//! - YAML front matter (`tags:` / `tag:` keys, sequence or scalar form)
//! - inline `#tag` markers in body text (code regions excluded)
//!
//! Output:
//! - per-document extractions with byte spans suitable for formatting-preserving
//!   rewrites (consumed by `tagweave-engine`),
//! - a vault-wide [`TagIndex`] shared read-only by every analyzer,
//! - a versioned tag export (`TagExportV1`) for JSON/CSV/text reports.
//!
//! Parsing here is deliberately regex/string based: a malformed document degrades to
//! a per-document error, never a failed run.

use serde::{Deserialize, Serialize};

pub mod discovery;
pub mod error;
pub mod export;
pub mod frontmatter;
pub mod index;
pub mod inline;
pub mod normalize;

pub use discovery::{discover_documents, read_document, DiscoveryOptions, DocumentRef};
pub use error::VaultError;
pub use export::{TagExportRecordV1, TagExportV1};
pub use frontmatter::{parse_front_matter, FrontMatter, HeaderStyle};
pub use index::{IndexBuilder, TagEntry, TagIndex};
pub use inline::{scan_inline_tags, InlineOccurrence};
pub use normalize::normalize_tag;

/// Where a tag was declared within a document (or across the vault).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagSource {
    Header,
    Inline,
    Both,
}

impl TagSource {
    /// Combine two sightings of the same tag.
    pub fn widen(self, other: TagSource) -> TagSource {
        if self == other {
            self
        } else {
            TagSource::Both
        }
    }
}

impl std::fmt::Display for TagSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TagSource::Header => f.write_str("header"),
            TagSource::Inline => f.write_str("inline"),
            TagSource::Both => f.write_str("both"),
        }
    }
}

/// Everything extracted from one document in a single pass.
///
/// `header` is `None` when the document has no front matter block *or* when the
/// block failed to parse; the distinction is carried in `errors`.
#[derive(Debug, Clone, Default)]
pub struct DocumentExtraction {
    /// Parsed front matter, including the byte spans needed for rewrites.
    pub header: Option<FrontMatter>,
    /// Normalized header tags, in declaration order.
    pub header_tags: Vec<String>,
    /// Inline occurrences with byte spans, in document order.
    pub inline: Vec<InlineOccurrence>,
    /// Per-document parse errors (front matter only; inline scanning cannot fail).
    pub errors: Vec<String>,
}

impl DocumentExtraction {
    /// Distinct normalized tags with their source kind, one entry per tag.
    pub fn distinct_tags(&self) -> Vec<(String, TagSource)> {
        let mut out: std::collections::BTreeMap<String, TagSource> =
            std::collections::BTreeMap::new();
        for tag in &self.header_tags {
            out.entry(tag.clone())
                .and_modify(|s| *s = s.widen(TagSource::Header))
                .or_insert(TagSource::Header);
        }
        for occ in &self.inline {
            out.entry(occ.tag.clone())
                .and_modify(|s| *s = s.widen(TagSource::Inline))
                .or_insert(TagSource::Inline);
        }
        out.into_iter().collect()
    }
}

/// Extract header and inline tags from one document's raw text.
///
/// Never fails: a malformed front matter block is recorded as a per-document error
/// and the body is still scanned for inline tags.
pub fn extract_document(text: &str) -> DocumentExtraction {
    let mut extraction = DocumentExtraction::default();

    let body_start = match parse_front_matter(text) {
        Ok(Some(header)) => {
            let body_start = header.block_span.1;
            extraction.header_tags = header
                .raw_tags
                .iter()
                .filter_map(|raw| normalize_tag(raw))
                .collect();
            extraction.header = Some(header);
            body_start
        }
        Ok(None) => 0,
        Err(err) => {
            // Skip the delimited region so its contents are not re-scanned as body.
            let skip = frontmatter::block_span_lenient(text).map(|s| s.1).unwrap_or(0);
            extraction.errors.push(err.to_string());
            skip
        }
    };

    extraction.inline = scan_inline_tags(text, body_start);
    extraction
}
