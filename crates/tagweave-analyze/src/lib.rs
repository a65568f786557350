//! Tag similarity analysis and consolidation recommendations.
//!
//! Every analyzer is a stateless pure function over the immutable
//! [`TagIndex`](tagweave_vault::TagIndex):
//!
//! ```text
//! fn(&TagIndex, &AnalyzeConfig) -> Vec<CandidateOperation>
//! ```
//!
//! The consolidator composes them in a fixed priority order, deduplicates
//! conflicting candidates, applies exclusion rules, and emits an ordered,
//! human-editable operations file. Nothing here mutates the vault; the analyzers
//! *propose*, a human reviews, and `tagweave-engine` applies.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tagweave_vault::{TagIndex, TagSource};

pub mod config;
pub mod consolidate;
pub mod cooccur;
pub mod plural;
pub mod semantic;
pub mod singleton;
pub mod synonym;

pub use config::{AnalyzeConfig, ConfigError, PluralPolicy};
pub use consolidate::consolidate;
pub use cooccur::{cooccurrence_report, CooccurrenceReportV1};

pub const OPERATIONS_FILE_VERSION_V1: u32 = 1;

/// What an operation does to its source tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    /// Rewrite every occurrence of the single source tag to the target tag.
    Rename,
    /// Fold one or more source tags into the target tag.
    Merge,
    /// Remove every occurrence of the source tags.
    Delete,
    /// Add the source tags to the target document.
    AddTags,
}

/// Audit metadata carried by every operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetadataV1 {
    /// Analyzer confidence in [0, 1].
    pub confidence: f64,
    /// Which analyzer produced this candidate.
    pub source_analyzer: String,
}

/// One candidate operation, from analysis through review to application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateOperation {
    pub operation: OperationKind,
    /// Source tags (a single element for renames).
    pub source: Vec<String>,
    /// Target tag, or target document path for `add_tags`.
    pub target: String,
    /// Human-readable justification.
    pub reason: String,
    /// Disabled operations survive in the file for audit but are never applied.
    pub enabled: bool,
    /// Which tag kind the operation touches: header tags, inline tags, or both.
    #[serde(default = "default_scope")]
    pub scope: TagSource,
    pub metadata: OperationMetadataV1,
}

fn default_scope() -> TagSource {
    TagSource::Both
}

impl CandidateOperation {
    pub fn new(
        operation: OperationKind,
        source: Vec<String>,
        target: impl Into<String>,
        reason: impl Into<String>,
        confidence: f64,
        analyzer: &str,
    ) -> Self {
        Self {
            operation,
            source,
            target: target.into(),
            reason: reason.into(),
            enabled: true,
            scope: TagSource::Both,
            metadata: OperationMetadataV1 {
                confidence: confidence.clamp(0.0, 1.0),
                source_analyzer: analyzer.to_string(),
            },
        }
    }

    /// Tags this operation touches (used for deduplication and exclusion).
    pub fn touched_tags(&self) -> BTreeSet<&str> {
        let mut out: BTreeSet<&str> = self.source.iter().map(|s| s.as_str()).collect();
        if self.operation != OperationKind::AddTags {
            out.insert(self.target.as_str());
        }
        out
    }
}

/// The ordered, reviewable operations file. Order is execution order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationsFileV1 {
    pub version: u32,
    pub generated_at: String,
    pub operations: Vec<CandidateOperation>,
}

impl OperationsFileV1 {
    pub fn new(operations: Vec<CandidateOperation>) -> Self {
        Self {
            version: OPERATIONS_FILE_VERSION_V1,
            generated_at: chrono::Utc::now().to_rfc3339(),
            operations,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let file: Self = serde_json::from_str(json)?;
        if file.version != OPERATIONS_FILE_VERSION_V1 {
            anyhow::bail!(
                "unsupported operations file version: {} (expected {OPERATIONS_FILE_VERSION_V1})",
                file.version
            );
        }
        Ok(file)
    }
}

/// Shared analyzer signature (strategy-by-function, not inheritance).
pub type Analyzer = fn(&TagIndex, &AnalyzeConfig) -> Vec<CandidateOperation>;

/// Pick the most-used tag from a group, name as tie-break.
pub(crate) fn most_used<'a>(index: &TagIndex, tags: impl Iterator<Item = &'a str>) -> Option<String> {
    tags.map(|t| (index.get(t).map(|e| e.count).unwrap_or(0), t))
        .max_by(|a, b| a.0.cmp(&b.0).then_with(|| b.1.cmp(a.1)))
        .map(|(_, t)| t.to_string())
}

/// Deterministic grouping over an undirected pair graph (iterative DFS).
pub(crate) fn connected_components(
    nodes: &BTreeSet<String>,
    edges: &BTreeSet<(String, String)>,
) -> Vec<Vec<String>> {
    let mut adjacency: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (a, b) in edges {
        adjacency.entry(a).or_default().insert(b);
        adjacency.entry(b).or_default().insert(a);
    }

    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();
    for node in nodes {
        if seen.contains(node.as_str()) {
            continue;
        }
        let mut component = Vec::new();
        let mut stack = vec![node.as_str()];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            component.push(current.to_string());
            if let Some(neighbors) = adjacency.get(current) {
                stack.extend(neighbors.iter().copied());
            }
        }
        component.sort();
        components.push(component);
    }
    components
}
