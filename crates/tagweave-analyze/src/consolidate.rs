//! Recommendation consolidation.
//!
//! Runs the analyzers in a fixed priority order, merges their candidate lists,
//! deduplicates operations touching the same tag, drops anything referencing an
//! excluded tag, and emits the surviving operations as one ordered, reviewable
//! file. Provenance and confidence are retained on every operation for audit.
//!
//! Dedup rule (made explicit here): highest confidence wins; on equal confidence
//! the higher-priority analyzer wins; on equal priority the lexicographically
//! smaller target wins.

use std::collections::BTreeSet;

use tagweave_vault::TagIndex;

use crate::{
    cooccur, plural, semantic, singleton, synonym, AnalyzeConfig, Analyzer, CandidateOperation,
    OperationKind, OperationsFileV1,
};

/// The built-in analyzers, highest priority first.
const ANALYZERS: [Analyzer; 5] = [
    synonym::analyze,
    semantic::analyze,
    plural::analyze,
    singleton::analyze,
    cooccur::analyze,
];

pub const USER_ANALYZER_NAME: &str = "user_mapping";

/// Lower rank = higher priority. Order per the consolidation design: user-defined
/// mappings, context synonyms, character-pattern merges, plural variants,
/// singleton reduction, then co-occurrence hints.
fn analyzer_rank(name: &str) -> usize {
    match name {
        USER_ANALYZER_NAME => 0,
        synonym::ANALYZER_NAME => 1,
        semantic::ANALYZER_NAME | semantic::FALLBACK_ANALYZER_NAME => 2,
        plural::ANALYZER_NAME => 3,
        singleton::ANALYZER_NAME => 4,
        cooccur::ANALYZER_NAME => 5,
        _ => 6,
    }
}

fn user_mapping_ops(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    config
        .user_mappings
        .iter()
        .filter(|(source, _)| index.get(source).is_some())
        .map(|(source, target)| {
            CandidateOperation::new(
                OperationKind::Rename,
                vec![source.clone()],
                target.clone(),
                format!("user-defined mapping `{source}` -> `{target}`"),
                1.0,
                USER_ANALYZER_NAME,
            )
        })
        .collect()
}

/// Deduplicate candidates touching the same tags, keeping the best per tag.
pub fn dedup_operations(mut ops: Vec<CandidateOperation>) -> Vec<CandidateOperation> {
    ops.sort_by(|a, b| {
        b.metadata
            .confidence
            .partial_cmp(&a.metadata.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                analyzer_rank(&a.metadata.source_analyzer)
                    .cmp(&analyzer_rank(&b.metadata.source_analyzer))
            })
            .then_with(|| a.target.cmp(&b.target))
            .then_with(|| a.source.cmp(&b.source))
    });

    let mut claimed: BTreeSet<String> = BTreeSet::new();
    let mut kept = Vec::new();
    for op in ops {
        let touched: Vec<String> = op.touched_tags().iter().map(|t| t.to_string()).collect();
        if touched.iter().any(|t| claimed.contains(t)) {
            tracing::debug!(
                analyzer = %op.metadata.source_analyzer,
                target = %op.target,
                "dropping candidate: tag already claimed by a better operation"
            );
            continue;
        }
        // Disabled hints inform the reviewer; they never claim a tag away from an
        // operation that will actually run.
        if op.enabled {
            claimed.extend(touched);
        }
        kept.push(op);
    }
    kept
}

/// Run every analyzer over the index and consolidate the results.
pub fn consolidate(index: &TagIndex, config: &AnalyzeConfig) -> OperationsFileV1 {
    let mut candidates = user_mapping_ops(index, config);
    for analyzer in ANALYZERS {
        candidates.extend(analyzer(index, config));
    }

    tracing::info!(candidates = candidates.len(), "analyzers finished");

    // Exclusion rules and degenerate candidates.
    candidates.retain(|op| {
        if op.source.iter().any(|s| s == &op.target) {
            return false;
        }
        let excluded = op
            .touched_tags()
            .iter()
            .any(|t| config.excluded_tags.contains(*t));
        if excluded {
            tracing::debug!(target = %op.target, "dropping candidate: excluded tag");
        }
        !excluded
    });

    let mut kept = dedup_operations(candidates);

    // Execution order: priority first, strongest first within a priority band.
    kept.sort_by(|a, b| {
        analyzer_rank(&a.metadata.source_analyzer)
            .cmp(&analyzer_rank(&b.metadata.source_analyzer))
            .then_with(|| {
                b.metadata
                    .confidence
                    .partial_cmp(&a.metadata.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.target.cmp(&b.target))
    });

    OperationsFileV1::new(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagweave_vault::{extract_document, IndexBuilder};

    fn op(analyzer: &str, source: &str, target: &str, confidence: f64) -> CandidateOperation {
        CandidateOperation::new(
            OperationKind::Merge,
            vec![source.to_string()],
            target,
            "test",
            confidence,
            analyzer,
        )
    }

    fn index_with(tags: &[(&str, usize)]) -> tagweave_vault::TagIndex {
        let mut builder = IndexBuilder::new();
        for (tag, count) in tags {
            for i in 0..*count {
                let doc = format!("---\ntags: [{tag}]\n---\n");
                builder.add_document(&format!("{tag}-{i}.md"), &extract_document(&doc));
            }
        }
        builder.build()
    }

    #[test]
    fn higher_confidence_wins() {
        let kept = dedup_operations(vec![
            op(plural::ANALYZER_NAME, "notes", "note", 0.85),
            op(singleton::ANALYZER_NAME, "notes", "noted", 0.95),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target, "noted");
    }

    #[test]
    fn equal_confidence_falls_back_to_analyzer_priority() {
        let kept = dedup_operations(vec![
            op(plural::ANALYZER_NAME, "notes", "note", 0.8),
            op(synonym::ANALYZER_NAME, "notes", "journal", 0.8),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].metadata.source_analyzer, synonym::ANALYZER_NAME);
    }

    #[test]
    fn equal_priority_prefers_smaller_target() {
        let kept = dedup_operations(vec![
            op(plural::ANALYZER_NAME, "notes", "zettel", 0.8),
            op(plural::ANALYZER_NAME, "notes", "note", 0.8),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].target, "note");
    }

    #[test]
    fn disabled_hints_do_not_claim_tags() {
        let mut hint = op(cooccur::ANALYZER_NAME, "notes", "agile", 0.9);
        hint.enabled = false;
        let kept = dedup_operations(vec![
            hint,
            op(plural::ANALYZER_NAME, "notes", "note", 0.85),
        ]);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().any(|o| o.enabled && o.target == "note"));
    }

    #[test]
    fn excluded_tags_are_never_touched() {
        let index = index_with(&[("family", 45), ("families", 3)]);
        let config = AnalyzeConfig {
            excluded_tags: ["families".to_string()].into_iter().collect(),
            ..Default::default()
        };
        let file = consolidate(&index, &config);
        assert!(file
            .operations
            .iter()
            .all(|op| !op.touched_tags().contains("families")));
    }

    #[test]
    fn user_mappings_rank_first() {
        let index = index_with(&[("family", 45), ("families", 3)]);
        let mut config = AnalyzeConfig::default();
        config
            .user_mappings
            .insert("families".to_string(), "household".to_string());

        let file = consolidate(&index, &config);
        assert_eq!(file.operations[0].metadata.source_analyzer, USER_ANALYZER_NAME);
        assert_eq!(file.operations[0].target, "household");
        // The plural merge for the same tag was deduplicated away.
        assert_eq!(
            file.operations
                .iter()
                .filter(|o| o.source.contains(&"families".to_string()))
                .count(),
            1
        );
    }

    #[test]
    fn operations_file_round_trips_through_json() {
        let index = index_with(&[("family", 45), ("families", 3)]);
        let file = consolidate(&index, &AnalyzeConfig::default());
        assert!(!file.operations.is_empty());

        let json = file.to_json().unwrap();
        let back = OperationsFileV1::from_json(&json).unwrap();
        assert_eq!(back.operations.len(), file.operations.len());
        assert_eq!(back.operations[0].target, file.operations[0].target);
    }
}
