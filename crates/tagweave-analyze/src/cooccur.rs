//! Pair co-occurrence counting, cluster detection and hub ranking.
//!
//! Builds the document → tag-set view, counts unordered tag-pair co-occurrences,
//! finds connected components over "strong" pairs, and ranks tags by total
//! co-occurrence weight. The report feeds the `stats` command; the analyzer itself
//! only proposes merges for tags that *always* travel together.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tagweave_vault::TagIndex;

use crate::{connected_components, AnalyzeConfig, CandidateOperation, OperationKind};

pub const ANALYZER_NAME: &str = "cooccurrence";
pub const COOCCURRENCE_REPORT_VERSION_V1: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairCountV1 {
    pub a: String,
    pub b: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubScoreV1 {
    pub tag: String,
    /// Sum of co-occurrence counts over every pair this tag is part of.
    pub weight: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CooccurrenceReportV1 {
    pub version: u32,
    pub generated_at: String,
    /// Pairs at or above `min_pair_count`, heaviest first.
    pub pairs: Vec<PairCountV1>,
    /// Connected components over pairs at or above `strong_pair_count`.
    pub clusters: Vec<Vec<String>>,
    /// Tags by total co-occurrence weight, heaviest first.
    pub hubs: Vec<HubScoreV1>,
}

/// Count unordered tag-pair co-occurrences across all documents.
pub fn pair_counts(index: &TagIndex) -> BTreeMap<(String, String), usize> {
    let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();
    for (_, tags) in index.documents() {
        let tags: Vec<&str> = tags.into_iter().collect();
        for i in 0..tags.len() {
            for j in (i + 1)..tags.len() {
                // BTreeSet iteration is sorted, so (a, b) is already ordered.
                let key = (tags[i].to_string(), tags[j].to_string());
                *counts.entry(key).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Build the full co-occurrence report for an index.
pub fn cooccurrence_report(index: &TagIndex, config: &AnalyzeConfig) -> CooccurrenceReportV1 {
    let counts = pair_counts(index);

    let mut pairs: Vec<PairCountV1> = counts
        .iter()
        .filter(|(_, &count)| count >= config.min_pair_count)
        .map(|((a, b), &count)| PairCountV1 {
            a: a.clone(),
            b: b.clone(),
            count,
        })
        .collect();
    pairs.sort_by(|x, y| {
        y.count
            .cmp(&x.count)
            .then_with(|| x.a.cmp(&y.a))
            .then_with(|| x.b.cmp(&y.b))
    });

    let mut hub_weights: BTreeMap<&str, usize> = BTreeMap::new();
    for ((a, b), count) in &counts {
        *hub_weights.entry(a.as_str()).or_insert(0) += count;
        *hub_weights.entry(b.as_str()).or_insert(0) += count;
    }
    let mut hubs: Vec<HubScoreV1> = hub_weights
        .into_iter()
        .map(|(tag, weight)| HubScoreV1 {
            tag: tag.to_string(),
            weight,
        })
        .collect();
    hubs.sort_by(|x, y| y.weight.cmp(&x.weight).then_with(|| x.tag.cmp(&y.tag)));

    let nodes: BTreeSet<String> = index.iter().map(|(t, _)| t.clone()).collect();
    let edges: BTreeSet<(String, String)> = counts
        .iter()
        .filter(|(_, &count)| count >= config.strong_pair_count)
        .map(|((a, b), _)| (a.clone(), b.clone()))
        .collect();
    let clusters = connected_components(&nodes, &edges)
        .into_iter()
        .filter(|c| c.len() > 1)
        .collect();

    CooccurrenceReportV1 {
        version: COOCCURRENCE_REPORT_VERSION_V1,
        generated_at: chrono::Utc::now().to_rfc3339(),
        pairs,
        clusters,
        hubs,
    }
}

/// Analyzer entry point.
///
/// Co-occurring tags are usually distinct vocabulary, so nothing here is applied
/// unreviewed: pairs where the rarer tag *never* appears alone are surfaced as
/// disabled hints a human can opt into; everything else stays in the report.
pub fn analyze(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    let mut out = Vec::new();

    for ((a, b), count) in pair_counts(index) {
        if count < config.strong_pair_count {
            continue;
        }
        let count_a = index.get(&a).map(|e| e.count).unwrap_or(0);
        let count_b = index.get(&b).map(|e| e.count).unwrap_or(0);
        let (rare, rare_count, common, common_count) = if count_a <= count_b {
            (a, count_a, b, count_b)
        } else {
            (b, count_b, a, count_a)
        };
        if count != rare_count || common_count <= rare_count {
            continue;
        }
        let mut op = CandidateOperation::new(
            OperationKind::Merge,
            vec![rare.clone()],
            common.clone(),
            format!(
                "`{rare}` never appears without `{common}` ({count} shared documents); \
                 enable to fold them"
            ),
            0.55,
            ANALYZER_NAME,
        );
        op.enabled = false;
        out.push(op);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagweave_vault::{extract_document, IndexBuilder};

    fn index_of(docs: &[(&str, &str)]) -> TagIndex {
        let mut builder = IndexBuilder::new();
        for (path, tags) in docs {
            let doc = format!("---\ntags: [{tags}]\n---\n");
            builder.add_document(path, &extract_document(&doc));
        }
        builder.build()
    }

    #[test]
    fn two_document_scenario_counts_pairs_and_hubs() {
        let index = index_of(&[("a.md", "work, notes"), ("b.md", "work, draft")]);
        let config = AnalyzeConfig {
            min_pair_count: 1,
            ..Default::default()
        };
        let report = cooccurrence_report(&index, &config);

        let mut pairs: Vec<(String, String, usize)> = report
            .pairs
            .iter()
            .map(|p| (p.a.clone(), p.b.clone(), p.count))
            .collect();
        pairs.sort();
        assert_eq!(
            pairs,
            vec![
                ("draft".to_string(), "work".to_string(), 1),
                ("notes".to_string(), "work".to_string(), 1),
            ]
        );

        assert_eq!(report.hubs[0].tag, "work");
        assert_eq!(report.hubs[0].weight, 2);
    }

    #[test]
    fn strong_pairs_form_clusters() {
        let docs: Vec<(String, String)> = (0..4)
            .map(|i| (format!("p{i}.md"), "rust, async".to_string()))
            .chain((0..4).map(|i| (format!("q{i}.md"), "cooking, recipes".to_string())))
            .collect();
        let refs: Vec<(&str, &str)> = docs.iter().map(|(p, t)| (p.as_str(), t.as_str())).collect();
        let index = index_of(&refs);

        let report = cooccurrence_report(&index, &AnalyzeConfig::default());
        assert_eq!(report.clusters.len(), 2);
        assert!(report.clusters.contains(&vec![
            "async".to_string(),
            "rust".to_string()
        ]));
    }

    #[test]
    fn always_together_pairs_become_disabled_hints() {
        // `scrum` appears 3 times, always with `agile`; `agile` also stands alone.
        let index = index_of(&[
            ("a.md", "agile, scrum"),
            ("b.md", "agile, scrum"),
            ("c.md", "agile, scrum"),
            ("d.md", "agile"),
        ]);
        let ops = analyze(&index, &AnalyzeConfig::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].source, vec!["scrum".to_string()]);
        assert_eq!(ops[0].target, "agile");
        // Informational only: never applied without a human enabling it.
        assert!(!ops[0].enabled);
    }
}
