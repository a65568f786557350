//! Context-based synonym detection.
//!
//! Two tags used in the same *company* are likely synonyms even when they share no
//! characters: we compare their co-occurrence neighbor sets (tags sharing at least
//! `min_shared_docs` documents) with Jaccard similarity and close the pairwise
//! graph transitively. Acronym/expansion pairs are detected separately by matching
//! a short token against the first letters of a longer multi-word token.

use std::collections::{BTreeMap, BTreeSet};

use tagweave_vault::TagIndex;

use crate::cooccur::pair_counts;
use crate::{
    connected_components, most_used, AnalyzeConfig, CandidateOperation, OperationKind,
};

pub const ANALYZER_NAME: &str = "context_synonyms";

/// Co-occurrence neighbor sets: tag → tags sharing at least `min_shared_docs`
/// documents with it.
pub fn neighbor_sets(
    index: &TagIndex,
    min_shared_docs: usize,
) -> BTreeMap<String, BTreeSet<String>> {
    let mut neighbors: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for ((a, b), count) in pair_counts(index) {
        if count >= min_shared_docs {
            neighbors.entry(a.clone()).or_default().insert(b.clone());
            neighbors.entry(b).or_default().insert(a);
        }
    }
    neighbors
}

/// Jaccard similarity of two neighbor sets, ignoring the pair itself.
fn neighbor_jaccard(a: &str, b: &str, neighbors: &BTreeMap<String, BTreeSet<String>>) -> f64 {
    let empty = BTreeSet::new();
    let na = neighbors.get(a).unwrap_or(&empty);
    let nb = neighbors.get(b).unwrap_or(&empty);

    let filter = |set: &BTreeSet<String>| -> BTreeSet<String> {
        set.iter()
            .filter(|t| t.as_str() != a && t.as_str() != b)
            .cloned()
            .collect()
    };
    let na = filter(na);
    let nb = filter(nb);
    if na.is_empty() && nb.is_empty() {
        return 0.0;
    }
    let intersection = na.intersection(&nb).count() as f64;
    let union = na.union(&nb).count() as f64;
    intersection / union
}

/// First letters of a multi-word tag (`machine-learning` → `ml`).
fn initials(tag: &str) -> Option<String> {
    let words: Vec<&str> = tag.split(['-', '_', '/']).filter(|w| !w.is_empty()).collect();
    if words.len() < 2 {
        return None;
    }
    words
        .iter()
        .map(|w| w.chars().next())
        .collect::<Option<String>>()
}

fn is_acronym_shaped(tag: &str) -> bool {
    (2..=6).contains(&tag.chars().count()) && tag.chars().all(|c| c.is_ascii_alphabetic())
}

/// Analyzer entry point.
pub fn analyze(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    let mut out = Vec::new();

    let neighbors = neighbor_sets(index, config.min_shared_docs);
    let tags: Vec<&String> = neighbors.keys().collect();

    let mut sims: BTreeMap<(String, String), f64> = BTreeMap::new();
    let mut nodes: BTreeSet<String> = BTreeSet::new();
    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
    for i in 0..tags.len() {
        for j in (i + 1)..tags.len() {
            let sim = neighbor_jaccard(tags[i], tags[j], &neighbors);
            if sim >= config.synonym_jaccard {
                nodes.insert(tags[i].clone());
                nodes.insert(tags[j].clone());
                edges.insert((tags[i].clone(), tags[j].clone()));
                sims.insert((tags[i].clone(), tags[j].clone()), sim);
            }
        }
    }

    for group in connected_components(&nodes, &edges) {
        if group.len() < 2 {
            continue;
        }
        let Some(canonical) = most_used(index, group.iter().map(|s| s.as_str())) else {
            continue;
        };
        for member in &group {
            if *member == canonical {
                continue;
            }
            let key = if *member < canonical {
                (member.clone(), canonical.clone())
            } else {
                (canonical.clone(), member.clone())
            };
            // Transitively joined members may lack a direct edge; the threshold is
            // then the honest lower bound.
            let sim = sims.get(&key).copied().unwrap_or(config.synonym_jaccard);
            out.push(CandidateOperation::new(
                OperationKind::Merge,
                vec![member.clone()],
                canonical.clone(),
                format!(
                    "`{member}` and `{canonical}` appear in the same context \
                     (neighbor overlap {sim:.2})"
                ),
                sim.min(0.95),
                ANALYZER_NAME,
            ));
        }
    }

    // Acronym/expansion pairs.
    for (short, _) in index.iter().filter(|(t, _)| is_acronym_shaped(t)) {
        for (long, _) in index.iter() {
            if long == short {
                continue;
            }
            if initials(long).as_deref() == Some(short.as_str()) {
                let Some(canonical) = most_used(index, [short.as_str(), long.as_str()].into_iter())
                else {
                    continue;
                };
                let member = if canonical == *short { long } else { short };
                out.push(CandidateOperation::new(
                    OperationKind::Merge,
                    vec![member.clone()],
                    canonical.clone(),
                    format!("`{short}` is an acronym of `{long}`"),
                    0.8,
                    ANALYZER_NAME,
                ));
            }
        }
    }

    out
}
