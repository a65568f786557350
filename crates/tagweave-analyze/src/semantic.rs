//! Character-pattern semantic merge detection.
//!
//! Each tag becomes a sparse vector over overlapping character n-grams (length 2–4,
//! word-boundary aware), weighted by in-tag frequency and vocabulary-wide rarity.
//! Tags with cosine similarity above the threshold are grouped for merging.
//!
//! When vectors are unavailable (forced by config, or the vocabulary is too small
//! for rarity weights to mean anything) a dependency-free suffix-stripping stem
//! fallback is used instead, at reduced confidence.

use std::collections::{BTreeMap, BTreeSet};

use tagweave_vault::TagIndex;

use crate::{
    connected_components, most_used, AnalyzeConfig, CandidateOperation, OperationKind,
};

pub const ANALYZER_NAME: &str = "semantic_merge";
pub const FALLBACK_ANALYZER_NAME: &str = "semantic_merge_stem";

/// Unit-length sparse vector: n-gram → weight.
pub type SparseVector = BTreeMap<String, f64>;

/// N-gram counts for one tag, with `^`/`$` word boundary markers.
fn ngram_counts(tag: &str) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for word in tag.split(['-', '_', '/']).filter(|w| !w.is_empty()) {
        let padded: Vec<char> = std::iter::once('^')
            .chain(word.chars())
            .chain(std::iter::once('$'))
            .collect();
        for n in 2..=4usize {
            if padded.len() < n {
                continue;
            }
            for window in padded.windows(n) {
                *counts.entry(window.iter().collect()).or_insert(0) += 1;
            }
        }
    }
    counts
}

/// Build unit-length tf-idf vectors for every tag in the index.
pub fn tag_vectors(index: &TagIndex) -> BTreeMap<String, SparseVector> {
    let counts: BTreeMap<String, BTreeMap<String, usize>> = index
        .iter()
        .map(|(tag, _)| (tag.clone(), ngram_counts(tag)))
        .collect();

    // Document frequency of each n-gram across the vocabulary.
    let mut df: BTreeMap<&str, usize> = BTreeMap::new();
    for grams in counts.values() {
        for gram in grams.keys() {
            *df.entry(gram.as_str()).or_insert(0) += 1;
        }
    }
    let total = counts.len().max(1) as f64;

    let mut out = BTreeMap::new();
    for (tag, grams) in &counts {
        let mut vector: SparseVector = grams
            .iter()
            .map(|(gram, &tf)| {
                let rarity = 1.0 + (total / df[gram.as_str()] as f64).ln();
                (gram.clone(), tf as f64 * rarity)
            })
            .collect();
        let norm: f64 = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for w in vector.values_mut() {
                *w /= norm;
            }
        }
        out.insert(tag.clone(), vector);
    }
    out
}

/// Cosine similarity of two unit-length sparse vectors.
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(gram, wa)| large.get(gram).map(|wb| wa * wb))
        .sum()
}

/// Strip one derivational suffix from the last component of a tag.
fn stem(tag: &str) -> String {
    let (prefix, last) = match tag.rfind(['-', '/']) {
        Some(i) => (&tag[..=i], &tag[i + 1..]),
        None => ("", tag),
    };
    for suffix in ["tion", "ing", "ed", "er", "ly", "s"] {
        if let Some(stripped) = last.strip_suffix(suffix) {
            if stripped.len() >= 3 {
                return format!("{prefix}{stripped}");
            }
        }
    }
    tag.to_string()
}

fn analyze_vectors(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    let vectors = tag_vectors(index);
    let tags: Vec<&String> = vectors.keys().collect();

    let mut nodes: BTreeSet<String> = BTreeSet::new();
    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
    for i in 0..tags.len() {
        for j in (i + 1)..tags.len() {
            let sim = cosine(&vectors[tags[i]], &vectors[tags[j]]);
            if sim > config.semantic_threshold {
                nodes.insert(tags[i].clone());
                nodes.insert(tags[j].clone());
                edges.insert((tags[i].clone(), tags[j].clone()));
            }
        }
    }

    let mut out = Vec::new();
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
            let sim = cosine(&vectors[member], &vectors[&canonical])
                .max(config.semantic_threshold);
            out.push(CandidateOperation::new(
                OperationKind::Merge,
                vec![member.clone()],
                canonical.clone(),
                format!(
                    "`{member}` shares character patterns with `{canonical}` \
                     (cosine {sim:.2})"
                ),
                sim.min(0.95),
                ANALYZER_NAME,
            ));
        }
    }
    out
}

fn analyze_stems(index: &TagIndex) -> Vec<CandidateOperation> {
    let mut by_stem: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for (tag, _) in index.iter() {
        by_stem.entry(stem(tag)).or_default().insert(tag.clone());
    }

    let mut out = Vec::new();
    for (shared, group) in by_stem {
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
            out.push(CandidateOperation::new(
                OperationKind::Merge,
                vec![member.clone()],
                canonical.clone(),
                format!("`{member}` and `{canonical}` share the stem `{shared}`"),
                0.5,
                FALLBACK_ANALYZER_NAME,
            ));
        }
    }
    out
}

/// Analyzer entry point.
pub fn analyze(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    if config.semantic_fallback || index.len() < 3 {
        analyze_stems(index)
    } else {
        analyze_vectors(index, config)
    }
}
