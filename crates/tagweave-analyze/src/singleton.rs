//! Singleton reduction: fold one-use tags into established vocabulary.
//!
//! Restricted to tags used exactly once. Each singleton is matched against tags at
//! or above the frequent-usage threshold by normalized edit similarity (typos) and
//! by n-gram embedding cosine (conceptual matches). Merges are strictly
//! singleton → frequent, never the reverse: noise must not corrupt established
//! vocabulary.

use tagweave_vault::TagIndex;

use crate::semantic::{cosine, tag_vectors};
use crate::{AnalyzeConfig, CandidateOperation, OperationKind};

pub const ANALYZER_NAME: &str = "singleton_reduction";

/// Classic dynamic-programming Levenshtein distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Edit similarity normalized to [0, 1]: 1.0 is identical.
pub fn edit_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Analyzer entry point.
pub fn analyze(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    let singletons: Vec<&String> = index
        .iter()
        .filter(|(_, e)| e.count == 1)
        .map(|(t, _)| t)
        .collect();
    let frequent: Vec<&String> = index
        .iter()
        .filter(|(_, e)| e.count >= config.frequent_threshold)
        .map(|(t, _)| t)
        .collect();
    if singletons.is_empty() || frequent.is_empty() {
        return Vec::new();
    }

    let vectors = tag_vectors(index);

    let mut out = Vec::new();
    for singleton in singletons {
        // Best match wins; typo similarity outranks conceptual similarity.
        let mut best: Option<(f64, &String, &str)> = None;
        for target in &frequent {
            let edit = edit_similarity(singleton, target);
            if edit >= config.singleton_edit_similarity {
                let score = edit;
                if best.map(|(s, _, _)| score > s).unwrap_or(true) {
                    best = Some((score, *target, "typo"));
                }
                continue;
            }
            let sem = cosine(&vectors[singleton.as_str()], &vectors[target.as_str()]);
            if sem >= config.singleton_semantic_similarity {
                // Concept matches rank below any typo match.
                let score = sem * 0.9;
                if best.map(|(s, _, _)| score > s).unwrap_or(true) {
                    best = Some((score, *target, "concept"));
                }
            }
        }

        if let Some((score, target, kind)) = best {
            let reason = match kind {
                "typo" => format!(
                    "singleton `{singleton}` is an apparent misspelling of `{target}`"
                ),
                _ => format!(
                    "singleton `{singleton}` is conceptually close to frequent `{target}`"
                ),
            };
            out.push(CandidateOperation::new(
                OperationKind::Merge,
                vec![singleton.clone()],
                target.clone(),
                reason,
                score,
                ANALYZER_NAME,
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tagweave_vault::{extract_document, IndexBuilder};

    fn index_with(tags: &[(&str, usize)]) -> TagIndex {
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
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn typo_singleton_merges_into_frequent_tag() {
        let index = index_with(&[("machine-learning", 50), ("mchine-learning", 1)]);
        let ops = analyze(&index, &AnalyzeConfig::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].source, vec!["mchine-learning".to_string()]);
        assert_eq!(ops[0].target, "machine-learning");
        assert!(ops[0].metadata.confidence >= 0.90);
    }

    #[test]
    fn direction_is_always_singleton_to_frequent() {
        let index = index_with(&[("projects", 20), ("projct", 1), ("garden", 1)]);
        let config = AnalyzeConfig::default();
        for op in analyze(&index, &config) {
            for source in &op.source {
                assert_eq!(index.get(source).unwrap().count, 1);
            }
            assert!(index.get(&op.target).unwrap().count >= config.frequent_threshold);
        }
    }

    #[test]
    fn below_frequency_threshold_is_not_a_target() {
        // `notes` is used 3 times: similar, but not established enough.
        let index = index_with(&[("notes", 3), ("ntes", 1)]);
        assert!(analyze(&index, &AnalyzeConfig::default()).is_empty());
    }

    #[test]
    fn unrelated_singletons_stay() {
        let index = index_with(&[("kubernetes", 12), ("gardening", 1)]);
        assert!(analyze(&index, &AnalyzeConfig::default()).is_empty());
    }
}
