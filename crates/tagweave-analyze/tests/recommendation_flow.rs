//! Full recommendation flow over a synthetic vault index.

use tagweave_analyze::{consolidate, AnalyzeConfig, OperationKind};
use tagweave_vault::{extract_document, IndexBuilder, TagIndex};

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
fn typo_singleton_and_plural_variants_are_both_proposed() {
    let index = index_with(&[
        ("machine-learning", 50),
        ("mchine-learning", 1),
        ("family", 45),
        ("families", 3),
        ("kubernetes", 8),
    ]);

    let file = consolidate(&index, &AnalyzeConfig::default());

    let typo = file
        .operations
        .iter()
        .find(|o| o.source == vec!["mchine-learning".to_string()])
        .expect("typo singleton merge");
    assert_eq!(typo.target, "machine-learning");
    assert_eq!(typo.operation, OperationKind::Merge);
    assert!(typo.metadata.confidence >= 0.90);

    let plural = file
        .operations
        .iter()
        .find(|o| o.source == vec!["families".to_string()])
        .expect("plural variant merge");
    assert_eq!(plural.target, "family");

    // Every operation is justified and attributed; only co-occurrence hints
    // arrive disabled.
    for op in &file.operations {
        assert!(
            op.enabled
                || op.metadata.source_analyzer == tagweave_analyze::cooccur::ANALYZER_NAME
        );
        assert!(!op.reason.is_empty());
        assert!(!op.metadata.source_analyzer.is_empty());
        assert!((0.0..=1.0).contains(&op.metadata.confidence));
    }
}

#[test]
fn analyzers_leave_the_index_untouched() {
    let index = index_with(&[("family", 45), ("families", 3)]);
    let before = index.clone();
    let _ = consolidate(&index, &AnalyzeConfig::default());
    assert_eq!(index, before);
}
