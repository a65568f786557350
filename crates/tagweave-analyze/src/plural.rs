//! Plural/singular variant grouping.
//!
//! For each tag we generate the set of its plausible singular and plural forms via
//! an irregular-form table plus suffix rules, applied compound-aware to the last
//! hyphen- or slash-separated component. Tags whose form sets intersect belong to
//! one variant group; the canonical form is chosen by policy.

use std::collections::{BTreeMap, BTreeSet};

use tagweave_vault::TagIndex;

use crate::{
    connected_components, most_used, AnalyzeConfig, CandidateOperation, OperationKind,
    PluralPolicy,
};

pub const ANALYZER_NAME: &str = "plural_variants";

const IRREGULAR: &[(&str, &str)] = &[
    ("child", "children"),
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("life", "lives"),
    ("leaf", "leaves"),
    ("knife", "knives"),
    ("wolf", "wolves"),
    ("half", "halves"),
    ("shelf", "shelves"),
    ("analysis", "analyses"),
    ("thesis", "theses"),
    ("crisis", "crises"),
    ("criterion", "criteria"),
    ("phenomenon", "phenomena"),
    ("datum", "data"),
    ("medium", "media"),
    ("index", "indices"),
    ("matrix", "matrices"),
    ("axis", "axes"),
];

/// Plausible singular readings of `word`.
fn singular_forms(word: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for (singular, plural) in IRREGULAR {
        if word == *plural {
            out.insert((*singular).to_string());
        }
    }
    if let Some(stem) = word.strip_suffix("ies") {
        if !stem.is_empty() {
            out.insert(format!("{stem}y"));
        }
    }
    if let Some(stem) = word.strip_suffix("ves") {
        if !stem.is_empty() {
            out.insert(format!("{stem}f"));
            out.insert(format!("{stem}fe"));
        }
    }
    if let Some(stem) = word.strip_suffix("es") {
        if stem.len() >= 2 {
            out.insert(stem.to_string());
        }
    }
    if let Some(stem) = word.strip_suffix('s') {
        if stem.len() >= 2 && !word.ends_with("ss") {
            out.insert(stem.to_string());
        }
    }
    out
}

/// Plausible plural readings of `word`.
fn plural_forms(word: &str) -> BTreeSet<String> {
    let mut out = BTreeSet::new();
    for (singular, plural) in IRREGULAR {
        if word == *singular {
            out.insert((*plural).to_string());
        }
    }
    if word.len() < 2 {
        return out;
    }
    if let Some(stem) = word.strip_suffix('y') {
        if !stem.ends_with(|c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')) {
            out.insert(format!("{stem}ies"));
        } else {
            out.insert(format!("{word}s"));
        }
    } else if word.ends_with('s')
        || word.ends_with('x')
        || word.ends_with('z')
        || word.ends_with("ch")
        || word.ends_with("sh")
    {
        out.insert(format!("{word}es"));
    } else if let Some(stem) = word.strip_suffix("fe") {
        out.insert(format!("{stem}ves"));
    } else if let Some(stem) = word.strip_suffix('f') {
        out.insert(format!("{stem}ves"));
    } else {
        out.insert(format!("{word}s"));
    }
    out
}

/// Split a compound tag into its invariant prefix and the component the
/// plural rules apply to.
fn split_compound(tag: &str) -> (&str, &str) {
    match tag.rfind(['-', '/']) {
        Some(i) => (&tag[..=i], &tag[i + 1..]),
        None => ("", tag),
    }
}

/// All forms `tag` could stand for, the tag itself included.
pub fn variant_forms(tag: &str) -> BTreeSet<String> {
    let (prefix, last) = split_compound(tag);
    let mut out = BTreeSet::new();
    out.insert(tag.to_string());
    for form in singular_forms(last).into_iter().chain(plural_forms(last)) {
        out.insert(format!("{prefix}{form}"));
    }
    out
}

/// `tag` reads as a plural of some other member of `group`.
fn is_plural_of_member(tag: &str, group: &[String]) -> bool {
    group
        .iter()
        .filter(|other| other.as_str() != tag)
        .any(|other| variant_plural_set(other).contains(tag))
}

fn variant_plural_set(tag: &str) -> BTreeSet<String> {
    let (prefix, last) = split_compound(tag);
    plural_forms(last)
        .into_iter()
        .map(|f| format!("{prefix}{f}"))
        .collect()
}

/// Group tags into variant groups. Symmetric: membership does not depend on
/// which tag the grouping starts from.
pub fn variant_groups(index: &TagIndex) -> Vec<Vec<String>> {
    let mut by_form: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut nodes: BTreeSet<String> = BTreeSet::new();
    for (tag, _) in index.iter() {
        nodes.insert(tag.clone());
        for form in variant_forms(tag) {
            by_form.entry(form).or_default().insert(tag.clone());
        }
    }

    let mut edges: BTreeSet<(String, String)> = BTreeSet::new();
    for tags in by_form.values() {
        let tags: Vec<&String> = tags.iter().collect();
        for i in 0..tags.len() {
            for j in (i + 1)..tags.len() {
                edges.insert((tags[i].clone(), tags[j].clone()));
            }
        }
    }

    connected_components(&nodes, &edges)
        .into_iter()
        .filter(|g| g.len() > 1)
        .collect()
}

fn choose_canonical(index: &TagIndex, group: &[String], policy: PluralPolicy) -> Option<String> {
    match policy {
        PluralPolicy::MostUsed { .. } => most_used(index, group.iter().map(|s| s.as_str())),
        PluralPolicy::AlwaysPlural => {
            let plurals: Vec<&str> = group
                .iter()
                .filter(|t| is_plural_of_member(t, group))
                .map(|s| s.as_str())
                .collect();
            if plurals.is_empty() {
                most_used(index, group.iter().map(|s| s.as_str()))
            } else {
                most_used(index, plurals.into_iter())
            }
        }
        PluralPolicy::AlwaysSingular => {
            let singulars: Vec<&str> = group
                .iter()
                .filter(|t| !is_plural_of_member(t, group))
                .map(|s| s.as_str())
                .collect();
            if singulars.is_empty() {
                most_used(index, group.iter().map(|s| s.as_str()))
            } else {
                most_used(index, singulars.into_iter())
            }
        }
    }
}

/// Analyzer entry point: propose merging variant groups into their canonical form.
pub fn analyze(index: &TagIndex, config: &AnalyzeConfig) -> Vec<CandidateOperation> {
    let mut out = Vec::new();

    for group in variant_groups(index) {
        let Some(canonical) = choose_canonical(index, &group, config.plural_policy) else {
            continue;
        };
        let canonical_count = index.get(&canonical).map(|e| e.count).unwrap_or(0);

        for member in &group {
            if *member == canonical {
                continue;
            }
            let member_count = index.get(member).map(|e| e.count).unwrap_or(0);

            if let PluralPolicy::MostUsed { min_ratio } = config.plural_policy {
                // Usage must clearly dominate; near-ties are left to a human.
                if (canonical_count as f64) < min_ratio * (member_count as f64) {
                    continue;
                }
            }

            out.push(CandidateOperation::new(
                OperationKind::Merge,
                vec![member.clone()],
                canonical.clone(),
                format!(
                    "`{member}` ({member_count} uses) is a singular/plural variant of \
                     `{canonical}` ({canonical_count} uses)"
                ),
                0.85,
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
    fn suffix_rules_cover_common_shapes() {
        assert!(variant_forms("families").contains("family"));
        assert!(variant_forms("family").contains("families"));
        assert!(variant_forms("boxes").contains("box"));
        assert!(variant_forms("wolves").contains("wolf"));
        assert!(variant_forms("children").contains("child"));
    }

    #[test]
    fn compound_rules_touch_only_the_last_component() {
        assert!(variant_forms("meeting-notes").contains("meeting-note"));
        assert!(variant_forms("area/projects").contains("area/project"));
        assert!(!variant_forms("meeting-notes").contains("meetings-notes"));
    }

    #[test]
    fn grouping_is_symmetric() {
        let index = index_with(&[("family", 2), ("families", 1), ("unrelated", 1)]);
        let groups = variant_groups(&index);
        let with_a: Vec<_> = groups
            .iter()
            .filter(|g| g.contains(&"family".to_string()))
            .collect();
        let with_b: Vec<_> = groups
            .iter()
            .filter(|g| g.contains(&"families".to_string()))
            .collect();
        assert_eq!(with_a, with_b);
        assert_eq!(with_a.len(), 1);
    }

    #[test]
    fn usage_policy_with_ratio_merges_families_into_family() {
        let index = index_with(&[("family", 45), ("families", 3)]);
        let ops = analyze(&index, &AnalyzeConfig::default());
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].source, vec!["families".to_string()]);
        assert_eq!(ops[0].target, "family");
        assert_eq!(ops[0].operation, OperationKind::Merge);
    }

    #[test]
    fn usage_policy_skips_near_ties() {
        let index = index_with(&[("note", 3), ("notes", 2)]);
        let ops = analyze(&index, &AnalyzeConfig::default());
        assert!(ops.is_empty(), "3 vs 2 is below the 2.0 ratio");
    }

    #[test]
    fn always_singular_picks_the_singular_form() {
        let index = index_with(&[("family", 1), ("families", 40)]);
        let config = AnalyzeConfig {
            plural_policy: PluralPolicy::AlwaysSingular,
            ..Default::default()
        };
        let ops = analyze(&index, &config);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].target, "family");
    }

    #[test]
    fn always_plural_picks_the_plural_form() {
        let index = index_with(&[("wolf", 9), ("wolves", 1)]);
        let config = AnalyzeConfig {
            plural_policy: PluralPolicy::AlwaysPlural,
            ..Default::default()
        };
        let ops = analyze(&index, &config);
        assert_eq!(ops.len(), 1);
        assert_eq!(ops[0].target, "wolves");
    }
}
