//! Analysis configuration.
//!
//! Loaded once by the CLI and passed by value into every analyzer and the engine;
//! there is no ambient/global configuration state. Invalid values abort the run at
//! startup: every later decision depends on them.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// How the canonical form of a plural/singular variant group is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum PluralPolicy {
    /// Keep the most-used form, but only when it dominates by `min_ratio`.
    MostUsed { min_ratio: f64 },
    AlwaysPlural,
    AlwaysSingular,
}

impl Default for PluralPolicy {
    fn default() -> Self {
        PluralPolicy::MostUsed { min_ratio: 2.0 }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { field: &'static str, value: f64 },

    #[error("plural min_ratio must be >= 1.0, got {0}")]
    BadPluralRatio(f64),

    #[error("excluded tag entries must not be empty")]
    EmptyExclusion,

    // Field names avoid `source`, which thiserror reserves for the error cause.
    #[error("user mapping `{from}` -> `{to}` is trivial or empty")]
    BadUserMapping { from: String, to: String },
}

/// Immutable configuration for one analysis run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzeConfig {
    pub plural_policy: PluralPolicy,

    /// Pairs co-occurring fewer times than this are dropped from reports.
    pub min_pair_count: usize,
    /// Pairs at or above this count form cluster edges.
    pub strong_pair_count: usize,

    /// Cosine similarity threshold for the character-pattern merge detector.
    pub semantic_threshold: f64,
    /// Force the dependency-free stem fallback instead of n-gram vectors.
    pub semantic_fallback: bool,

    /// Jaccard threshold for context-synonym neighbor sets.
    pub synonym_jaccard: f64,
    /// Two tags are neighbors when they share at least this many documents.
    pub min_shared_docs: usize,

    /// Edit-similarity threshold for singleton typo detection.
    pub singleton_edit_similarity: f64,
    /// Embedding-cosine threshold for singleton concept matches.
    pub singleton_semantic_similarity: f64,
    /// A tag is "frequent" (an allowed singleton merge target) at this count.
    pub frequent_threshold: usize,

    /// Tags never touched by any proposed operation.
    pub excluded_tags: BTreeSet<String>,
    /// Human-curated renames, highest priority of all analyzers.
    pub user_mappings: BTreeMap<String, String>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            plural_policy: PluralPolicy::default(),
            min_pair_count: 2,
            strong_pair_count: 3,
            semantic_threshold: 0.6,
            semantic_fallback: false,
            synonym_jaccard: 0.70,
            min_shared_docs: 3,
            singleton_edit_similarity: 0.90,
            singleton_semantic_similarity: 0.70,
            frequent_threshold: 5,
            excluded_tags: BTreeSet::new(),
            user_mappings: BTreeMap::new(),
        }
    }
}

impl AnalyzeConfig {
    /// Validate once at startup; a configuration error fails the whole run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("semantic_threshold", self.semantic_threshold),
            ("synonym_jaccard", self.synonym_jaccard),
            ("singleton_edit_similarity", self.singleton_edit_similarity),
            (
                "singleton_semantic_similarity",
                self.singleton_semantic_similarity,
            ),
        ] {
            if !(0.0..=1.0).contains(&value) || value.is_nan() {
                return Err(ConfigError::ThresholdOutOfRange { field, value });
            }
        }
        if let PluralPolicy::MostUsed { min_ratio } = self.plural_policy {
            if !(min_ratio >= 1.0) {
                return Err(ConfigError::BadPluralRatio(min_ratio));
            }
        }
        if self.excluded_tags.iter().any(|t| t.trim().is_empty()) {
            return Err(ConfigError::EmptyExclusion);
        }
        for (source, target) in &self.user_mappings {
            if source.trim().is_empty() || target.trim().is_empty() || source == target {
                return Err(ConfigError::BadUserMapping {
                    from: source.clone(),
                    to: target.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AnalyzeConfig::default().validate().unwrap();
    }

    #[test]
    fn out_of_range_threshold_fails() {
        let config = AnalyzeConfig {
            synonym_jaccard: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn trivial_user_mapping_fails() {
        let mut config = AnalyzeConfig::default();
        config
            .user_mappings
            .insert("same".to_string(), "same".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("user mapping `same` -> `same`"));
    }

    #[test]
    fn nan_threshold_fails() {
        let config = AnalyzeConfig {
            semantic_threshold: f64::NAN,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
