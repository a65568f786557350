//! Configuration file loading.
//!
//! One JSON file covers both halves of the pipeline: discovery (which documents)
//! and analysis (which thresholds). Every field has a default, so a missing or
//! partial file is fine; an invalid value aborts the run before anything touches
//! the vault.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use tagweave_analyze::AnalyzeConfig;
use tagweave_vault::DiscoveryOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_hidden: bool,
    pub max_file_bytes: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        let options = DiscoveryOptions::default();
        Self {
            include: options.include,
            exclude: options.exclude,
            include_hidden: options.include_hidden,
            max_file_bytes: options.max_file_bytes,
        }
    }
}

impl DiscoveryConfig {
    pub fn to_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            include: self.include.clone(),
            exclude: self.exclude.clone(),
            include_hidden: self.include_hidden,
            max_file_bytes: self.max_file_bytes,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TagweaveConfig {
    pub discovery: DiscoveryConfig,
    pub analyze: AnalyzeConfig,
}

impl TagweaveConfig {
    /// Load from `path`, or defaults when no path is given. Validation failures
    /// abort here, before any document is read.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                serde_json::from_str::<Self>(&text)
                    .with_context(|| format!("parsing config {}", path.display()))?
            }
            None => Self::default(),
        };
        config
            .analyze
            .validate()
            .context("invalid analysis configuration")?;
        Ok(config)
    }
}
