//! The append-only modification log.
//!
//! One record per engine run, JSON-lines encoded, stored outside the vault.
//! Before/after content hashes are recorded for every touched document in both
//! modes; execute-mode runs persist the record so later runs can verify integrity
//! and audits can reconstruct what changed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::Path;

use tagweave_analyze::CandidateOperation;

use crate::EngineError;

pub const MODIFICATION_LOG_VERSION_V1: u32 = 1;

/// sha256 hex digest of document content.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// One document actually changed by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModificationRecordV1 {
    pub path: String,
    pub before_hash: String,
    pub after_hash: String,
    /// Atomic tag edits applied, in order.
    pub edits: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunStatsV1 {
    pub files_processed: usize,
    pub files_modified: usize,
    pub tags_modified: usize,
    pub errors: usize,
}

/// A full engine run: parameters, per-document changes, aggregate statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecordV1 {
    pub version: u32,
    pub run_id: String,
    pub started_at: String,
    /// `preview` or `execute`.
    pub mode: String,
    /// The operations this run was asked to apply (disabled ones included,
    /// flagged as such, for audit).
    pub operations: Vec<CandidateOperation>,
    pub changes: Vec<ModificationRecordV1>,
    /// Per-document errors, `path: message`.
    pub errors: Vec<String>,
    pub stats: RunStatsV1,
}

/// Append one run record to the JSON-lines log at `path`.
pub fn append_run_record(path: &Path, record: &RunRecordV1) -> Result<(), EngineError> {
    use std::io::Write;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EngineError::io(parent, e))?;
    }
    let line = serde_json::to_string(record)
        .map_err(|e| EngineError::Validation(format!("failed to encode run record: {e}")))?;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| EngineError::io(path, e))?;
    writeln!(file, "{line}").map_err(|e| EngineError::io(path, e))
}

/// Read every run record from a JSON-lines log.
pub fn read_run_records(path: &Path) -> Result<Vec<RunRecordV1>, EngineError> {
    let text = std::fs::read_to_string(path).map_err(|e| EngineError::io(path, e))?;
    let mut out = Vec::new();
    for line in text.lines().filter(|l| !l.trim().is_empty()) {
        let record: RunRecordV1 = serde_json::from_str(line)
            .map_err(|e| EngineError::Validation(format!("corrupt log line: {e}")))?;
        out.push(record);
    }
    Ok(out)
}
