//! The Tagweave operation engine.
//!
//! Applies a reviewed operations file back into the vault with strict safety
//! guarantees:
//!
//! - preview by default (no filesystem mutation without the execute flag),
//! - read → transform → validate → commit per document, never batched writes,
//! - backup-then-write-then-verify, with restore on post-write failure,
//! - per-document failures never abort the batch,
//! - every touched document gets before/after content hashes in the run record.
//!
//! A partially completed run is safe to restart: reapplying a rename to a
//! document that no longer carries the source tag is a no-op.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use thiserror::Error;

use tagweave_analyze::{CandidateOperation, OperationKind, OperationsFileV1};
use tagweave_vault::DocumentRef;

pub mod backup;
pub mod log;
pub mod transform;

pub use backup::BackupStore;
pub use log::{
    append_run_record, content_hash, read_run_records, ModificationRecordV1, RunRecordV1,
    RunStatsV1, MODIFICATION_LOG_VERSION_V1,
};
pub use transform::{
    count_tag_changes, transform_document, validate_transform, DocEdit, ScopedEdit,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("integrity mismatch for {path}: expected {expected}, found {actual}")]
    Integrity {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("io error for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl EngineError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Options for one engine run.
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Write changes to disk. Off by default: preview mode records intended
    /// changes without touching the vault.
    pub execute: bool,
    /// Where pre-write backup copies go. Defaults to
    /// `<root>/.tagweave/backups/<run-id>` (hidden, so discovery skips it).
    pub backup_dir: Option<PathBuf>,
    /// Optional integrity pins: rel path → expected sha256 of the document's
    /// pre-run content. A mismatch refuses the operation for that document.
    pub expected_hashes: BTreeMap<String, String>,
}

/// Expand one operation into its atomic per-document edits.
fn scoped_edits(op: &CandidateOperation) -> Vec<ScopedEdit> {
    match op.operation {
        OperationKind::Rename | OperationKind::Merge => op
            .source
            .iter()
            .map(|from| ScopedEdit {
                edit: DocEdit::Rename {
                    from: from.clone(),
                    to: op.target.clone(),
                },
                scope: op.scope,
            })
            .collect(),
        OperationKind::Delete => op
            .source
            .iter()
            .map(|tag| ScopedEdit {
                edit: DocEdit::Remove { tag: tag.clone() },
                scope: op.scope,
            })
            .collect(),
        OperationKind::AddTags => vec![ScopedEdit {
            edit: DocEdit::Add {
                tags: op.source.clone(),
            },
            scope: op.scope,
        }],
    }
}

/// Apply an operations file over the discovered documents.
///
/// Returns the run record in both modes; persisting it to the modification log is
/// the caller's choice (execute-mode runs should always be logged).
pub fn apply_operations(
    root: &Path,
    documents: &[DocumentRef],
    file: &OperationsFileV1,
    options: &EngineOptions,
) -> Result<RunRecordV1, EngineError> {
    let run_id = uuid::Uuid::new_v4().to_string();
    let mode = if options.execute { "execute" } else { "preview" };

    let backup = if options.execute {
        let dir = options
            .backup_dir
            .clone()
            .unwrap_or_else(|| root.join(".tagweave").join("backups").join(&run_id));
        Some(BackupStore::create(dir)?)
    } else {
        None
    };

    let mut changes: BTreeMap<String, ModificationRecordV1> = BTreeMap::new();
    let mut errors: Vec<String> = Vec::new();
    let mut processed: BTreeSet<String> = BTreeSet::new();
    let mut tags_modified = 0usize;
    // Preview mode simulates the whole batch in memory so a later operation sees
    // an earlier one's output, exactly as execute mode sees it on disk.
    let mut overlay: BTreeMap<String, String> = BTreeMap::new();

    for op in file.operations.iter().filter(|o| o.enabled) {
        for edit in scoped_edits(op) {
            let targets: Vec<&DocumentRef> = match op.operation {
                OperationKind::AddTags => {
                    let found: Vec<&DocumentRef> = documents
                        .iter()
                        .filter(|d| d.rel_path == op.target)
                        .collect();
                    if found.is_empty() {
                        errors.push(format!(
                            "{}: add_tags target document not found",
                            op.target
                        ));
                    }
                    found
                }
                _ => documents.iter().collect(),
            };

            for doc in targets {
                processed.insert(doc.rel_path.clone());

                // Read fresh for every operation; stale content must never be
                // transformed.
                let content = if options.execute {
                    match std::fs::read_to_string(&doc.abs_path) {
                        Ok(c) => c,
                        Err(e) => {
                            errors.push(format!("{}: {e}", doc.rel_path));
                            continue;
                        }
                    }
                } else {
                    match overlay.get(&doc.rel_path) {
                        Some(c) => c.clone(),
                        None => match std::fs::read_to_string(&doc.abs_path) {
                            Ok(c) => c,
                            Err(e) => {
                                errors.push(format!("{}: {e}", doc.rel_path));
                                continue;
                            }
                        },
                    }
                };

                // Integrity pins apply to the document's pre-run state only.
                if !changes.contains_key(&doc.rel_path) {
                    if let Some(expected) = options.expected_hashes.get(&doc.rel_path) {
                        let actual = content_hash(&content);
                        if *expected != actual {
                            tracing::warn!(
                                path = %doc.rel_path,
                                "integrity mismatch, refusing operation for this document"
                            );
                            errors.push(
                                EngineError::Integrity {
                                    path: doc.rel_path.clone(),
                                    expected: expected.clone(),
                                    actual,
                                }
                                .to_string(),
                            );
                            continue;
                        }
                    }
                }

                let transformed = match transform_document(&content, &edit) {
                    Ok(Some(t)) => t,
                    Ok(None) => continue,
                    Err(e) => {
                        errors.push(format!("{}: {e}", doc.rel_path));
                        continue;
                    }
                };
                if let Err(e) = validate_transform(&content, &transformed, &edit) {
                    errors.push(format!("{}: {e}", doc.rel_path));
                    continue;
                }

                let before = content_hash(&content);
                let after = content_hash(&transformed);
                let edit_count = count_tag_changes(&content, &edit);

                if let Some(store) = &backup {
                    if let Err(e) = store.save(&doc.rel_path, &content) {
                        errors.push(format!("{}: {e}", doc.rel_path));
                        continue;
                    }
                    if let Err(e) = std::fs::write(&doc.abs_path, &transformed) {
                        errors.push(format!("{}: {e}", doc.rel_path));
                        let _ = store.restore(&doc.rel_path, &doc.abs_path);
                        continue;
                    }
                    // Post-write verification: what landed on disk must be what
                    // was validated in memory.
                    let verified = std::fs::read_to_string(&doc.abs_path)
                        .ok()
                        .map(|written| {
                            content_hash(&written) == after
                                && validate_transform(&content, &written, &edit).is_ok()
                        })
                        .unwrap_or(false);
                    if !verified {
                        let _ = store.restore(&doc.rel_path, &doc.abs_path);
                        errors.push(format!(
                            "{}: post-write validation failed, backup restored",
                            doc.rel_path
                        ));
                        continue;
                    }
                } else {
                    overlay.insert(doc.rel_path.clone(), transformed);
                }

                tags_modified += edit_count;
                changes
                    .entry(doc.rel_path.clone())
                    .and_modify(|record| {
                        record.after_hash = after.clone();
                        record.edits.push(edit.edit.to_string());
                    })
                    .or_insert_with(|| ModificationRecordV1 {
                        path: doc.rel_path.clone(),
                        before_hash: before,
                        after_hash: after.clone(),
                        edits: vec![edit.edit.to_string()],
                    });
            }
        }
    }

    let stats = RunStatsV1 {
        files_processed: processed.len(),
        files_modified: changes.len(),
        tags_modified,
        errors: errors.len(),
    };
    tracing::info!(
        mode,
        files_processed = stats.files_processed,
        files_modified = stats.files_modified,
        tags_modified = stats.tags_modified,
        errors = stats.errors,
        "engine run finished"
    );

    Ok(RunRecordV1 {
        version: MODIFICATION_LOG_VERSION_V1,
        run_id,
        started_at: chrono::Utc::now().to_rfc3339(),
        mode: mode.to_string(),
        operations: file.operations.clone(),
        changes: changes.into_values().collect(),
        errors,
        stats,
    })
}
