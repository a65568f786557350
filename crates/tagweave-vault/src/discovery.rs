//! Document discovery: walk a vault root and enumerate candidate markdown files.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::VaultError;

/// Options controlling vault traversal.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Glob patterns a file must match (relative to the root).
    pub include: Vec<String>,
    /// Glob patterns that exclude a file even when included.
    pub exclude: Vec<String>,
    /// Also descend into hidden path segments (`.obsidian/`, `.trash/`…).
    pub include_hidden: bool,
    /// Maximum file size to read (bytes); larger files are skipped.
    pub max_file_bytes: u64,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            include: vec!["**/*.md".to_string()],
            exclude: Vec::new(),
            include_hidden: false,
            max_file_bytes: 4 * 1024 * 1024,
        }
    }
}

/// One discovered document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocumentRef {
    /// Stable identifier: path relative to the vault root, `/`-separated.
    pub rel_path: String,
    /// Absolute path for IO.
    pub abs_path: PathBuf,
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, VaultError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| VaultError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| VaultError::InvalidGlob {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

fn is_hidden_component(name: &str) -> bool {
    name.starts_with('.') && name != "." && name != ".."
}

/// Enumerate candidate documents under `root`, sorted by relative path.
pub fn discover_documents(
    root: &Path,
    options: &DiscoveryOptions,
) -> Result<Vec<DocumentRef>, VaultError> {
    let include = build_globset(&options.include)?;
    let exclude = build_globset(&options.exclude)?;

    let include_hidden = options.include_hidden;
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            include_hidden || !is_hidden_component(&entry.file_name().to_string_lossy())
        });

    let mut out = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        if metadata.len() > options.max_file_bytes {
            tracing::debug!(path = %entry.path().display(), "skipping oversized file");
            continue;
        }

        let rel = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let rel_path = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if !include.is_match(&rel_path) || exclude.is_match(&rel_path) {
            continue;
        }

        out.push(DocumentRef {
            rel_path,
            abs_path: entry.path().to_path_buf(),
        });
    }

    out.sort();
    Ok(out)
}

/// Read a discovered document's content.
pub fn read_document(doc: &DocumentRef) -> Result<String, VaultError> {
    std::fs::read_to_string(&doc.abs_path).map_err(|e| VaultError::Io {
        path: doc.rel_path.clone(),
        source: e,
    })
}
