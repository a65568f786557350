//! Tagweave CLI
//!
//! Command-line interface for the vault tag pipeline:
//! - `scan`: extract the tag vocabulary and export it (JSON/CSV/text)
//! - `analyze`: propose consolidation operations into a reviewable JSON file
//! - `apply`: apply a reviewed operations file (preview by default)
//! - `stats`: co-occurrence pairs, hub tags, and cluster report

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use tagweave_analyze::{consolidate, cooccurrence_report, OperationsFileV1};
use tagweave_engine::{append_run_record, apply_operations, EngineOptions, RunRecordV1};
use tagweave_vault::{
    discover_documents, extract_document, read_document, DiscoveryOptions, DocumentRef,
    IndexBuilder, TagExportV1, TagIndex,
};

mod config;

use config::TagweaveConfig;

#[derive(Parser)]
#[command(name = "tagweave")]
#[command(author, version, about = "Markdown vault tag extraction and consolidation")]
struct Cli {
    /// Path to a tagweave.json configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the tag vocabulary from a vault and export it.
    Scan {
        /// Vault root directory.
        root: PathBuf,
        /// Export format: json | csv | text.
        #[arg(long, default_value = "text")]
        format: String,
        /// Write the export here instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Run the analyzers and write a reviewable operations file.
    Analyze {
        /// Vault root directory.
        root: PathBuf,
        /// Output operations JSON.
        #[arg(short, long, default_value = "tagweave-operations.json")]
        out: PathBuf,
    },

    /// Apply a reviewed operations file. Preview by default: pass --execute to
    /// actually write changes.
    Apply {
        /// Vault root directory.
        root: PathBuf,
        /// Operations JSON produced by `analyze` (possibly hand-edited).
        #[arg(long)]
        operations: PathBuf,
        /// Write changes to disk instead of previewing.
        #[arg(long)]
        execute: bool,
        /// Backup directory (default: `<root>/.tagweave/backups/<run-id>`).
        #[arg(long)]
        backup_dir: Option<PathBuf>,
        /// Modification log (default: `<root>/.tagweave/modifications.jsonl`).
        #[arg(long)]
        log: Option<PathBuf>,
    },

    /// Print the co-occurrence report: pair counts, hub tags, clusters.
    Stats {
        /// Vault root directory.
        root: PathBuf,
        /// Emit the report as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = TagweaveConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scan { root, format, out } => scan(&root, &config, &format, out.as_deref()),
        Commands::Analyze { root, out } => analyze(&root, &config, &out),
        Commands::Apply {
            root,
            operations,
            execute,
            backup_dir,
            log,
        } => apply(&root, &config, &operations, execute, backup_dir, log),
        Commands::Stats { root, json } => stats(&root, &config, json),
    }
}

/// Discover, read, and extract every document under `root`.
fn build_index(
    root: &std::path::Path,
    options: &DiscoveryOptions,
) -> Result<(Vec<DocumentRef>, TagIndex)> {
    let documents = discover_documents(root, options)
        .with_context(|| format!("discovering documents under {}", root.display()))?;

    let mut builder = IndexBuilder::new();
    for doc in &documents {
        let text = match read_document(doc) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable document");
                continue;
            }
        };
        builder.add_document(&doc.rel_path, &extract_document(&text));
    }
    Ok((documents, builder.build()))
}

fn scan(
    root: &std::path::Path,
    config: &TagweaveConfig,
    format: &str,
    out: Option<&std::path::Path>,
) -> Result<()> {
    let (_, index) = build_index(root, &config.discovery.to_options())?;
    let export = TagExportV1::from_index(&index);
    let rendered = export.render(format)?;

    match out {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            eprintln!(
                "{} {}",
                "wrote".green().bold(),
                path.display().to_string().bold()
            );
        }
        None => print!("{rendered}"),
    }

    eprintln!(
        "{} {} tags across {} documents, {} parse errors",
        "ok".green().bold(),
        index.len(),
        index.document_count(),
        index.errors().len()
    );
    for err in index.errors() {
        eprintln!("{} {}: {}", "warn".yellow().bold(), err.path, err.message);
    }
    Ok(())
}

fn analyze(root: &std::path::Path, config: &TagweaveConfig, out: &std::path::Path) -> Result<()> {
    let (_, index) = build_index(root, &config.discovery.to_options())?;
    let file = consolidate(&index, &config.analyze);

    std::fs::write(out, file.to_json()?).with_context(|| format!("writing {}", out.display()))?;

    eprintln!(
        "{} {} operations proposed from {} tags",
        "ok".green().bold(),
        file.operations.len(),
        index.len()
    );
    for op in &file.operations {
        eprintln!(
            "  {:12} {} -> {}  ({:.2}, {})",
            format!("{:?}", op.operation).to_lowercase(),
            op.source.join(", "),
            op.target,
            op.metadata.confidence,
            op.metadata.source_analyzer
        );
    }
    eprintln!(
        "{} review {} and run `tagweave apply`",
        "next".cyan().bold(),
        out.display().to_string().bold()
    );
    Ok(())
}

fn apply(
    root: &std::path::Path,
    config: &TagweaveConfig,
    operations: &std::path::Path,
    execute: bool,
    backup_dir: Option<PathBuf>,
    log: Option<PathBuf>,
) -> Result<()> {
    let text = std::fs::read_to_string(operations)
        .with_context(|| format!("reading {}", operations.display()))?;
    let file = OperationsFileV1::from_json(&text)?;

    let documents = discover_documents(root, &config.discovery.to_options())
        .with_context(|| format!("discovering documents under {}", root.display()))?;

    let options = EngineOptions {
        execute,
        backup_dir,
        ..Default::default()
    };
    let record = apply_operations(root, &documents, &file, &options)?;

    if execute {
        let log_path = log.unwrap_or_else(|| root.join(".tagweave").join("modifications.jsonl"));
        append_run_record(&log_path, &record)?;
    }
    print_run_summary(&record);
    Ok(())
}

fn print_run_summary(record: &RunRecordV1) {
    let label = if record.mode == "execute" {
        "applied".green().bold()
    } else {
        "preview".cyan().bold()
    };
    eprintln!(
        "{} run {}: {} files processed, {} modified, {} tag changes",
        label,
        record.run_id,
        record.stats.files_processed,
        record.stats.files_modified,
        record.stats.tags_modified
    );
    for change in &record.changes {
        eprintln!("  {} ({})", change.path, change.edits.join("; "));
    }
    for err in &record.errors {
        eprintln!("{} {}", "warn".yellow().bold(), err);
    }
    if record.mode == "preview" && record.stats.files_modified > 0 {
        eprintln!(
            "{} no files were written; rerun with --execute to apply",
            "note".cyan().bold()
        );
    }
}

fn stats(root: &std::path::Path, config: &TagweaveConfig, json: bool) -> Result<()> {
    let (_, index) = build_index(root, &config.discovery.to_options())?;
    let report = cooccurrence_report(&index, &config.analyze);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("{}", "Pairs".bold());
    for pair in &report.pairs {
        println!("  {} + {}  {}", pair.a, pair.b, pair.count);
    }
    println!("{}", "Hubs".bold());
    for hub in &report.hubs {
        println!("  {}  {}", hub.tag, hub.weight);
    }
    println!("{}", "Clusters".bold());
    for cluster in &report.clusters {
        println!("  {}", cluster.join(", "));
    }
    Ok(())
}
