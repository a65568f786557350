//! Tag export: the stable interchange view of the extraction index.

use serde::{Deserialize, Serialize};

use crate::{TagIndex, TagSource};

pub const TAG_EXPORT_VERSION_V1: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagExportRecordV1 {
    pub tag: String,
    pub usage_count: usize,
    pub files: Vec<String>,
    pub source: TagSource,
}

/// Versioned tag export file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagExportV1 {
    pub version: u32,
    pub generated_at: String,
    pub document_count: usize,
    pub error_count: usize,
    pub records: Vec<TagExportRecordV1>,
}

impl TagExportV1 {
    /// Snapshot the index, most-used tags first (ties broken by name).
    pub fn from_index(index: &TagIndex) -> Self {
        let mut records: Vec<TagExportRecordV1> = index
            .iter()
            .map(|(tag, entry)| TagExportRecordV1 {
                tag: tag.clone(),
                usage_count: entry.count,
                files: entry.files.iter().cloned().collect(),
                source: entry.source,
            })
            .collect();
        records.sort_by(|a, b| {
            b.usage_count
                .cmp(&a.usage_count)
                .then_with(|| a.tag.cmp(&b.tag))
        });

        Self {
            version: TAG_EXPORT_VERSION_V1,
            generated_at: chrono::Utc::now().to_rfc3339(),
            document_count: index.document_count(),
            error_count: index.errors().len(),
            records,
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_csv(&self) -> String {
        let mut out = String::from("tag,usage_count,source,files\n");
        for r in &self.records {
            out.push_str(&format!(
                "{},{},{},{}\n",
                csv_field(&r.tag),
                r.usage_count,
                r.source,
                csv_field(&r.files.join(";"))
            ));
        }
        out
    }

    pub fn to_text(&self) -> String {
        let mut out = format!(
            "{} tags across {} documents ({} parse errors)\n\n",
            self.records.len(),
            self.document_count,
            self.error_count
        );
        let width = self
            .records
            .iter()
            .map(|r| r.tag.len())
            .max()
            .unwrap_or(0)
            .max(3);
        for r in &self.records {
            out.push_str(&format!(
                "{:width$}  {:>5}  {}\n",
                r.tag,
                r.usage_count,
                r.source,
                width = width
            ));
        }
        out
    }

    /// Render in a named format (`json` | `csv` | `text`).
    pub fn render(&self, format: &str) -> anyhow::Result<String> {
        match format {
            "json" => self.to_json(),
            "csv" => Ok(self.to_csv()),
            "text" => Ok(self.to_text()),
            other => Err(anyhow::anyhow!("unknown export format: {other}")),
        }
    }
}

fn csv_field(s: &str) -> String {
    if s.contains(',') || s.contains('"') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}
