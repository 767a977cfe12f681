//! Rendering of extraction results for stdout.

use std::fmt;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde_json::json;

use crate::models::{ArtifactRecord, Category, ExtractionScope};

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// One tab-separated row per record
    #[default]
    Tsv,
    /// A single JSON document with host details and counts
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Tsv => write!(f, "tsv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

pub type CategoryResults = [(Category, Vec<ArtifactRecord>)];

const TSV_HEADER: &str = "category\tsource\tname\tvalue\ttimestamp";

/// Tabs and line breaks would split a row, so they are escaped.
fn tsv_field(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
        .replace('\n', "\\n")
}

// Windows paths are common in values, so backslashes are only escaped when
// the field also contains a control character.
fn tsv_cell(text: &str) -> String {
    if text.contains(|c: char| matches!(c, '\t' | '\r' | '\n')) {
        tsv_field(text)
    } else {
        text.to_string()
    }
}

pub fn render_tsv(results: &CategoryResults) -> String {
    let mut out = String::from(TSV_HEADER);
    out.push('\n');

    for (category, records) in results {
        for record in records {
            let timestamp = record.timestamp.map(|t| t.to_rfc3339()).unwrap_or_default();
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\n",
                category,
                tsv_cell(&record.source),
                tsv_cell(&record.name),
                tsv_cell(&record.value.to_string()),
                timestamp
            ));
        }
    }

    out
}

/// JSON report: host, run parameters, per-category counts and the records.
pub fn render_json(
    results: &CategoryResults,
    scope: &ExtractionScope,
    hostname: &str,
    collected_at: DateTime<Utc>,
) -> Result<String> {
    let counts: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|(category, records)| (category.to_string(), json!(records.len())))
        .collect();

    let categories: serde_json::Map<String, serde_json::Value> = results
        .iter()
        .map(|(category, records)| Ok((category.to_string(), serde_json::to_value(records)?)))
        .collect::<Result<_, serde_json::Error>>()
        .context("Failed to serialize artifact records")?;

    let report = json!({
        "hostname": hostname,
        "collection_time": collected_at.to_rfc3339(),
        "extractor_version": env!("CARGO_PKG_VERSION"),
        "user_sid": scope.user.sid,
        "window": {
            "min": scope.window.min.to_rfc3339(),
            "max": scope.window.max.to_rfc3339(),
        },
        "counts": counts,
        "artifacts": categories,
    });

    serde_json::to_string_pretty(&report).context("Failed to serialize extraction report to JSON")
}

/// Host name of the machine running the extraction.
pub fn local_hostname() -> String {
    hostname::get()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}
