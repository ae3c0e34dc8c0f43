//! Human-readable rendering of command results.

use std::fmt::Write as _;

use {
    mmrag_common::Error,
    mmrag_vector::{
        SearchResult, import::ImportReport, manager::CollectionResults, schema::SchemaReport,
    },
};

const TEXT_PREVIEW_CHARS: usize = 100;

/// First 100 characters of `text`, with an ellipsis when cut.
pub fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TEXT_PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "  (no results)\n".into();
    }
    let mut out = String::new();
    for (i, hit) in results.iter().enumerate() {
        let _ = writeln!(out, "  [{}] id: {}", i + 1, hit.id);
        if let Some(distance) = hit.distance {
            let _ = writeln!(out, "      distance: {distance:.4}");
        }
        if let Some(text) = &hit.properties.text {
            let _ = writeln!(out, "      text: {}", preview(text));
        }
        if let Some(metadata) = &hit.properties.metadata {
            let rendered = hit
                .properties
                .metadata_json()
                .and_then(|v| serde_json::to_string_pretty(&v).ok())
                .unwrap_or_else(|| metadata.clone());
            let _ = writeln!(out, "      metadata: {}", rendered.replace('\n', "\n      "));
        }
        if let Some(image) = &hit.properties.image {
            let _ = writeln!(out, "      image: <base64, {} chars>", image.len());
        }
    }
    out
}

pub fn render_comparison(compared: &[CollectionResults]) -> String {
    let mut out = String::new();
    for entry in compared {
        let _ = writeln!(out, "== {} ==", entry.collection);
        if entry.exists {
            out.push_str(&render_results(&entry.results));
        } else {
            out.push_str("  (collection does not exist)\n");
        }
    }
    out
}

pub fn render_schema(report: &SchemaReport) -> String {
    let mut out = String::new();
    for outcome in &report.outcomes {
        let _ = match &outcome.result {
            Ok(true) => writeln!(out, "created   {}", outcome.name),
            Ok(false) => writeln!(out, "exists    {}", outcome.name),
            Err(e) => writeln!(out, "failed    {}: {}", outcome.name, describe(e)),
        };
    }
    out
}

pub fn render_import(collection: &str, report: &ImportReport) -> String {
    format!(
        "{collection}: imported {}, skipped {}, degraded {}",
        report.imported, report.skipped, report.degraded
    )
}

/// Error message followed by its remediation hint, if any.
pub fn describe(error: &Error) -> String {
    match error.hint() {
        Some(hint) => format!("{error} (hint: {hint})"),
        None => error.to_string(),
    }
}
