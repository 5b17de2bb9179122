//! Rendering of per-mapping results.
//!
//! The text layout lists each mapping under a `## <name>` heading followed by
//! the upload and delete candidates, one tab-indented record per line. JSON
//! output carries the same data for scripting.

use colored::Colorize;
use humansize::{format_size, DECIMAL};
use serde::Serialize;
use std::fmt::Write as _;

use crate::inventory::FileRecord;
use crate::runner::{MappingOutcome, MappingReport};

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Render outcomes as plain text, optionally with terminal colors.
pub fn render_text(outcomes: &[MappingOutcome], styled: bool) -> String {
    let mut out = String::new();

    for outcome in outcomes {
        let heading = format!("## {}", outcome.name);
        let _ = writeln!(out, "{}", paint(&heading, styled, |s| s.bold().to_string()));

        match &outcome.result {
            Ok(report) => write_report(&mut out, report, styled),
            Err(e) => {
                let line = format!("error: {}", e);
                let _ = writeln!(out, "{}", paint(&line, styled, |s| s.red().to_string()));
            }
        }
    }

    out
}

fn write_report(out: &mut String, report: &MappingReport, styled: bool) {
    let result = &report.reconciliation;

    let _ = writeln!(out, "to be uploaded:");
    write_records(out, &result.to_upload, styled, |s| s.green().to_string());
    let _ = writeln!(out, "to be deleted :");
    write_records(out, &result.to_delete, styled, |s| s.yellow().to_string());

    let summary = format!(
        "{} to upload ({}), {} to delete; {} remote / {} local files",
        result.upload_count(),
        format_size(result.upload_bytes(), DECIMAL),
        result.delete_count(),
        report.remote_files,
        report.local_files,
    );
    let _ = writeln!(out, "{}", paint(&summary, styled, |s| s.dimmed().to_string()));
}

fn write_records(out: &mut String, records: &[FileRecord], styled: bool, style: fn(&str) -> String) {
    for record in records {
        let _ = writeln!(out, "\t{}", paint(&record.to_string(), styled, style));
    }
}

fn paint(text: &str, styled: bool, style: impl Fn(&str) -> String) -> String {
    if styled {
        style(text)
    } else {
        text.to_string()
    }
}

/// Render outcomes as a JSON array, one object per mapping.
pub fn render_json(outcomes: &[MappingOutcome]) -> Result<String, serde_json::Error> {
    #[derive(Serialize)]
    #[serde(tag = "status", rename_all = "lowercase")]
    enum JsonOutcome<'a> {
        Ok {
            #[serde(flatten)]
            report: &'a MappingReport,
        },
        Error {
            name: &'a str,
            error: String,
        },
    }

    let items: Vec<JsonOutcome> = outcomes
        .iter()
        .map(|outcome| match &outcome.result {
            Ok(report) => JsonOutcome::Ok { report },
            Err(e) => JsonOutcome::Error {
                name: &outcome.name,
                error: e.to_string(),
            },
        })
        .collect();

    serde_json::to_string_pretty(&items)
}

/// Render in the requested format.
pub fn render(outcomes: &[MappingOutcome], format: ReportFormat, styled: bool) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(render_text(outcomes, styled)),
        ReportFormat::Json => render_json(outcomes).map(|mut json| {
            json.push('\n');
            json
        }),
    }
}
