//! Report rendering for the variant matrix.
//!
//! The renderer sees only the finished matrix; it never looks at jobs.
use crate::cli::PullRequestRef;
use crate::templates;
use crate::types::{Cell, Dimension, Entry, Matrix};
use crate::urls;
use crate::util::escape_html;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::Path;

/// Header information shared by every report format.
#[derive(Debug, Clone, Serialize)]
pub struct ReportContext {
    pub title: String,
    pub url: String,
    pub generated_at_epoch_ms: i64,
}

impl ReportContext {
    pub fn new(pr: &PullRequestRef) -> Self {
        Self {
            title: pr.to_string(),
            url: urls::pull_request_url(&pr.org, &pr.repo, pr.number),
            generated_at_epoch_ms: Utc::now().timestamp_millis(),
        }
    }
}

#[derive(Serialize)]
struct JsonReport<'a> {
    #[serde(flatten)]
    context: &'a ReportContext,
    entries: Vec<&'a Entry>,
}

pub fn render_json(context: &ReportContext, matrix: &Matrix) -> Result<String> {
    let report = JsonReport {
        context,
        entries: matrix.values().collect(),
    };
    serde_json::to_string_pretty(&report).context("serialize json report")
}

pub fn render_html(context: &ReportContext, matrix: &Matrix) -> String {
    let mut header = String::from("        <th>Variant</th>\n        <th>Install</th>");
    for dimension in Dimension::ALL {
        header.push_str(&format!("\n        <th>{}</th>", escape_html(dimension.title())));
    }

    let mut rows = Vec::with_capacity(matrix.len());
    for entry in matrix.values() {
        let mut row = String::from("      <tr>\n");
        row.push_str(&format!("        <td>{}</td>\n", escape_html(&entry.variant)));
        row.push_str(&render_cell(Some(&entry.install_success)));
        for dimension in Dimension::ALL {
            row.push_str(&render_cell(entry.cell(dimension)));
        }
        row.push_str("      </tr>");
        rows.push(row);
    }

    // Rows go in last: they carry scraped URLs, which must not be scanned
    // for placeholders.
    templates::REPORT_HTML
        .replace("{{title}}", &escape_html(&context.title))
        .replace("{{url}}", &escape_html(&context.url))
        .replace("{{generated}}", &format_utc(context.generated_at_epoch_ms))
        .replace("{{header}}", &header)
        .replace("{{rows}}", &rows.join("\n"))
}

fn render_cell<R: Display>(cell: Option<&Cell<R>>) -> String {
    let Some(cell) = cell else {
        return "        <td class=\"disabled\">n/a</td>\n".to_string();
    };
    let label = cell.result.to_string();
    let class = match label.as_str() {
        "success" | "failure" | "unknown" => label.as_str(),
        _ => "other",
    };
    let body = match &cell.source_url {
        Some(url) => format!(
            "<a href=\"{}\">{}</a>",
            escape_html(url),
            escape_html(&label)
        ),
        None => escape_html(&label),
    };
    format!("        <td class=\"{class}\">{body}</td>\n")
}

/// `YYYY-MM-DD HH:MM:SS UTC` for a unix timestamp in milliseconds.
fn format_utc(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("{epoch_ms} ms since epoch"))
}

/// Write the rendered report, creating the parent directory if needed.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create report dir {}", parent.display()))?;
    }
    fs::write(path, contents.as_bytes())
        .with_context(|| format!("write report {}", path.display()))?;
    Ok(())
}
