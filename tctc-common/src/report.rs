//! Report bundle: CSV exports, a JSON matrix export and a standalone HTML page.

use crate::advisory::LinkSuggestion;
use crate::kpi::CoverageKpi;
use crate::models::{Requirement, TestCase};
use crate::tabular::write_csv;
use crate::traceability::TraceabilityMatrix;
use chrono::{DateTime, Local};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const TRACEABILITY_CSV: &str = "traceability_matrix.csv";
pub const KPI_CSV: &str = "kpi_summary.csv";
pub const AI_SUGGESTIONS_CSV: &str = "ai_suggestions.csv";
pub const MATRIX_JSON: &str = "traceability_matrix.json";
pub const REPORT_HTML: &str = "report.html";

pub const DEFAULT_TITLE: &str = "TCTC - Traceability Report";

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to serialize matrix export: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the report renders. Borrowed, never modified.
#[derive(Debug, Clone, Copy)]
pub struct ReportInput<'a> {
    pub requirements: &'a [Requirement],
    pub tests: &'a [TestCase],
    pub matrix: &'a TraceabilityMatrix,
    pub kpi: &'a CoverageKpi,
    pub suggestions: &'a [LinkSuggestion],
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub out_dir: PathBuf,
    pub title: String,
    /// Defaults to the current local time.
    pub generated_at: Option<DateTime<Local>>,
}

impl ReportOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            title: DEFAULT_TITLE.to_string(),
            generated_at: None,
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Paths of the generated artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportPaths {
    pub out_dir: PathBuf,
    pub report_html: PathBuf,
    pub traceability_csv: PathBuf,
    pub kpi_csv: PathBuf,
    pub matrix_json: PathBuf,
    /// Only written when there are suggestions.
    pub ai_suggestions_csv: Option<PathBuf>,
}

/// Float rendering that keeps a trailing `.0` on whole numbers (`50.0`).
pub(crate) fn fmt_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> ReportError + '_ {
    move |source| ReportError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// `requirement_id, covered, linked_test_ids` per requirement.
fn matrix_rows(matrix: &TraceabilityMatrix) -> Vec<Vec<String>> {
    matrix
        .req_to_tests()
        .iter()
        .map(|(req_id, tests)| {
            let covered = if tests.is_empty() { "NO" } else { "YES" };
            vec![
                req_id.clone(),
                covered.to_string(),
                tests.iter().cloned().collect::<Vec<_>>().join(" "),
            ]
        })
        .collect()
}

fn kpi_rows(kpi: &CoverageKpi) -> Vec<Vec<String>> {
    [
        ("total_requirements", kpi.total_requirements.to_string()),
        ("total_tests", kpi.total_tests.to_string()),
        ("coverage_percent", fmt_float(kpi.coverage_percent)),
        (
            "covered_requirements_count",
            kpi.covered_requirements.len().to_string(),
        ),
        (
            "uncovered_requirements_count",
            kpi.uncovered_requirements.len().to_string(),
        ),
        ("orphan_tests_count", kpi.orphan_tests.len().to_string()),
        ("total_links", kpi.total_links.to_string()),
        (
            "avg_tests_per_requirement",
            fmt_float(kpi.avg_tests_per_requirement),
        ),
    ]
    .into_iter()
    .map(|(metric, value)| vec![metric.to_string(), value])
    .collect()
}

fn suggestion_rows(suggestions: &[LinkSuggestion]) -> Vec<Vec<String>> {
    suggestions
        .iter()
        .map(|s| {
            vec![
                s.requirement_id.clone(),
                s.test_id.clone(),
                s.confidence.map(fmt_float).unwrap_or_default(),
                s.rationale.trim().to_string(),
            ]
        })
        .collect()
}

/// Write every artifact into `options.out_dir`, creating it if needed.
pub fn generate_report_bundle(
    input: &ReportInput<'_>,
    options: &ReportOptions,
) -> Result<ReportPaths, ReportError> {
    let out_dir = options.out_dir.as_path();
    fs::create_dir_all(out_dir).map_err(io_err(out_dir))?;

    let traceability_csv = out_dir.join(TRACEABILITY_CSV);
    let matrix_rows = matrix_rows(input.matrix);
    write_csv(
        &traceability_csv,
        &["requirement_id", "covered", "linked_test_ids"],
        matrix_rows.iter().cloned(),
    )
    .map_err(io_err(&traceability_csv))?;

    let kpi_csv = out_dir.join(KPI_CSV);
    write_csv(&kpi_csv, &["metric", "value"], kpi_rows(input.kpi)).map_err(io_err(&kpi_csv))?;

    let ai_suggestions_csv = if input.suggestions.is_empty() {
        None
    } else {
        let path = out_dir.join(AI_SUGGESTIONS_CSV);
        write_csv(
            &path,
            &["requirement_id", "test_id", "confidence", "rationale"],
            suggestion_rows(input.suggestions),
        )
        .map_err(io_err(&path))?;
        Some(path)
    };

    let matrix_json = out_dir.join(MATRIX_JSON);
    let export = serde_json::to_string_pretty(&input.matrix.export())?;
    fs::write(&matrix_json, export).map_err(io_err(&matrix_json))?;

    let report_html = out_dir.join(REPORT_HTML);
    let generated_at = options.generated_at.unwrap_or_else(Local::now);
    let html = render_html(input, &options.title, &matrix_rows, generated_at);
    fs::write(&report_html, html).map_err(io_err(&report_html))?;

    Ok(ReportPaths {
        out_dir: out_dir.to_path_buf(),
        report_html,
        traceability_csv,
        kpi_csv,
        matrix_json,
        ai_suggestions_csv,
    })
}

fn esc(text: &str) -> std::borrow::Cow<'_, str> {
    html_escape::encode_safe(text)
}

fn id_list(ids: &[String]) -> String {
    if ids.is_empty() {
        return "<p class=\"meta\">None.</p>".to_string();
    }
    let items: String = ids
        .iter()
        .map(|id| format!("<li>{}</li>", esc(id)))
        .collect();
    format!("<ul>{items}</ul>")
}

fn render_html(
    input: &ReportInput<'_>,
    title: &str,
    matrix_rows: &[Vec<String>],
    generated_at: DateTime<Local>,
) -> String {
    let kpi = input.kpi;
    let badge = if input.suggestions.is_empty() {
        "DETERMINISTIC"
    } else {
        "AI ENABLED"
    };

    let mut matrix_html = String::new();
    for row in matrix_rows {
        let class = if row[1] == "YES" { "yes" } else { "no" };
        let _ = writeln!(
            matrix_html,
            "<tr><td>{}</td><td class=\"{class}\">{}</td><td>{}</td></tr>",
            esc(&row[0]),
            esc(&row[1]),
            esc(&row[2]),
        );
    }

    let suggestions_html = if input.suggestions.is_empty() {
        "<p class=\"meta\">No advisory suggestions.</p>".to_string()
    } else {
        let mut rows = String::new();
        for s in input.suggestions {
            let _ = writeln!(
                rows,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                esc(&s.requirement_id),
                esc(&s.test_id),
                s.confidence.map(fmt_float).unwrap_or_default(),
                esc(s.rationale.trim()),
            );
        }
        format!(
            "<table>\n<thead><tr><th>Requirement</th><th>Test</th><th>Confidence</th><th>Rationale</th></tr></thead>\n<tbody>\n{rows}</tbody>\n</table>"
        )
    };

    format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8"/>
  <meta name="viewport" content="width=device-width, initial-scale=1"/>
  <title>{title}</title>
  <style>
    body {{ font-family: Arial, sans-serif; margin: 24px; background: #f5f7fa; color: #333; }}
    header {{ font-size: 24px; font-weight: bold; padding-bottom: 10px; margin-bottom: 20px; border-bottom: 2px solid #888; }}
    .badge {{ display: inline-block; padding: 2px 8px; border-radius: 12px; font-size: 12px; background: #e9eef6; border: 1px solid #c9d6ea; color: #234; margin-left: 8px; }}
    table {{ border-collapse: collapse; width: 100%; background: #fff; }}
    th, td {{ border: 1px solid #ddd; padding: 8px; vertical-align: top; }}
    th {{ background: #f0f0f0; text-align: left; }}
    td.yes {{ color: #1a7f37; font-weight: bold; }}
    td.no {{ color: #b42318; font-weight: bold; }}
    .meta {{ color: #555; margin: 10px 0 18px 0; }}
  </style>
</head>
<body>
  <header>{title} <span class="badge">{badge}</span></header>
  <div class="meta">Generated {generated} | Requirements: {n_reqs} | Tests: {n_tests}</div>

  <h2>Coverage KPIs</h2>
  <table>
    <tbody>
      <tr><th>Coverage</th><td>{coverage}%</td></tr>
      <tr><th>Requirements</th><td>{total_reqs} ({covered} covered, {uncovered} uncovered)</td></tr>
      <tr><th>Tests</th><td>{total_tests} ({orphans} orphan)</td></tr>
      <tr><th>Links</th><td>{links}</td></tr>
      <tr><th>Avg tests per requirement</th><td>{avg}</td></tr>
    </tbody>
  </table>

  <h2>Traceability matrix</h2>
  <table>
    <thead><tr><th>Requirement</th><th>Covered</th><th>Linked tests</th></tr></thead>
    <tbody>
{matrix_html}    </tbody>
  </table>

  <h2>Uncovered requirements</h2>
  {uncovered_html}

  <h2>Orphan tests</h2>
  {orphans_html}

  <h2>Advisory suggestions</h2>
  {suggestions_html}
</body>
</html>
"#,
        title = esc(title),
        badge = badge,
        generated = generated_at.format("%Y-%m-%d %H:%M:%S"),
        n_reqs = input.requirements.len(),
        n_tests = input.tests.len(),
        coverage = fmt_float(kpi.coverage_percent),
        total_reqs = kpi.total_requirements,
        covered = kpi.covered_requirements.len(),
        uncovered = kpi.uncovered_requirements.len(),
        total_tests = kpi.total_tests,
        orphans = kpi.orphan_tests.len(),
        links = kpi.total_links,
        avg = fmt_float(kpi.avg_tests_per_requirement),
        matrix_html = matrix_html,
        uncovered_html = id_list(&kpi.uncovered_requirements),
        orphans_html = id_list(&kpi.orphan_tests),
        suggestions_html = suggestions_html,
    )
}
