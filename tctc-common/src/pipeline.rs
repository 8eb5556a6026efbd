//! End-to-end run: load → validate → matrix → KPI → advisory → report.

use crate::advisory::{AdvisoryGate, AdvisoryOptions, AdvisoryProvider, LinkSuggestion};
use crate::config::TctcConfig;
use crate::kpi::{CoverageKpi, KpiError, compute_coverage_kpis_with};
use crate::loader::{LoadError, load_links, load_requirements, load_tests};
use crate::models::{CoverageSummary, TraceLink, build_links_from_testcases};
use crate::observe::{Observer, ObserverEvent};
use crate::report::{
    DEFAULT_TITLE, ReportError, ReportInput, ReportOptions, ReportPaths, generate_report_bundle,
};
use crate::traceability::build_traceability_matrix;
use crate::validators::{
    DatasetValidationError, ValidationIssue, ValidationReport, raise_if_invalid, validate_datasets,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("Empty dataset (requirements: {requirements}, tests: {tests})")]
    EmptyDataset { requirements: usize, tests: usize },

    #[error(transparent)]
    Validation(#[from] DatasetValidationError),

    #[error(transparent)]
    Kpi(#[from] KpiError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

/// Inputs of one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub requirements: PathBuf,
    pub tests: PathBuf,
    pub links: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub title: String,
    /// Empty datasets and blocking validation issues become fatal.
    pub strict: bool,
    /// `None` disables the advisory step.
    pub advisory: Option<AdvisoryOptions>,
}

impl RunOptions {
    pub fn new(
        requirements: impl Into<PathBuf>,
        tests: impl Into<PathBuf>,
        out_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            requirements: requirements.into(),
            tests: tests.into(),
            links: None,
            out_dir: out_dir.into(),
            title: DEFAULT_TITLE.to_string(),
            strict: false,
            advisory: None,
        }
    }

    pub fn from_config(config: &TctcConfig) -> Self {
        Self {
            requirements: config.inputs.requirements.clone(),
            tests: config.inputs.tests.clone(),
            links: config.inputs.links.clone(),
            out_dir: config.output.out_dir.clone(),
            title: config.output.title.clone(),
            strict: config.validation.strict,
            advisory: config
                .advisory
                .is_enabled()
                .then(|| config.advisory.to_options()),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RunOutcome {
    pub requirements_count: usize,
    pub tests_count: usize,
    pub requirements_input: PathBuf,
    pub tests_input: PathBuf,
    pub links_input: Option<PathBuf>,
    /// Curated links merged with the dataset links.
    pub extra_links_count: usize,
    pub artifacts: ReportPaths,
    pub coverage_percent: f64,
    pub uncovered_requirements: Vec<String>,
    pub orphan_tests: Vec<String>,
    pub ai_enabled: bool,
    pub ai_suggestions_count: usize,
    pub suggestions: Vec<LinkSuggestion>,
    pub kpi: CoverageSummary,
    pub validation: ValidationReport,
}

fn report_issue(observer: &dyn Observer, issue: &ValidationIssue, blocking: bool) {
    let event = if blocking {
        ObserverEvent::error("validation.error", format!("{}: {}", issue.code, issue.message))
    } else {
        ObserverEvent::warn("validation.warning", format!("{}: {}", issue.code, issue.message))
    };
    let event = issue
        .context
        .iter()
        .fold(event.with_field("code", issue.code), |ev, (k, v)| {
            ev.with_field(k.as_str(), v)
        });
    observer.event(&event);
}

fn log_validation(observer: &dyn Observer, report: &ValidationReport) {
    observer.event(
        &ObserverEvent::info("validation.summary", "Dataset validation")
            .with_field("ok", report.ok)
            .with_field("errors", report.errors.len())
            .with_field("warnings", report.warnings.len()),
    );
    for issue in &report.errors {
        report_issue(observer, issue, true);
    }
    for issue in &report.warnings {
        report_issue(observer, issue, false);
    }
}

fn log_dangling_links(observer: &dyn Observer, extra: &[TraceLink], report: &ValidationReport) {
    let dangling = extra
        .iter()
        .filter(|link| {
            report
                .requirement_ids
                .binary_search_by(|id| id.as_str().cmp(link.requirement_id()))
                .is_err()
                || report
                    .test_ids
                    .binary_search_by(|id| id.as_str().cmp(link.test_id()))
                    .is_err()
        })
        .count();
    if dangling > 0 {
        observer.event(
            &ObserverEvent::warn(
                "pipeline.extra_links_dangling",
                "Some curated links reference unknown ids and are ignored by the matrix",
            )
            .with_field("count", dangling),
        );
    }
}

/// Run the whole chain and write the report bundle.
///
/// The advisory step runs only when `options.advisory` is set and a
/// provider is given; it never fails the run.
pub fn run(
    options: &RunOptions,
    provider: Option<&dyn AdvisoryProvider>,
    observer: &dyn Observer,
) -> Result<RunOutcome, PipelineError> {
    observer.event(
        &ObserverEvent::info("pipeline.started", "Starting traceability run")
            .with_field("requirements", options.requirements.display())
            .with_field("tests", options.tests.display())
            .with_field("out_dir", options.out_dir.display())
            .with_field("strict", options.strict),
    );

    let requirements = load_requirements(&options.requirements, observer)?;
    let tests = load_tests(&options.tests, observer)?;
    if options.strict && (requirements.is_empty() || tests.is_empty()) {
        return Err(PipelineError::EmptyDataset {
            requirements: requirements.len(),
            tests: tests.len(),
        });
    }

    let validation = validate_datasets(&requirements, &tests);
    log_validation(observer, &validation);
    if options.strict {
        raise_if_invalid(&validation)?;
    }

    let extra = match &options.links {
        Some(path) => load_links(path, observer)?,
        None => Vec::new(),
    };
    log_dangling_links(observer, &extra, &validation);

    let mut links = build_links_from_testcases(&tests);
    links.extend(extra.iter().cloned());
    let matrix = build_traceability_matrix(&requirements, &tests, Some(links));
    let kpi: CoverageKpi = compute_coverage_kpis_with(&matrix, observer)?;

    let ai_enabled = options.advisory.is_some() && provider.is_some();
    let suggestions = match (&options.advisory, provider) {
        (Some(advisory), Some(provider)) => AdvisoryGate::new(provider, advisory.clone())
            .with_observer(observer)
            .suggest_missing_links(&requirements, &tests, &matrix),
        _ => {
            observer.event(&ObserverEvent::debug(
                "pipeline.advisory_skipped",
                "Advisory step disabled",
            ));
            Vec::new()
        }
    };

    let report_options = ReportOptions::new(&options.out_dir).with_title(&options.title);
    let artifacts = generate_report_bundle(
        &ReportInput {
            requirements: &requirements,
            tests: &tests,
            matrix: &matrix,
            kpi: &kpi,
            suggestions: &suggestions,
        },
        &report_options,
    )?;

    observer.event(
        &ObserverEvent::info("pipeline.completed", "Traceability run complete")
            .with_field("coverage_percent", kpi.coverage_percent)
            .with_field("uncovered", kpi.uncovered_requirements.len())
            .with_field("orphans", kpi.orphan_tests.len())
            .with_field("suggestions", suggestions.len())
            .with_field("report", artifacts.report_html.display()),
    );

    Ok(RunOutcome {
        requirements_count: requirements.len(),
        tests_count: tests.len(),
        requirements_input: options.requirements.clone(),
        tests_input: options.tests.clone(),
        links_input: options.links.clone(),
        extra_links_count: extra.len(),
        artifacts,
        coverage_percent: kpi.coverage_percent,
        uncovered_requirements: kpi.uncovered_requirements.clone(),
        orphan_tests: kpi.orphan_tests.clone(),
        ai_enabled,
        ai_suggestions_count: suggestions.len(),
        kpi: kpi.summary(),
        suggestions,
        validation,
    })
}
