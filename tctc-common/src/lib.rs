//! Core library for TCTC, the traceability and test coverage tool.
//!
//! Builds a requirements ↔ tests traceability matrix from two tabular
//! datasets, validates their referential consistency, derives coverage
//! KPIs, optionally asks an advisory provider for missing links, and
//! renders a report bundle.

pub mod advisory;
pub mod config;
pub mod errors;
pub mod kpi;
pub mod loader;
pub mod logging;
pub mod models;
pub mod observe;
pub mod pipeline;
pub mod report;
pub mod tabular;
pub mod testing;
pub mod traceability;
pub mod validators;

pub use advisory::{
    AdvisoryError, AdvisoryGate, AdvisoryOptions, AdvisoryProvider, AdvisoryRequest,
    LinkSuggestion, RetryPolicy, is_ai_enabled,
};
pub use config::{ConfigError, LoadedConfig, TctcConfig, load_config, validate_config};
pub use errors::{IssueCode, IssueEntry, IssueSeverity};
pub use kpi::{
    CoverageKpi, CoverageSource, JsonCoverageSource, KpiError, LinkedTests, compute_coverage_kpis,
    compute_coverage_kpis_with,
};
pub use loader::{LoadError, load_links, load_requirements, load_tests};
pub use logging::{LogConfig, LogFormat, LoggingError, LoggingGuards, init_logging};
pub use models::{
    CoverageSummary, Criticality, LinkSource, ModelError, Requirement, RequirementDraft, TestCase,
    TestCaseDraft, TraceLink, TraceLinkDraft, build_links_from_testcases, parse_requirement_ids,
};
pub use observe::{
    EventLevel, NoopObserver, Observer, ObserverEvent, RecordingObserver, TracingObserver,
};
pub use pipeline::{PipelineError, RunOptions, RunOutcome, run};
pub use report::{ReportError, ReportInput, ReportOptions, ReportPaths, generate_report_bundle};
pub use traceability::{
    MatrixExport, TraceabilityMatrix, build_matrix_from_testcases, build_traceability_matrix,
};
pub use validators::{
    DatasetValidationError, UnknownLink, ValidationIssue, ValidationReport, raise_if_invalid,
    validate_datasets,
};
