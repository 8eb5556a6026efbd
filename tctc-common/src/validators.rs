//! Dataset consistency checks.
//!
//! [`validate_datasets`] never fails: every finding is data in the returned
//! [`ValidationReport`]. Blocking findings (duplicates, unknown links) turn
//! `ok` false; advisory findings (orphans, uncovered) never do. Callers that
//! want a hard stop use [`raise_if_invalid`].

use crate::errors::{IssueCode, IssueSeverity};
use crate::models::{Requirement, TestCase, build_links_from_testcases};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

/// Number of `test->req` pairs shown in the unknown-link preview.
const UNKNOWN_LINK_PREVIEW: usize = 10;

/// One validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ValidationIssue {
    fn new(code: IssueCode) -> Self {
        Self {
            code,
            message: code.message().to_string(),
            context: BTreeMap::new(),
        }
    }

    fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    pub fn severity(&self) -> IssueSeverity {
        self.code.severity()
    }
}

/// A test case that points at a requirement id missing from the dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UnknownLink {
    pub test_id: String,
    pub requirement_id: String,
}

/// Outcome of [`validate_datasets`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationReport {
    pub ok: bool,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,

    pub requirements_total: usize,
    pub tests_total: usize,
    /// DATASET links derived from the tests, dangling ones included.
    pub links_total: usize,

    pub requirement_ids: Vec<String>,
    pub test_ids: Vec<String>,

    /// Requirements no test links to.
    pub requirements_uncovered: Vec<String>,
    /// Tests with no linked requirement.
    pub tests_orphan: Vec<String>,

    pub unknown_requirement_links: Vec<UnknownLink>,
    pub duplicate_requirement_ids: Vec<String>,
    pub duplicate_test_ids: Vec<String>,
}

impl ValidationReport {
    /// Sorted distinct codes of the blocking errors.
    pub fn error_codes(&self) -> Vec<IssueCode> {
        self.errors
            .iter()
            .map(|issue| issue.code)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn has_code(&self, code: IssueCode) -> bool {
        self.errors
            .iter()
            .chain(&self.warnings)
            .any(|issue| issue.code == code)
    }
}

/// Raised by [`raise_if_invalid`] when a report carries blocking errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Dataset validation failed: {}", join_codes(.codes))]
pub struct DatasetValidationError {
    pub codes: Vec<IssueCode>,
}

fn join_codes(codes: &[IssueCode]) -> String {
    codes
        .iter()
        .map(IssueCode::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ids appearing more than once, sorted.
fn find_duplicates<'a>(ids: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut dups = BTreeSet::new();
    for id in ids {
        if !seen.insert(id) {
            dups.insert(id);
        }
    }
    dups.into_iter().map(str::to_string).collect()
}

/// Check uniqueness and referential integrity of both datasets.
pub fn validate_datasets(requirements: &[Requirement], tests: &[TestCase]) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let duplicate_requirement_ids =
        find_duplicates(requirements.iter().map(Requirement::requirement_id));
    let duplicate_test_ids = find_duplicates(tests.iter().map(TestCase::test_id));

    if !duplicate_requirement_ids.is_empty() {
        errors.push(
            ValidationIssue::new(IssueCode::DuplicateRequirementId)
                .with("ids", duplicate_requirement_ids.join(",")),
        );
    }
    if !duplicate_test_ids.is_empty() {
        errors.push(
            ValidationIssue::new(IssueCode::DuplicateTestId)
                .with("ids", duplicate_test_ids.join(",")),
        );
    }

    let known: HashSet<&str> = requirements.iter().map(Requirement::requirement_id).collect();
    let links = build_links_from_testcases(tests);
    let unknown_requirement_links: Vec<UnknownLink> = links
        .iter()
        .filter(|link| !known.contains(link.requirement_id()))
        .map(|link| UnknownLink {
            test_id: link.test_id().to_string(),
            requirement_id: link.requirement_id().to_string(),
        })
        .collect();

    if !unknown_requirement_links.is_empty() {
        let preview = unknown_requirement_links
            .iter()
            .take(UNKNOWN_LINK_PREVIEW)
            .map(|u| format!("{}->{}", u.test_id, u.requirement_id))
            .collect::<Vec<_>>()
            .join("; ");
        errors.push(
            ValidationIssue::new(IssueCode::UnknownRequirementLink)
                .with("count", unknown_requirement_links.len().to_string())
                .with("preview", preview),
        );
    }

    let mut tests_orphan: Vec<String> = tests
        .iter()
        .filter(|tc| tc.linked_requirements().is_empty())
        .map(|tc| tc.test_id().to_string())
        .collect();
    tests_orphan.sort();
    if !tests_orphan.is_empty() {
        warnings.push(
            ValidationIssue::new(IssueCode::OrphanTest)
                .with("count", tests_orphan.len().to_string())
                .with("ids", tests_orphan.join(",")),
        );
    }

    let referenced: HashSet<&str> = tests
        .iter()
        .flat_map(|tc| tc.linked_requirements().iter().map(String::as_str))
        .collect();
    let mut requirements_uncovered: Vec<String> = requirements
        .iter()
        .map(Requirement::requirement_id)
        .filter(|id| !referenced.contains(id))
        .map(str::to_string)
        .collect();
    requirements_uncovered.sort();
    if !requirements_uncovered.is_empty() {
        warnings.push(
            ValidationIssue::new(IssueCode::UncoveredRequirement)
                .with("count", requirements_uncovered.len().to_string())
                .with("ids", requirements_uncovered.join(",")),
        );
    }

    let mut requirement_ids: Vec<String> = requirements
        .iter()
        .map(|r| r.requirement_id().to_string())
        .collect();
    requirement_ids.sort();
    let mut test_ids: Vec<String> = tests.iter().map(|t| t.test_id().to_string()).collect();
    test_ids.sort();

    ValidationReport {
        ok: errors.is_empty(),
        errors,
        warnings,
        requirements_total: requirements.len(),
        tests_total: tests.len(),
        links_total: links.len(),
        requirement_ids,
        test_ids,
        requirements_uncovered,
        tests_orphan,
        unknown_requirement_links,
        duplicate_requirement_ids,
        duplicate_test_ids,
    }
}

/// Turn a failed report into an error listing every blocking code.
pub fn raise_if_invalid(report: &ValidationReport) -> Result<(), DatasetValidationError> {
    if report.ok {
        return Ok(());
    }
    Err(DatasetValidationError {
        codes: report.error_codes(),
    })
}
