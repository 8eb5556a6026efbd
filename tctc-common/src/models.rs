//! Domain model for requirement ↔ test traceability.
//!
//! Entities are immutable once built. Every constructor goes through a
//! *draft* (`RequirementDraft`, `TestCaseDraft`, `TraceLinkDraft`) that trims
//! and validates its inputs before the final value exists, so a
//! `Requirement` in hand is always well-formed. Deserialization goes through
//! the same drafts via `serde(try_from)`.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A raw input row after CSV parsing: lowercased header → trimmed value.
pub type RawRow = BTreeMap<String, String>;

/// Open metadata carried by requirements and test cases.
pub type Meta = BTreeMap<String, serde_json::Value>;

/// Construction errors for domain entities.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("{entity}.{field} must be non-empty.")]
    EmptyId {
        entity: &'static str,
        field: &'static str,
    },

    #[error("{entity} must have at least a title or a description.")]
    MissingText { entity: &'static str },

    #[error("Invalid {field}='{value}'. Allowed: {allowed}")]
    InvalidEnum {
        field: &'static str,
        value: String,
        allowed: String,
    },

    #[error("TraceLink.confidence must be in [0.0, 1.0] (got {value}).")]
    ConfidenceOutOfRange { value: f64 },

    #[error("CoverageSummary.coverage_percent must be in [0.0, 100.0] (got {value}).")]
    PercentOutOfRange { value: f64 },
}

// ===========================================================================
// Enums
// ===========================================================================

/// Criticality of a requirement.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum Criticality {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

impl Criticality {
    pub const ALL: [Criticality; 4] = [Self::Low, Self::Medium, Self::High, Self::Critical];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Parse a dataset value. Matching is case-sensitive; an empty value
    /// means the default (`MEDIUM`).
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(Self::default());
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| ModelError::InvalidEnum {
                field: "Requirement.criticality",
                value: value.to_string(),
                allowed: Self::ALL.map(|c| c.as_str()).join(", "),
            })
    }
}

impl FromStr for Criticality {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a trace link.
///
/// - `DATASET`: present in the tests dataset
/// - `AI`: advisory suggestion, never authoritative
/// - `HUMAN`: curated manually
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum LinkSource {
    #[default]
    Dataset,
    Ai,
    Human,
}

impl LinkSource {
    pub const ALL: [LinkSource; 3] = [Self::Dataset, Self::Ai, Self::Human];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Dataset => "DATASET",
            Self::Ai => "AI",
            Self::Human => "HUMAN",
        }
    }

    /// Parse a dataset value (case-sensitive). Empty means `DATASET`.
    pub fn parse(raw: &str) -> Result<Self, ModelError> {
        let value = raw.trim();
        if value.is_empty() {
            return Ok(Self::default());
        }
        Self::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| ModelError::InvalidEnum {
                field: "TraceLink.source",
                value: value.to_string(),
                allowed: Self::ALL.map(|s| s.as_str()).join(", "),
            })
    }
}

impl FromStr for LinkSource {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for LinkSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ===========================================================================
// Link parsing
// ===========================================================================

/// Parse a `linked_requirements` field.
///
/// `,`, `;` and `|` are all accepted as separators. Tokens are trimmed,
/// empty tokens dropped, and duplicates removed keeping the first
/// occurrence. Never fails: malformed input only yields fewer ids.
///
/// `" REQ-001 | REQ-002 ; REQ-002,REQ-003  ,, "` → `["REQ-001", "REQ-002", "REQ-003"]`
pub fn parse_requirement_ids(raw: &str) -> Vec<String> {
    let normalized = raw.trim().replace(['|', ';'], ",");
    dedup_ordered(normalized.split(','))
}

/// Trim, drop empties and dedup while keeping first-seen order.
fn dedup_ordered<'a, I>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let id = item.trim();
        if id.is_empty() || !seen.insert(id) {
            continue;
        }
        out.push(id.to_string());
    }
    out
}

/// First non-empty value among `keys`.
pub(crate) fn pick<'a>(row: &'a RawRow, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| row.get(*key))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

// ===========================================================================
// Requirement
// ===========================================================================

/// A requirement (DOORS/Polarion-like row), normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RequirementDraft", into = "RequirementDraft")]
pub struct Requirement {
    requirement_id: String,
    title: String,
    description: String,
    criticality: Criticality,
    source: String,
    system: String,
    component: String,
    priority: String,
    meta: Meta,
}

impl Requirement {
    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn priority(&self) -> &str {
        &self.priority
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }
}

/// Unvalidated requirement input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequirementDraft {
    #[serde(alias = "req_id")]
    pub requirement_id: String,
    #[serde(alias = "summary")]
    pub title: String,
    #[serde(alias = "text", alias = "requirement_text")]
    pub description: String,
    /// Empty means `MEDIUM`.
    pub criticality: String,
    pub source: String,
    pub system: String,
    pub component: String,
    pub priority: String,
    pub meta: Meta,
}

impl RequirementDraft {
    pub fn new(
        requirement_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            requirement_id: requirement_id.into(),
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_criticality(mut self, criticality: impl Into<String>) -> Self {
        self.criticality = criticality.into();
        self
    }

    /// Map a dataset row using the tolerant header aliases.
    pub fn from_row(row: &RawRow) -> Self {
        let get = |keys: &[&str]| pick(row, keys).unwrap_or_default().to_string();
        Self {
            requirement_id: get(&["requirement_id", "req_id", "id"]),
            title: get(&["title", "summary"]),
            description: get(&["description", "text", "requirement_text"]),
            criticality: get(&["criticality", "priority"]),
            source: get(&["source"]),
            system: get(&["system"]),
            component: get(&["component"]),
            priority: get(&["priority"]),
            meta: Meta::new(),
        }
    }

    /// Validate and normalize into an immutable [`Requirement`].
    pub fn build(self) -> Result<Requirement, ModelError> {
        let requirement_id = self.requirement_id.trim().to_string();
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();

        if requirement_id.is_empty() {
            return Err(ModelError::EmptyId {
                entity: "Requirement",
                field: "requirement_id",
            });
        }
        if title.is_empty() && description.is_empty() {
            return Err(ModelError::MissingText {
                entity: "Requirement",
            });
        }
        let criticality = Criticality::parse(&self.criticality)?;
        let source = match self.source.trim() {
            "" => "demo".to_string(),
            s => s.to_string(),
        };

        Ok(Requirement {
            requirement_id,
            title,
            description,
            criticality,
            source,
            system: self.system.trim().to_string(),
            component: self.component.trim().to_string(),
            priority: self.priority.trim().to_string(),
            meta: self.meta,
        })
    }
}

impl TryFrom<RequirementDraft> for Requirement {
    type Error = ModelError;

    fn try_from(draft: RequirementDraft) -> Result<Self, Self::Error> {
        draft.build()
    }
}

impl From<Requirement> for RequirementDraft {
    fn from(req: Requirement) -> Self {
        Self {
            requirement_id: req.requirement_id,
            title: req.title,
            description: req.description,
            criticality: req.criticality.as_str().to_string(),
            source: req.source,
            system: req.system,
            component: req.component,
            priority: req.priority,
            meta: req.meta,
        }
    }
}

// ===========================================================================
// TestCase
// ===========================================================================

/// A test case with its links to requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TestCaseDraft", into = "TestCaseDraft")]
pub struct TestCase {
    test_id: String,
    title: String,
    description: String,
    linked_requirements_raw: String,
    linked_requirements: Vec<String>,
    meta: Meta,
}

impl TestCase {
    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Link field exactly as found in the dataset (trimmed).
    pub fn linked_requirements_raw(&self) -> &str {
        &self.linked_requirements_raw
    }

    /// Normalized, deduplicated requirement ids in first-seen order.
    pub fn linked_requirements(&self) -> &[String] {
        &self.linked_requirements
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }
}

/// Unvalidated test case input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, from = "TestCaseRecord")]
pub struct TestCaseDraft {
    pub test_id: String,
    pub title: String,
    pub description: String,
    pub linked_requirements_raw: String,
    /// Explicit list; when non-empty it wins over the raw field.
    pub linked_requirements: Vec<String>,
    pub meta: Meta,
}

impl TestCaseDraft {
    pub fn new(
        test_id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            title: title.into(),
            description: description.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_links_raw(mut self, raw: impl Into<String>) -> Self {
        self.linked_requirements_raw = raw.into();
        self
    }

    #[must_use]
    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.linked_requirements = links.into_iter().map(Into::into).collect();
        self
    }

    /// Map a dataset row using the tolerant header aliases.
    pub fn from_row(row: &RawRow) -> Self {
        let get = |keys: &[&str]| pick(row, keys).unwrap_or_default().to_string();
        Self {
            test_id: get(&["test_id", "tc_id", "id"]),
            title: get(&["title", "summary"]),
            description: get(&["description", "text"]),
            linked_requirements_raw: get(&["linked_requirements", "links", "requirements"]),
            linked_requirements: Vec::new(),
            meta: Meta::new(),
        }
    }

    /// Validate and normalize into an immutable [`TestCase`].
    pub fn build(self) -> Result<TestCase, ModelError> {
        let test_id = self.test_id.trim().to_string();
        let title = self.title.trim().to_string();
        let description = self.description.trim().to_string();
        let linked_requirements_raw = self.linked_requirements_raw.trim().to_string();

        if test_id.is_empty() {
            return Err(ModelError::EmptyId {
                entity: "TestCase",
                field: "test_id",
            });
        }
        if title.is_empty() && description.is_empty() {
            return Err(ModelError::MissingText { entity: "TestCase" });
        }

        let explicit = dedup_ordered(self.linked_requirements.iter().map(String::as_str));
        let linked_requirements = if explicit.is_empty() {
            parse_requirement_ids(&linked_requirements_raw)
        } else {
            explicit
        };

        Ok(TestCase {
            test_id,
            title,
            description,
            linked_requirements_raw,
            linked_requirements,
            meta: self.meta,
        })
    }
}

impl TryFrom<TestCaseDraft> for TestCase {
    type Error = ModelError;

    fn try_from(draft: TestCaseDraft) -> Result<Self, Self::Error> {
        draft.build()
    }
}

impl From<TestCase> for TestCaseDraft {
    fn from(tc: TestCase) -> Self {
        Self {
            test_id: tc.test_id,
            title: tc.title,
            description: tc.description,
            linked_requirements_raw: tc.linked_requirements_raw,
            linked_requirements: tc.linked_requirements,
            meta: tc.meta,
        }
    }
}

/// Serialized test case shape. Older exports store `linked_requirements` as
/// the raw delimited string instead of a list.
#[derive(Deserialize, Default)]
#[serde(default)]
struct TestCaseRecord {
    #[serde(alias = "tc_id")]
    test_id: String,
    #[serde(alias = "summary")]
    title: String,
    #[serde(alias = "text")]
    description: String,
    linked_requirements_raw: String,
    #[serde(alias = "links", alias = "requirements")]
    linked_requirements: Option<LinkField>,
    meta: Meta,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LinkField {
    Text(String),
    List(Vec<Option<String>>),
}

impl From<TestCaseRecord> for TestCaseDraft {
    fn from(record: TestCaseRecord) -> Self {
        let mut raw = record.linked_requirements_raw;
        let linked_requirements = match record.linked_requirements {
            Some(LinkField::Text(text)) => {
                if raw.trim().is_empty() {
                    raw.clone_from(&text);
                }
                parse_requirement_ids(&text)
            }
            Some(LinkField::List(items)) => dedup_ordered(items.iter().flatten().map(String::as_str)),
            None => Vec::new(),
        };
        Self {
            test_id: record.test_id,
            title: record.title,
            description: record.description,
            linked_requirements_raw: raw,
            linked_requirements,
            meta: record.meta,
        }
    }
}

// ===========================================================================
// TraceLink
// ===========================================================================

/// A link between one requirement and one test case.
///
/// Identity for deduplication is `(requirement_id, test_id, source)`;
/// `confidence` is only meaningful for `AI` links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "TraceLinkDraft", into = "TraceLinkDraft")]
pub struct TraceLink {
    requirement_id: String,
    test_id: String,
    source: LinkSource,
    confidence: Option<f64>,
    rationale: String,
}

impl TraceLink {
    /// Validated link with no confidence or rationale.
    pub fn new(
        requirement_id: impl Into<String>,
        test_id: impl Into<String>,
        source: LinkSource,
    ) -> Result<Self, ModelError> {
        TraceLinkDraft {
            requirement_id: requirement_id.into(),
            test_id: test_id.into(),
            source: source.as_str().to_string(),
            ..TraceLinkDraft::default()
        }
        .build()
    }

    /// Link derived from a dataset row. Both ids are already normalized.
    pub(crate) fn dataset(requirement_id: &str, test_id: &str) -> Self {
        Self {
            requirement_id: requirement_id.to_string(),
            test_id: test_id.to_string(),
            source: LinkSource::Dataset,
            confidence: None,
            rationale: String::new(),
        }
    }

    pub fn requirement_id(&self) -> &str {
        &self.requirement_id
    }

    pub fn test_id(&self) -> &str {
        &self.test_id
    }

    pub fn source(&self) -> LinkSource {
        self.source
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn rationale(&self) -> &str {
        &self.rationale
    }

    /// Deduplication and ordering key.
    pub fn key(&self) -> (&str, &str, &'static str) {
        (&self.requirement_id, &self.test_id, self.source.as_str())
    }
}

/// Unvalidated link input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TraceLinkDraft {
    #[serde(alias = "req_id")]
    pub requirement_id: String,
    #[serde(alias = "tc_id")]
    pub test_id: String,
    /// Empty means `DATASET`.
    pub source: String,
    pub confidence: Option<f64>,
    pub rationale: String,
}

impl TraceLinkDraft {
    /// Map an extra-links row.
    pub fn from_row(row: &RawRow) -> Result<Self, ModelError> {
        let get = |keys: &[&str]| pick(row, keys).unwrap_or_default().to_string();
        let confidence = match pick(row, &["confidence"]) {
            None => None,
            Some(text) => Some(text.parse::<f64>().map_err(|_| ModelError::InvalidEnum {
                field: "TraceLink.confidence",
                value: text.to_string(),
                allowed: "a number in [0.0, 1.0]".to_string(),
            })?),
        };
        Ok(Self {
            requirement_id: get(&["requirement_id", "req_id"]),
            test_id: get(&["test_id", "tc_id"]),
            source: get(&["source"]),
            confidence,
            rationale: get(&["rationale"]),
        })
    }

    pub fn build(self) -> Result<TraceLink, ModelError> {
        let requirement_id = self.requirement_id.trim().to_string();
        let test_id = self.test_id.trim().to_string();
        if requirement_id.is_empty() {
            return Err(ModelError::EmptyId {
                entity: "TraceLink",
                field: "requirement_id",
            });
        }
        if test_id.is_empty() {
            return Err(ModelError::EmptyId {
                entity: "TraceLink",
                field: "test_id",
            });
        }
        let source = LinkSource::parse(&self.source)?;
        if let Some(value) = self.confidence
            && !(value.is_finite() && (0.0..=1.0).contains(&value))
        {
            return Err(ModelError::ConfidenceOutOfRange { value });
        }

        Ok(TraceLink {
            requirement_id,
            test_id,
            source,
            confidence: self.confidence,
            rationale: self.rationale.trim().to_string(),
        })
    }
}

impl TryFrom<TraceLinkDraft> for TraceLink {
    type Error = ModelError;

    fn try_from(draft: TraceLinkDraft) -> Result<Self, Self::Error> {
        draft.build()
    }
}

impl From<TraceLink> for TraceLinkDraft {
    fn from(link: TraceLink) -> Self {
        Self {
            requirement_id: link.requirement_id,
            test_id: link.test_id,
            source: link.source.as_str().to_string(),
            confidence: link.confidence,
            rationale: link.rationale,
        }
    }
}

/// `DATASET` links implied by each test case's normalized list.
///
/// No validation: dangling references are kept and left to the validator.
pub fn build_links_from_testcases(tests: &[TestCase]) -> Vec<TraceLink> {
    tests
        .iter()
        .flat_map(|tc| {
            tc.linked_requirements()
                .iter()
                .map(|req_id| TraceLink::dataset(req_id, tc.test_id()))
        })
        .collect()
}

// ===========================================================================
// CoverageSummary
// ===========================================================================

/// Count-only coverage snapshot, for exports and run payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(try_from = "CoverageSummaryRecord")]
pub struct CoverageSummary {
    pub requirements_total: usize,
    pub requirements_covered: usize,
    pub requirements_uncovered: usize,
    pub tests_total: usize,
    pub tests_orphan: usize,
    /// 0..=100
    pub coverage_percent: f64,
}

impl CoverageSummary {
    pub fn new(
        requirements_total: usize,
        requirements_covered: usize,
        requirements_uncovered: usize,
        tests_total: usize,
        tests_orphan: usize,
        coverage_percent: f64,
    ) -> Result<Self, ModelError> {
        if !(coverage_percent.is_finite() && (0.0..=100.0).contains(&coverage_percent)) {
            return Err(ModelError::PercentOutOfRange {
                value: coverage_percent,
            });
        }
        Ok(Self {
            requirements_total,
            requirements_covered,
            requirements_uncovered,
            tests_total,
            tests_orphan,
            coverage_percent,
        })
    }
}

#[derive(Deserialize)]
struct CoverageSummaryRecord {
    #[serde(default)]
    requirements_total: usize,
    #[serde(default)]
    requirements_covered: usize,
    #[serde(default)]
    requirements_uncovered: usize,
    #[serde(default)]
    tests_total: usize,
    #[serde(default)]
    tests_orphan: usize,
    #[serde(default)]
    coverage_percent: f64,
}

impl TryFrom<CoverageSummaryRecord> for CoverageSummary {
    type Error = ModelError;

    fn try_from(r: CoverageSummaryRecord) -> Result<Self, Self::Error> {
        Self::new(
            r.requirements_total,
            r.requirements_covered,
            r.requirements_uncovered,
            r.tests_total,
            r.tests_orphan,
            r.coverage_percent,
        )
    }
}
