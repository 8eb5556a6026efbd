//! Coverage KPIs.
//!
//! The engine only needs a [`CoverageSource`]: a `req_to_tests` mapping plus
//! optional capabilities. [`TraceabilityMatrix`] is the usual source;
//! [`JsonCoverageSource`] reads an exported matrix (or any JSON document with
//! the same shape).
//!
//! Leniency is asymmetric:
//! - a failing or disagreeing `uncovered_requirements` capability only warns,
//!   the locally computed list is kept;
//! - a failing `orphan_tests` capability is an error.

use crate::models::CoverageSummary;
use crate::observe::{NoopObserver, Observer, ObserverEvent};
use crate::traceability::TraceabilityMatrix;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// KPI input contract violations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KpiError {
    #[error("Invalid input: coverage source is null.")]
    NullInput,

    #[error("Invalid input: coverage source must expose 'req_to_tests'.")]
    MissingMapping,

    #[error("Invalid input: 'req_to_tests' must be a mapping (got {kind}).")]
    NotAMapping { kind: String },

    #[error(
        "Invalid input: each req_to_tests value must be a set/list of test IDs \
         ({requirement_id} holds {kind})."
    )]
    InvalidLinkedTests { requirement_id: String, kind: String },

    #[error("orphan_tests() failed: {0}")]
    OrphanAccessor(String),

    #[error("uncovered_requirements() failed: {0}")]
    UncoveredAccessor(String),
}

/// Test ids linked to one requirement, as exposed by a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkedTests {
    Set(BTreeSet<String>),
    List(Vec<String>),
    /// No value stored; counts as zero tests.
    Absent,
    /// Anything else. Rejected by the engine; `kind` names what was found.
    Other(String),
}

/// What the KPI engine can read from.
///
/// Only `req_to_tests` is mandatory. The other methods are capabilities a
/// source may or may not have: the default `None` means "not provided".
pub trait CoverageSource {
    fn req_to_tests(&self) -> Result<BTreeMap<String, LinkedTests>, KpiError>;

    /// Compared against the computed list; never used as the result.
    fn uncovered_requirements(&self) -> Option<Result<Vec<String>, KpiError>> {
        None
    }

    fn orphan_tests(&self) -> Option<Result<Vec<String>, KpiError>> {
        None
    }

    /// Used to infer orphans when `orphan_tests` is not provided.
    fn test_to_reqs(&self) -> Option<BTreeMap<String, Vec<String>>> {
        None
    }
}

impl CoverageSource for TraceabilityMatrix {
    fn req_to_tests(&self) -> Result<BTreeMap<String, LinkedTests>, KpiError> {
        Ok(TraceabilityMatrix::req_to_tests(self)
            .iter()
            .map(|(id, tests)| (id.clone(), LinkedTests::Set(tests.clone())))
            .collect())
    }

    fn uncovered_requirements(&self) -> Option<Result<Vec<String>, KpiError>> {
        Some(Ok(TraceabilityMatrix::uncovered_requirements(self)))
    }

    fn orphan_tests(&self) -> Option<Result<Vec<String>, KpiError>> {
        Some(Ok(TraceabilityMatrix::orphan_tests(self)))
    }

    fn test_to_reqs(&self) -> Option<BTreeMap<String, Vec<String>>> {
        Some(
            TraceabilityMatrix::test_to_reqs(self)
                .iter()
                .map(|(id, reqs)| (id.clone(), reqs.iter().cloned().collect()))
                .collect(),
        )
    }
}

/// Coverage source over a JSON document such as `traceability_matrix.json`.
///
/// Recognised keys: `req_to_tests` (required), `uncovered_requirements`,
/// `orphan_tests`, `test_to_reqs`. A capability key that is present but not
/// a list of ids counts as a failing accessor.
#[derive(Debug, Clone)]
pub struct JsonCoverageSource {
    doc: Value,
}

impl JsonCoverageSource {
    pub fn new(doc: Value) -> Self {
        Self { doc }
    }

    fn id_list(&self, key: &str) -> Option<Result<Vec<String>, String>> {
        let value = self.doc.get(key)?;
        Some(match value {
            Value::Array(items) => Ok(items.iter().filter_map(stringify_id).collect()),
            other => Err(format!("'{key}' is {}, expected a list", json_kind(other))),
        })
    }
}

impl CoverageSource for JsonCoverageSource {
    fn req_to_tests(&self) -> Result<BTreeMap<String, LinkedTests>, KpiError> {
        if self.doc.is_null() {
            return Err(KpiError::NullInput);
        }
        let mapping = self.doc.get("req_to_tests").ok_or(KpiError::MissingMapping)?;
        let Value::Object(entries) = mapping else {
            return Err(KpiError::NotAMapping {
                kind: json_kind(mapping).to_string(),
            });
        };
        Ok(entries
            .iter()
            .map(|(id, value)| {
                let linked = match value {
                    Value::Null => LinkedTests::Absent,
                    Value::Array(items) => {
                        LinkedTests::List(items.iter().filter_map(stringify_id).collect())
                    }
                    other => LinkedTests::Other(json_kind(other).to_string()),
                };
                (id.clone(), linked)
            })
            .collect())
    }

    fn uncovered_requirements(&self) -> Option<Result<Vec<String>, KpiError>> {
        self.id_list("uncovered_requirements")
            .map(|r| r.map_err(KpiError::UncoveredAccessor))
    }

    fn orphan_tests(&self) -> Option<Result<Vec<String>, KpiError>> {
        self.id_list("orphan_tests")
            .map(|r| r.map_err(KpiError::OrphanAccessor))
    }

    fn test_to_reqs(&self) -> Option<BTreeMap<String, Vec<String>>> {
        let Value::Object(entries) = self.doc.get("test_to_reqs")? else {
            return None;
        };
        Some(
            entries
                .iter()
                .map(|(id, reqs)| {
                    // Only an empty entry marks an orphan; blank ids still count.
                    let reqs = match reqs {
                        Value::Array(items) => items
                            .iter()
                            .map(|v| stringify_id(v).unwrap_or_default())
                            .collect(),
                        Value::String(id) if !id.is_empty() => vec![id.clone()],
                        _ => Vec::new(),
                    };
                    (id.clone(), reqs)
                })
                .collect(),
        )
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

fn stringify_id(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Coverage metrics. Holds no reference to the source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CoverageKpi {
    pub total_requirements: usize,
    /// Linked tests ∪ orphan tests.
    pub total_tests: usize,
    pub covered_requirements: Vec<String>,
    pub uncovered_requirements: Vec<String>,
    pub orphan_tests: Vec<String>,
    pub coverage_percent: f64,
    pub total_links: usize,
    pub avg_tests_per_requirement: f64,
    pub req_to_tests_count: BTreeMap<String, usize>,
}

impl CoverageKpi {
    /// Count-only view.
    pub fn summary(&self) -> CoverageSummary {
        CoverageSummary {
            requirements_total: self.total_requirements,
            requirements_covered: self.covered_requirements.len(),
            requirements_uncovered: self.uncovered_requirements.len(),
            tests_total: self.total_tests,
            tests_orphan: self.orphan_tests.len(),
            coverage_percent: self.coverage_percent,
        }
    }
}

/// Round to two decimals, ties to even, judged on the exact binary value
/// (`round2(3.125) == 3.12`, `round2(2.675) == 2.67`).
pub(crate) fn round2(value: f64) -> f64 {
    if !value.is_finite() || value.abs() >= 1e15 {
        return value;
    }
    let magnitude = value.abs();
    let scaled = magnitude * 100.0;
    let floor = scaled.floor();
    let rounded = if scaled - floor != 0.5 {
        scaled.round()
    } else {
        // The product looks like a tie; it may only be one after rounding.
        match tie_side(magnitude, floor) {
            Ordering::Less => floor,
            Ordering::Greater => floor + 1.0,
            Ordering::Equal => scaled.round_ties_even(),
        }
    };
    (rounded / 100.0).copysign(value)
}

/// Compares `100 * v` with `n + 0.5` exactly, for finite `v > 0`.
/// `Equal` also when the comparison does not fit in integers.
fn tie_side(v: f64, n: f64) -> Ordering {
    let bits = v.to_bits();
    let exp = ((bits >> 52) & 0x7ff) as i32;
    let frac = u128::from(bits & ((1_u64 << 52) - 1));
    let (mantissa, shift) = if exp == 0 {
        (frac, 1074)
    } else {
        (frac | (1 << 52), 1075 - exp)
    };
    // 100 * m * 2^-shift vs (2n + 1) / 2  <=>  200 * m vs (2n + 1) << shift
    let Ok(shift) = u32::try_from(shift) else {
        return Ordering::Equal;
    };
    let odd = 2 * (n as u128) + 1;
    match odd.checked_shl(shift).filter(|w| w >> shift == odd) {
        Some(rhs) => (200 * mantissa).cmp(&rhs),
        None => Ordering::Equal,
    }
}

/// Trimmed non-empty ids from one mapping value.
fn normalize_test_ids(requirement_id: &str, linked: &LinkedTests) -> Result<Vec<String>, KpiError> {
    let ids: Vec<&String> = match linked {
        LinkedTests::Set(set) => set.iter().collect(),
        LinkedTests::List(list) => list.iter().collect(),
        LinkedTests::Absent => return Ok(Vec::new()),
        LinkedTests::Other(kind) => {
            return Err(KpiError::InvalidLinkedTests {
                requirement_id: requirement_id.to_string(),
                kind: kind.clone(),
            });
        }
    };
    Ok(ids
        .into_iter()
        .map(|id| id.trim())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect())
}

fn sorted_unique(ids: impl IntoIterator<Item = String>) -> Vec<String> {
    ids.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

/// [`compute_coverage_kpis_with`] with no observer.
pub fn compute_coverage_kpis<S>(source: &S) -> Result<CoverageKpi, KpiError>
where
    S: CoverageSource + ?Sized,
{
    compute_coverage_kpis_with(source, &NoopObserver)
}

/// Compute coverage KPIs, reporting warnings and the summary to `observer`.
pub fn compute_coverage_kpis_with<S>(
    source: &S,
    observer: &dyn Observer,
) -> Result<CoverageKpi, KpiError>
where
    S: CoverageSource + ?Sized,
{
    let mapping = source.req_to_tests()?;

    let mut covered = Vec::new();
    let mut uncovered = Vec::new();
    let mut req_to_tests_count = BTreeMap::new();
    let mut linked_union = BTreeSet::new();
    let mut total_links = 0usize;

    for (requirement_id, linked) in &mapping {
        let ids = normalize_test_ids(requirement_id, linked)?;
        let distinct: BTreeSet<String> = ids.into_iter().collect();
        let count = distinct.len();

        req_to_tests_count.insert(requirement_id.clone(), count);
        total_links += count;
        if count > 0 {
            covered.push(requirement_id.clone());
        } else {
            uncovered.push(requirement_id.clone());
        }
        linked_union.extend(distinct);
    }

    match source.uncovered_requirements() {
        None => {}
        Some(Ok(external)) => {
            let external = sorted_unique(external.into_iter().map(|id| id.trim().to_string()));
            if external != uncovered {
                observer.event(
                    &ObserverEvent::warn(
                        "kpi.uncovered_mismatch",
                        "KPI uncovered mismatch, keeping computed baseline",
                    )
                    .with_field("computed", uncovered.join(","))
                    .with_field("source", external.join(",")),
                );
            }
        }
        Some(Err(err)) => {
            observer.event(
                &ObserverEvent::warn(
                    "kpi.uncovered_failed",
                    "uncovered_requirements() failed, keeping computed baseline",
                )
                .with_field("error", &err),
            );
        }
    }

    let orphan_tests = match source.orphan_tests() {
        Some(Ok(ids)) => sorted_unique(
            ids.into_iter()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        ),
        Some(Err(KpiError::OrphanAccessor(msg))) => return Err(KpiError::OrphanAccessor(msg)),
        Some(Err(other)) => return Err(KpiError::OrphanAccessor(other.to_string())),
        None => source
            .test_to_reqs()
            .map(|map| {
                sorted_unique(
                    map.into_iter()
                        .filter(|(_, reqs)| reqs.is_empty())
                        .map(|(id, _)| id),
                )
            })
            .unwrap_or_default(),
    };

    let total_requirements = mapping.len();
    let total_tests = linked_union
        .iter()
        .chain(orphan_tests.iter())
        .collect::<BTreeSet<_>>()
        .len();

    let (coverage_percent, avg_tests_per_requirement) = if total_requirements == 0 {
        (0.0, 0.0)
    } else {
        let total = total_requirements as f64;
        (
            round2(covered.len() as f64 / total * 100.0),
            round2(total_links as f64 / total),
        )
    };

    let kpi = CoverageKpi {
        total_requirements,
        total_tests,
        covered_requirements: covered,
        uncovered_requirements: uncovered,
        orphan_tests,
        coverage_percent,
        total_links,
        avg_tests_per_requirement,
        req_to_tests_count,
    };

    observer.event(
        &ObserverEvent::info("kpi.computed", "KPI computed")
            .with_field("requirements", kpi.total_requirements)
            .with_field("covered", kpi.covered_requirements.len())
            .with_field("uncovered", kpi.uncovered_requirements.len())
            .with_field("coverage_percent", kpi.coverage_percent)
            .with_field("tests", kpi.total_tests)
            .with_field("orphans", kpi.orphan_tests.len())
            .with_field("links", kpi.total_links),
    );

    Ok(kpi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequirementDraft, TestCaseDraft};
    use crate::observe::{EventLevel, RecordingObserver};
    use crate::traceability::build_matrix_from_testcases;
    use serde_json::json;

    struct Stub {
        mapping: BTreeMap<String, LinkedTests>,
        uncovered: Option<Result<Vec<String>, KpiError>>,
        orphans: Option<Result<Vec<String>, KpiError>>,
    }

    impl Stub {
        fn new(pairs: &[(&str, &[&str])]) -> Self {
            Self {
                mapping: pairs
                    .iter()
                    .map(|(id, tests)| {
                        (
                            (*id).to_string(),
                            LinkedTests::List(tests.iter().map(|t| (*t).to_string()).collect()),
                        )
                    })
                    .collect(),
                uncovered: None,
                orphans: None,
            }
        }
    }

    impl CoverageSource for Stub {
        fn req_to_tests(&self) -> Result<BTreeMap<String, LinkedTests>, KpiError> {
            Ok(self.mapping.clone())
        }

        fn uncovered_requirements(&self) -> Option<Result<Vec<String>, KpiError>> {
            self.uncovered.clone()
        }

        fn orphan_tests(&self) -> Option<Result<Vec<String>, KpiError>> {
            self.orphans.clone()
        }
    }

    #[test]
    fn test_round2_ties_to_even() {
        assert_eq!(round2(66.666_666), 66.67);
        assert_eq!(round2(12.5), 12.5);
        assert_eq!(round2(0.125), 0.12);
        assert_eq!(round2(3.125), 3.12);
        assert_eq!(round2(0.375), 0.38);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_round2_uses_stored_value_not_decimal_text() {
        // 2.675 and 1.005 are stored just below the midpoint.
        assert_eq!(round2(2.675), 2.67);
        assert_eq!(round2(1.005), 1.0);
        // 0.025 is stored just above it.
        assert_eq!(round2(0.025), 0.03);
        assert_eq!(round2(0.285), 0.28);
        assert_eq!(round2(-3.125), -3.12);
    }

    #[test]
    fn test_tie_rounding_in_kpis() {
        let ids: Vec<String> = (0..32).map(|i| format!("REQ-{i:02}")).collect();
        let reqs: Vec<_> = ids
            .iter()
            .map(|id| RequirementDraft::new(id.as_str(), "t", "").build().unwrap())
            .collect();
        let tests = vec![
            TestCaseDraft::new("TC-1", "t", "").with_links_raw("REQ-00").build().unwrap(),
        ];
        let kpi = compute_coverage_kpis(&build_matrix_from_testcases(&reqs, &tests)).unwrap();
        assert_eq!(kpi.coverage_percent, 3.12);

        let kpi = compute_coverage_kpis(&build_matrix_from_testcases(&reqs[..8], &tests)).unwrap();
        assert_eq!(kpi.coverage_percent, 12.5);
        assert_eq!(kpi.avg_tests_per_requirement, 0.12);
    }

    #[test]
    fn test_kpi_from_matrix() {
        let reqs: Vec<_> = ["REQ-001", "REQ-002", "REQ-003"]
            .iter()
            .map(|id| RequirementDraft::new(*id, "t", "").build().unwrap())
            .collect();
        let tests = vec![
            TestCaseDraft::new("TC-001", "t", "")
                .with_links_raw("REQ-001,REQ-002")
                .build()
                .unwrap(),
            TestCaseDraft::new("TC-002", "t", "").build().unwrap(),
        ];
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let kpi = compute_coverage_kpis(&matrix).unwrap();

        assert_eq!(kpi.total_requirements, 3);
        assert_eq!(kpi.total_tests, 2);
        assert_eq!(kpi.covered_requirements, vec!["REQ-001", "REQ-002"]);
        assert_eq!(kpi.uncovered_requirements, vec!["REQ-003"]);
        assert_eq!(kpi.orphan_tests, vec!["TC-002"]);
        assert_eq!(kpi.coverage_percent, 66.67);
        assert_eq!(kpi.total_links, 2);
        assert_eq!(kpi.avg_tests_per_requirement, 0.67);
        assert_eq!(kpi.req_to_tests_count["REQ-003"], 0);
        assert_eq!(kpi.uncovered_requirements, matrix.uncovered_requirements());
        assert_eq!(kpi.orphan_tests, matrix.orphan_tests());
    }

    #[test]
    fn test_empty_mapping_gives_zero_ratios() {
        let kpi = compute_coverage_kpis(&Stub::new(&[])).unwrap();
        assert_eq!(kpi.total_requirements, 0);
        assert_eq!(kpi.coverage_percent, 0.0);
        assert_eq!(kpi.avg_tests_per_requirement, 0.0);
    }

    #[test]
    fn test_ids_are_trimmed_and_deduplicated() {
        let kpi = compute_coverage_kpis(&Stub::new(&[("REQ-1", &[" TC-1 ", "TC-1", "", "  "])])).unwrap();
        assert_eq!(kpi.req_to_tests_count["REQ-1"], 1);
        assert_eq!(kpi.total_links, 1);
        assert_eq!(kpi.total_tests, 1);
    }

    #[test]
    fn test_uncovered_mismatch_only_warns() {
        let mut stub = Stub::new(&[("REQ-1", &["TC-1"]), ("REQ-2", &[])]);
        stub.uncovered = Some(Ok(vec!["REQ-1".into()]));
        let observer = RecordingObserver::new();

        let kpi = compute_coverage_kpis_with(&stub, &observer).unwrap();
        assert_eq!(kpi.uncovered_requirements, vec!["REQ-2"]);
        assert_eq!(observer.named("kpi.uncovered_mismatch").len(), 1);
        assert_eq!(observer.count_at(EventLevel::Warn), 1);
    }

    #[test]
    fn test_uncovered_accessor_failure_only_warns() {
        let mut stub = Stub::new(&[("REQ-1", &["TC-1"])]);
        stub.uncovered = Some(Err(KpiError::UncoveredAccessor("boom".into())));
        let observer = RecordingObserver::new();

        assert!(compute_coverage_kpis_with(&stub, &observer).is_ok());
        assert_eq!(observer.named("kpi.uncovered_failed").len(), 1);
    }

    #[test]
    fn test_orphan_accessor_failure_propagates() {
        let mut stub = Stub::new(&[("REQ-1", &["TC-1"])]);
        stub.orphans = Some(Err(KpiError::OrphanAccessor("boom".into())));
        let err = compute_coverage_kpis(&stub).unwrap_err();
        assert_eq!(err, KpiError::OrphanAccessor("boom".into()));
        assert_eq!(err.to_string(), "orphan_tests() failed: boom");
    }

    #[test]
    fn test_orphans_count_toward_total_tests() {
        let mut stub = Stub::new(&[("REQ-1", &["TC-1"])]);
        stub.orphans = Some(Ok(vec!["TC-9".into(), "TC-1".into()]));
        let kpi = compute_coverage_kpis(&stub).unwrap();
        assert_eq!(kpi.orphan_tests, vec!["TC-1", "TC-9"]);
        assert_eq!(kpi.total_tests, 2);
    }

    #[test]
    fn test_invalid_linked_tests_shape() {
        let mut stub = Stub::new(&[]);
        stub.mapping
            .insert("REQ-1".into(), LinkedTests::Other("string".into()));
        assert!(matches!(
            compute_coverage_kpis(&stub),
            Err(KpiError::InvalidLinkedTests { .. })
        ));

        let mut stub = Stub::new(&[]);
        stub.mapping.insert("REQ-1".into(), LinkedTests::Absent);
        let kpi = compute_coverage_kpis(&stub).unwrap();
        assert_eq!(kpi.uncovered_requirements, vec!["REQ-1"]);
    }

    #[test]
    fn test_json_source_shapes() {
        assert_eq!(
            compute_coverage_kpis(&JsonCoverageSource::new(Value::Null)).unwrap_err(),
            KpiError::NullInput
        );
        assert_eq!(
            compute_coverage_kpis(&JsonCoverageSource::new(json!({}))).unwrap_err(),
            KpiError::MissingMapping
        );
        assert!(matches!(
            compute_coverage_kpis(&JsonCoverageSource::new(json!({"req_to_tests": []}))),
            Err(KpiError::NotAMapping { .. })
        ));
        assert!(matches!(
            compute_coverage_kpis(&JsonCoverageSource::new(
                json!({"req_to_tests": {"REQ-1": "TC-1"}})
            )),
            Err(KpiError::InvalidLinkedTests { .. })
        ));
        assert!(matches!(
            compute_coverage_kpis(&JsonCoverageSource::new(
                json!({"req_to_tests": {"REQ-1": ["TC-1"]}, "orphan_tests": "TC-2"})
            )),
            Err(KpiError::OrphanAccessor(_))
        ));
    }

    #[test]
    fn test_json_source_infers_orphans_from_test_to_reqs() {
        let doc = json!({
            "req_to_tests": {"REQ-1": ["TC-1", 7], "REQ-2": null},
            "test_to_reqs": {"TC-1": ["REQ-1"], "TC-2": []}
        });
        let kpi = compute_coverage_kpis(&JsonCoverageSource::new(doc)).unwrap();
        assert_eq!(kpi.orphan_tests, vec!["TC-2"]);
        assert_eq!(kpi.req_to_tests_count["REQ-1"], 2);
        assert_eq!(kpi.total_tests, 3);
        assert_eq!(kpi.coverage_percent, 50.0);
    }

    #[test]
    fn test_inferred_orphans_need_an_empty_entry() {
        let doc = json!({
            "req_to_tests": {"REQ-1": ["TC-1"]},
            "test_to_reqs": {"TC-1": ["REQ-1"], "TC-2": [" "], "TC-3": [null], "TC-4": null, "TC-5": []}
        });
        let kpi = compute_coverage_kpis(&JsonCoverageSource::new(doc)).unwrap();
        assert_eq!(kpi.orphan_tests, vec!["TC-4", "TC-5"]);
    }

    #[test]
    fn test_matrix_export_roundtrips_through_json_source() {
        let reqs = vec![RequirementDraft::new("REQ-1", "t", "").build().unwrap()];
        let tests = vec![
            TestCaseDraft::new("TC-1", "t", "").with_links_raw("REQ-1").build().unwrap(),
            TestCaseDraft::new("TC-2", "t", "").build().unwrap(),
        ];
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let doc = serde_json::to_value(matrix.export()).unwrap();

        let observer = RecordingObserver::new();
        let from_json = compute_coverage_kpis_with(&JsonCoverageSource::new(doc), &observer).unwrap();
        assert_eq!(from_json, compute_coverage_kpis(&matrix).unwrap());
        assert_eq!(observer.count_at(EventLevel::Warn), 0);
    }

    #[test]
    fn test_summary() {
        let kpi = compute_coverage_kpis(&Stub::new(&[("REQ-1", &["TC-1"]), ("REQ-2", &[])])).unwrap();
        let summary = kpi.summary();
        assert_eq!(summary.requirements_total, 2);
        assert_eq!(summary.requirements_covered, 1);
        assert_eq!(summary.coverage_percent, 50.0);
    }
}
