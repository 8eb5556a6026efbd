//! Requirement ↔ test traceability matrix.
//!
//! The matrix is built once from complete collections and never mutated.
//! Links whose endpoints are not both known are kept in `links` for audit but
//! never enter the two mappings; referential checks that should *fail* belong
//! to [`crate::validators`].

use crate::models::{LinkSource, Requirement, TestCase, TraceLink, build_links_from_testcases};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Deterministic bidirectional mapping between requirements and tests.
#[derive(Debug, Clone)]
pub struct TraceabilityMatrix {
    requirements_by_id: BTreeMap<String, Requirement>,
    tests_by_id: BTreeMap<String, TestCase>,
    req_to_tests: BTreeMap<String, BTreeSet<String>>,
    test_to_reqs: BTreeMap<String, BTreeSet<String>>,
    links: Vec<TraceLink>,
    requirement_ids: Vec<String>,
    test_ids: Vec<String>,
}

impl TraceabilityMatrix {
    pub fn requirements_by_id(&self) -> &BTreeMap<String, Requirement> {
        &self.requirements_by_id
    }

    pub fn tests_by_id(&self) -> &BTreeMap<String, TestCase> {
        &self.tests_by_id
    }

    /// Every known requirement id, including those with no test.
    pub fn req_to_tests(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.req_to_tests
    }

    /// Every known test id, including orphans.
    pub fn test_to_reqs(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.test_to_reqs
    }

    /// Deduplicated links sorted by `(requirement_id, test_id, source)`.
    pub fn links(&self) -> &[TraceLink] {
        &self.links
    }

    pub fn requirement_ids(&self) -> &[String] {
        &self.requirement_ids
    }

    pub fn test_ids(&self) -> &[String] {
        &self.test_ids
    }

    /// Requirements with at least one linked test.
    pub fn covered_requirements(&self) -> BTreeSet<String> {
        self.req_to_tests
            .iter()
            .filter(|(_, tests)| !tests.is_empty())
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Requirements with no linked test, in universe order.
    pub fn uncovered_requirements(&self) -> Vec<String> {
        self.requirement_ids
            .iter()
            .filter(|id| self.req_to_tests.get(*id).is_none_or(BTreeSet::is_empty))
            .cloned()
            .collect()
    }

    /// Tests with no linked requirement, in universe order.
    pub fn orphan_tests(&self) -> Vec<String> {
        self.test_ids
            .iter()
            .filter(|id| self.test_to_reqs.get(*id).is_none_or(BTreeSet::is_empty))
            .cloned()
            .collect()
    }

    /// Whether `requirement_id` and `test_id` are linked in the mappings.
    pub fn cell(&self, requirement_id: &str, test_id: &str) -> bool {
        self.req_to_tests
            .get(requirement_id)
            .is_some_and(|tests| tests.contains(test_id))
    }

    /// Links of one provenance, in link order.
    pub fn links_by_source(&self, source: LinkSource) -> Vec<&TraceLink> {
        self.links
            .iter()
            .filter(|link| link.source() == source)
            .collect()
    }

    /// Serializable snapshot of the mappings and links.
    pub fn export(&self) -> MatrixExport {
        let flatten = |map: &BTreeMap<String, BTreeSet<String>>| {
            map.iter()
                .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
                .collect()
        };
        MatrixExport {
            requirement_ids: self.requirement_ids.clone(),
            test_ids: self.test_ids.clone(),
            req_to_tests: flatten(&self.req_to_tests),
            test_to_reqs: flatten(&self.test_to_reqs),
            uncovered_requirements: self.uncovered_requirements(),
            orphan_tests: self.orphan_tests(),
            links: self.links.clone(),
        }
    }
}

/// JSON form of a [`TraceabilityMatrix`]. Readable back by
/// [`crate::kpi::JsonCoverageSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MatrixExport {
    pub requirement_ids: Vec<String>,
    pub test_ids: Vec<String>,
    pub req_to_tests: BTreeMap<String, Vec<String>>,
    pub test_to_reqs: BTreeMap<String, Vec<String>>,
    pub uncovered_requirements: Vec<String>,
    pub orphan_tests: Vec<String>,
    pub links: Vec<TraceLink>,
}

/// Drop repeated `(requirement_id, test_id, source)` triples keeping the
/// first, then sort by the triple.
fn dedup_links(links: Vec<TraceLink>) -> Vec<TraceLink> {
    let mut seen = HashSet::new();
    let mut out: Vec<TraceLink> = links
        .into_iter()
        .filter(|link| {
            let (req, test, source) = link.key();
            seen.insert((req.to_string(), test.to_string(), source))
        })
        .collect();
    out.sort_by(|a, b| a.key().cmp(&b.key()));
    out
}

/// Build the matrix. With `links == None` the DATASET links implied by the
/// tests are used; otherwise only the given links are.
///
/// Duplicate ids are indexed last-write-wins.
pub fn build_traceability_matrix(
    requirements: &[Requirement],
    tests: &[TestCase],
    links: Option<Vec<TraceLink>>,
) -> TraceabilityMatrix {
    let requirements_by_id: BTreeMap<String, Requirement> = requirements
        .iter()
        .map(|r| (r.requirement_id().to_string(), r.clone()))
        .collect();
    let tests_by_id: BTreeMap<String, TestCase> = tests
        .iter()
        .map(|t| (t.test_id().to_string(), t.clone()))
        .collect();

    let requirement_ids: Vec<String> = requirements_by_id.keys().cloned().collect();
    let test_ids: Vec<String> = tests_by_id.keys().cloned().collect();

    let links = dedup_links(links.unwrap_or_else(|| build_links_from_testcases(tests)));

    let mut req_to_tests: BTreeMap<String, BTreeSet<String>> = requirement_ids
        .iter()
        .map(|id| (id.clone(), BTreeSet::new()))
        .collect();
    let mut test_to_reqs: BTreeMap<String, BTreeSet<String>> = test_ids
        .iter()
        .map(|id| (id.clone(), BTreeSet::new()))
        .collect();

    for link in &links {
        if !test_to_reqs.contains_key(link.test_id()) {
            continue;
        }
        let Some(tests_of_req) = req_to_tests.get_mut(link.requirement_id()) else {
            continue;
        };
        tests_of_req.insert(link.test_id().to_string());
        if let Some(reqs_of_test) = test_to_reqs.get_mut(link.test_id()) {
            reqs_of_test.insert(link.requirement_id().to_string());
        }
    }

    TraceabilityMatrix {
        requirements_by_id,
        tests_by_id,
        req_to_tests,
        test_to_reqs,
        links,
        requirement_ids,
        test_ids,
    }
}

/// Shorthand for [`build_traceability_matrix`] over DATASET links only.
pub fn build_matrix_from_testcases(
    requirements: &[Requirement],
    tests: &[TestCase],
) -> TraceabilityMatrix {
    build_traceability_matrix(requirements, tests, None)
}
