#![allow(dead_code)]

use tctc_common::{Requirement, RequirementDraft, TestCase, TestCaseDraft};

pub use tctc_common::testing::init_test_logging;

pub fn req(id: &str) -> Requirement {
    RequirementDraft::new(id, format!("Requirement {id}"), "")
        .build()
        .expect("valid requirement")
}

pub fn tc(id: &str, links: &str) -> TestCase {
    TestCaseDraft::new(id, format!("Test {id}"), "")
        .with_links_raw(links)
        .build()
        .expect("valid test case")
}

pub fn reqs(ids: &[&str]) -> Vec<Requirement> {
    ids.iter().map(|id| req(id)).collect()
}
