mod common;

use common::init_test_logging;
use std::fs;
use tctc_common::{
    JsonCoverageSource, NoopObserver, RecordingObserver, RunOptions, compute_coverage_kpis, run,
};
use tempfile::TempDir;

#[test]
fn test_pipeline_over_spreadsheet_exports() {
    init_test_logging();
    let dir = TempDir::new().unwrap();
    let requirements = dir.path().join("requirements.csv");
    let tests = dir.path().join("tests.csv");

    // Windows-1252, semicolons, aliased headers.
    fs::write(
        &requirements,
        b"Req_ID;Summary;Requirement_Text;Priority\r\n\
          REQ-001;Freinage;Arr\xEAt en moins de 40 m;CRITICAL\r\n\
          REQ-002;Direction;Assistance \xE0 basse vitesse;\r\n\
          REQ-003;\xC9clairage;Feux automatiques;LOW\r\n",
    )
    .unwrap();
    fs::write(
        &tests,
        "\u{feff}tc_id,title,links\n\
         TC-001,Distance de freinage,\"REQ-001, REQ-002\"\n\
         TC-002,Man\u{153}uvre,REQ-002|REQ-001\n\
         TC-003,Essai libre,\n",
    )
    .unwrap();

    let options = RunOptions::new(&requirements, &tests, dir.path().join("out"));
    let observer = RecordingObserver::new();
    let outcome = run(&options, None, &observer).unwrap();

    assert_eq!(outcome.requirements_count, 3);
    assert_eq!(outcome.tests_count, 3);
    assert_eq!(outcome.coverage_percent, 66.67);
    assert_eq!(outcome.uncovered_requirements, vec!["REQ-003"]);
    assert_eq!(outcome.orphan_tests, vec!["TC-003"]);
    assert!(outcome.validation.ok);
    assert_eq!(observer.named("load.csv_read").len(), 2);

    let html = fs::read_to_string(&outcome.artifacts.report_html).unwrap();
    assert!(html.contains("REQ-003"));

    let export: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&outcome.artifacts.matrix_json).unwrap()).unwrap();
    let kpi = compute_coverage_kpis(&JsonCoverageSource::new(export)).unwrap();
    assert_eq!(kpi.coverage_percent, outcome.coverage_percent);
    assert_eq!(kpi.uncovered_requirements, outcome.uncovered_requirements);
    assert_eq!(kpi.orphan_tests, outcome.orphan_tests);
    assert_eq!(kpi.summary(), outcome.kpi);
}

#[test]
fn test_pipeline_is_repeatable() {
    let dir = TempDir::new().unwrap();
    let requirements = dir.path().join("r.csv");
    let tests = dir.path().join("t.csv");
    fs::write(&requirements, "id,title\nREQ-1,A\nREQ-2,B\n").unwrap();
    fs::write(&tests, "id,title,requirements\nTC-1,x,REQ-2\n").unwrap();

    let options = RunOptions::new(&requirements, &tests, dir.path().join("out"));
    let first = run(&options, None, &NoopObserver).unwrap();
    let csv_first = fs::read_to_string(&first.artifacts.traceability_csv).unwrap();
    let second = run(&options, None, &NoopObserver).unwrap();
    let csv_second = fs::read_to_string(&second.artifacts.traceability_csv).unwrap();

    assert_eq!(first.kpi, second.kpi);
    assert_eq!(csv_first, csv_second);
    assert_eq!(
        csv_first,
        "requirement_id,covered,linked_test_ids\nREQ-1,NO,\nREQ-2,YES,TC-1\n"
    );
}
