mod common;

use common::{reqs, tc};
use proptest::prelude::*;
use tctc_common::{build_matrix_from_testcases, compute_coverage_kpis, parse_requirement_ids};

fn id_token() -> impl Strategy<Value = String> {
    prop_oneof![
        "REQ-[0-9]{1,3}",
        "[A-Z]{2,4}_[a-z0-9]{1,4}",
        Just(String::new()),
        Just("  ".to_string()),
    ]
}

fn delimiter() -> impl Strategy<Value = &'static str> {
    prop_oneof![Just(","), Just(";"), Just("|"), Just(" , "), Just(" | ")]
}

fn raw_field() -> impl Strategy<Value = String> {
    prop::collection::vec((id_token(), delimiter()), 0..12).prop_map(|parts| {
        parts
            .into_iter()
            .map(|(token, delim)| format!("{token}{delim}"))
            .collect()
    })
}

/// `round(100 * k / n, 2)` in hundredths, ties to even, in exact integers.
/// For `n < 40` every tie of `k / n` is exactly representable, so this is
/// also what rounding the stored quotient gives.
fn expected_percent(k: usize, n: usize) -> f64 {
    let scaled = 10_000 * k;
    let (q, r) = (scaled / n, scaled % n);
    let hundredths = match (2 * r).cmp(&n) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + q % 2,
    };
    hundredths as f64 / 100.0
}

#[test]
fn test_coverage_rounding_pinned() {
    for (k, n, percent) in [(1, 32, 3.12), (3, 32, 9.38), (2, 3, 66.67), (1, 8, 12.5), (0, 5, 0.0)] {
        assert_eq!(expected_percent(k, n), percent, "reference k={k} n={n}");
        let ids: Vec<String> = (0..n).map(|i| format!("REQ-{i:03}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let tests: Vec<_> = ids
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, id)| tc(&format!("TC-{i:03}"), id))
            .collect();
        let kpi = compute_coverage_kpis(&build_matrix_from_testcases(&reqs(&id_refs), &tests)).unwrap();
        assert_eq!(kpi.coverage_percent, percent, "k={k} n={n}");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn test_parse_is_idempotent(raw in raw_field()) {
        let once = parse_requirement_ids(&raw);
        let twice = parse_requirement_ids(&once.join(","));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn test_parse_ignores_delimiter_choice(
        tokens in prop::collection::vec(id_token(), 0..10),
        delims in prop::collection::vec(delimiter(), 10),
    ) {
        let with_commas = tokens.join(",");
        let mixed: String = tokens
            .iter()
            .zip(delims.iter().cycle())
            .map(|(t, d)| format!("{t}{d}"))
            .collect();
        prop_assert_eq!(parse_requirement_ids(&with_commas), parse_requirement_ids(&mixed));
    }

    #[test]
    fn test_parse_output_is_distinct_and_trimmed(raw in ".{0,80}") {
        let ids = parse_requirement_ids(&raw);
        let mut seen = std::collections::HashSet::new();
        for id in &ids {
            prop_assert!(!id.is_empty());
            prop_assert_eq!(id.trim(), id.as_str());
            prop_assert!(!id.contains([',', ';', '|']));
            prop_assert!(seen.insert(id.clone()), "duplicate {}", id);
        }
    }

    #[test]
    fn test_coverage_arithmetic(n in 1usize..40, k_ratio in 0.0f64..=1.0) {
        let k = ((n as f64) * k_ratio).floor() as usize;
        let ids: Vec<String> = (0..n).map(|i| format!("REQ-{i:03}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let requirements = reqs(&id_refs);
        let tests: Vec<_> = ids
            .iter()
            .take(k)
            .enumerate()
            .map(|(i, id)| tc(&format!("TC-{i:03}"), id))
            .collect();

        let kpi = compute_coverage_kpis(&build_matrix_from_testcases(&requirements, &tests)).unwrap();
        prop_assert_eq!(kpi.coverage_percent, expected_percent(k, n));
        prop_assert_eq!(kpi.covered_requirements.len(), k);
        prop_assert_eq!(kpi.uncovered_requirements.len(), n - k);
    }

    #[test]
    fn test_empty_universe_has_zero_coverage(raws in prop::collection::vec(raw_field(), 0..6)) {
        let tests: Vec<_> = raws
            .iter()
            .enumerate()
            .map(|(i, raw)| tc(&format!("TC-{i}"), raw))
            .collect();
        let kpi = compute_coverage_kpis(&build_matrix_from_testcases(&[], &tests)).unwrap();
        prop_assert_eq!(kpi.total_requirements, 0);
        prop_assert_eq!(kpi.coverage_percent, 0.0);
        prop_assert_eq!(kpi.avg_tests_per_requirement, 0.0);
    }

    #[test]
    fn test_kpi_matches_matrix_views(
        req_count in 0usize..12,
        links in prop::collection::vec(prop::collection::vec(0usize..15, 0..4), 0..10),
    ) {
        let ids: Vec<String> = (0..req_count).map(|i| format!("REQ-{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let requirements = reqs(&id_refs);
        // Indices past req_count produce dangling links.
        let tests: Vec<_> = links
            .iter()
            .enumerate()
            .map(|(i, targets)| {
                let raw = targets
                    .iter()
                    .map(|t| format!("REQ-{t}"))
                    .collect::<Vec<_>>()
                    .join("|");
                tc(&format!("TC-{i:02}"), &raw)
            })
            .collect();

        let matrix = build_matrix_from_testcases(&requirements, &tests);
        let kpi = compute_coverage_kpis(&matrix).unwrap();

        let mut uncovered = matrix.uncovered_requirements();
        uncovered.sort();
        let mut orphans = matrix.orphan_tests();
        orphans.sort();
        prop_assert_eq!(&kpi.uncovered_requirements, &uncovered);
        prop_assert_eq!(&kpi.orphan_tests, &orphans);
        prop_assert_eq!(
            kpi.covered_requirements.len() + kpi.uncovered_requirements.len(),
            kpi.total_requirements
        );
    }
}
