//! Prompt construction and response parsing for link suggestions.

use super::{AdvisoryError, LinkSuggestion};
use crate::models::{Requirement, TestCase};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Write as _;

/// Build the JSON-only prompt for one uncovered requirement.
pub fn build_prompt(req: &Requirement, candidates: &[&TestCase], max_suggestions: usize) -> String {
    let mut tests_lines = String::new();
    for tc in candidates {
        let _ = writeln!(
            tests_lines,
            "- {}: {} | {}",
            tc.test_id(),
            tc.title(),
            tc.description()
        );
    }
    if tests_lines.is_empty() {
        tests_lines.push_str("- (none)\n");
    }

    format!(
        r#"You are a senior V&V / Test & Requirements Traceability assistant.

TASK:
Given ONE uncovered requirement and a list of candidate test cases, propose up to {max_suggestions} test cases
that should link to this requirement.

RULES:
- Suggestion-only: do NOT claim you changed anything.
- Use only the provided candidate test IDs (do not invent IDs).
- Keep rationales short and testable.
- Output MUST be valid JSON ONLY (no markdown, no prose).

INPUT REQUIREMENT:
requirement_id: {id}
title: {title}
description: {description}
criticality: {criticality}

CANDIDATE TEST CASES:
{tests}
OUTPUT JSON SCHEMA:
{{
  "links": [
    {{
      "requirement_id": "REQ-xxx",
      "test_id": "TC-yyy",
      "rationale": "string",
      "confidence": 0.0
    }}
  ]
}}"#,
        id = req.requirement_id(),
        title = req.title(),
        description = req.description(),
        criticality = req.criticality(),
        tests = tests_lines,
    )
}

fn str_field<'a>(item: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    item.get(key).and_then(Value::as_str).map_or("", str::trim)
}

/// Parse a provider response into suggestions for `requirement_id`.
///
/// At most `max_suggestions` items are read. Items that are not objects,
/// have no `test_id`, or name a test outside `candidates` are dropped. An
/// empty `requirement_id` defaults to the current requirement. A confidence
/// that is not a number in `[0, 1]` becomes `None`.
pub fn parse_suggestions(
    text: &str,
    requirement_id: &str,
    candidates: &HashSet<&str>,
    max_suggestions: usize,
) -> Result<Vec<LinkSuggestion>, AdvisoryError> {
    let data: Value = serde_json::from_str(text.trim())
        .map_err(|e| AdvisoryError::InvalidResponse(format!("invalid JSON: {e}")))?;

    let Value::Object(root) = data else {
        return Err(AdvisoryError::InvalidResponse(
            "top-level value is not an object".to_string(),
        ));
    };

    let items = match root.get("links") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(AdvisoryError::InvalidResponse(
                "'links' is not a list".to_string(),
            ));
        }
    };

    let mut out = Vec::new();
    for item in items.iter().take(max_suggestions) {
        let Value::Object(item) = item else {
            continue;
        };
        let test_id = str_field(item, "test_id");
        if test_id.is_empty() || !candidates.contains(test_id) {
            continue;
        }
        let req_id = match str_field(item, "requirement_id") {
            "" => requirement_id,
            id => id,
        };
        let confidence = item
            .get("confidence")
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite() && (0.0..=1.0).contains(c));

        out.push(LinkSuggestion {
            requirement_id: req_id.to_string(),
            test_id: test_id.to_string(),
            rationale: str_field(item, "rationale").to_string(),
            confidence,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequirementDraft, TestCaseDraft};

    fn candidates() -> HashSet<&'static str> {
        ["TC-001", "TC-002"].into_iter().collect()
    }

    #[test]
    fn test_parse_filters_unknown_tests_and_defaults_requirement() {
        let text = r#"{"links": [
            {"requirement_id": "", "test_id": "TC-001", "rationale": " r1 ", "confidence": 0.8},
            {"requirement_id": "REQ-001", "test_id": "TC-999", "confidence": 0.9}
        ]}"#;
        let out = parse_suggestions(text, "REQ-001", &candidates(), 5).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].requirement_id, "REQ-001");
        assert_eq!(out[0].test_id, "TC-001");
        assert_eq!(out[0].rationale, "r1");
        assert_eq!(out[0].confidence, Some(0.8));
    }

    #[test]
    fn test_parse_caps_items_read() {
        let text = r#"{"links": [
            {"test_id": "TC-999"},
            {"test_id": "TC-001"},
            {"test_id": "TC-002"}
        ]}"#;
        let out = parse_suggestions(text, "REQ-1", &candidates(), 2).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].test_id, "TC-001");
    }

    #[test]
    fn test_parse_drops_bad_confidence() {
        let text = r#"{"links": [
            {"test_id": "TC-001", "confidence": 1.7},
            {"test_id": "TC-002", "confidence": "high"}
        ]}"#;
        let out = parse_suggestions(text, "REQ-1", &candidates(), 5).unwrap();
        assert!(out.iter().all(|s| s.confidence.is_none()));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_suggestions("not json", "REQ-1", &candidates(), 2).is_err());
        assert!(parse_suggestions("[1,2]", "REQ-1", &candidates(), 2).is_err());
        assert!(parse_suggestions(r#"{"links": "TC-001"}"#, "REQ-1", &candidates(), 2).is_err());
        assert!(
            parse_suggestions("{}", "REQ-1", &candidates(), 2)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_prompt_lists_candidates() {
        let req = RequirementDraft::new("REQ-001", "Brake", "Must stop")
            .with_criticality("HIGH")
            .build()
            .unwrap();
        let tc = TestCaseDraft::new("TC-001", "Brake test", "stop in 10m")
            .build()
            .unwrap();
        let prompt = build_prompt(&req, &[&tc], 2);
        assert!(prompt.contains("propose up to 2 test cases"));
        assert!(prompt.contains("requirement_id: REQ-001"));
        assert!(prompt.contains("criticality: HIGH"));
        assert!(prompt.contains("- TC-001: Brake test | stop in 10m"));

        let empty = build_prompt(&req, &[], 2);
        assert!(empty.contains("- (none)"));
    }
}
