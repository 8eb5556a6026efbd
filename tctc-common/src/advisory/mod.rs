//! Advisory link suggestions.
//!
//! For each uncovered requirement, an [`AdvisoryProvider`] is asked to pick
//! matching tests among a bounded candidate list. Suggestions are AI-sourced
//! and never authoritative: the gate only reads the matrix, and the caller
//! decides what to do with the result.
//!
//! The gate never fails. Provider errors are retried per [`RetryPolicy`] and
//! then skipped for that requirement; malformed responses are skipped too.

pub mod response;
pub mod retry;

pub use response::{build_prompt, parse_suggestions};
pub use retry::{RetryPolicy, RetryableError, run_with_retry};

use crate::models::{
    LinkSource, ModelError, Requirement, TestCase, TraceLink, TraceLinkDraft,
};
use crate::observe::{NoopObserver, Observer, ObserverEvent};
use crate::traceability::TraceabilityMatrix;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_MAX_SUGGESTIONS_PER_REQ: usize = 2;
pub const DEFAULT_MAX_CANDIDATE_TESTS: usize = 25;

/// Provider failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvisoryError {
    #[error("advisory provider is disabled")]
    Disabled,

    #[error("advisory provider is not configured: {0}")]
    NotConfigured(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl RetryableError for AdvisoryError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || (500..600).contains(status),
            Self::Disabled | Self::NotConfigured(_) | Self::InvalidResponse(_) => false,
        }
    }
}

/// One call to the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvisoryRequest {
    pub requirement_id: String,
    pub model: String,
    pub prompt: String,
    pub candidate_test_ids: Vec<String>,
}

/// Backend that turns a prompt into raw model text.
pub trait AdvisoryProvider {
    fn suggest(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError>;
}

/// A proposed requirement → test link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct LinkSuggestion {
    pub requirement_id: String,
    pub test_id: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl LinkSuggestion {
    /// `AI`-sourced link carrying the suggestion's confidence and rationale.
    pub fn to_trace_link(&self) -> Result<TraceLink, ModelError> {
        TraceLinkDraft {
            requirement_id: self.requirement_id.clone(),
            test_id: self.test_id.clone(),
            source: LinkSource::Ai.as_str().to_string(),
            confidence: self.confidence,
            rationale: self.rationale.clone(),
        }
        .build()
    }
}

/// Whether advisory suggestions may run: the flag is on and a key is set.
pub fn is_ai_enabled(enabled: bool, api_key: Option<&str>) -> bool {
    enabled && api_key.is_some_and(|key| !key.trim().is_empty())
}

/// Tuning for [`AdvisoryGate`].
#[derive(Debug, Clone, PartialEq)]
pub struct AdvisoryOptions {
    pub max_suggestions_per_req: usize,
    pub max_candidate_tests: usize,
    pub prefer_orphan_tests: bool,
    pub model: String,
    pub retry: RetryPolicy,
}

impl Default for AdvisoryOptions {
    fn default() -> Self {
        Self {
            max_suggestions_per_req: DEFAULT_MAX_SUGGESTIONS_PER_REQ,
            max_candidate_tests: DEFAULT_MAX_CANDIDATE_TESTS,
            prefer_orphan_tests: true,
            model: DEFAULT_MODEL.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Asks a provider for links that would cover uncovered requirements.
pub struct AdvisoryGate<'a> {
    provider: &'a dyn AdvisoryProvider,
    options: AdvisoryOptions,
    observer: &'a dyn Observer,
}

impl<'a> AdvisoryGate<'a> {
    pub fn new(provider: &'a dyn AdvisoryProvider, options: AdvisoryOptions) -> Self {
        Self {
            provider,
            options,
            observer: &NoopObserver,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: &'a dyn Observer) -> Self {
        self.observer = observer;
        self
    }

    pub fn options(&self) -> &AdvisoryOptions {
        &self.options
    }

    /// Candidate tests: orphans first when preferred and present, otherwise
    /// every test; sorted by id and capped.
    pub fn candidate_tests<'t>(
        &self,
        tests: &'t [TestCase],
        matrix: &TraceabilityMatrix,
    ) -> Vec<&'t TestCase> {
        let mut sorted: Vec<&TestCase> = tests.iter().collect();
        sorted.sort_by(|a, b| a.test_id().cmp(b.test_id()));

        if self.options.prefer_orphan_tests {
            let orphan_ids: HashSet<String> = matrix.orphan_tests().into_iter().collect();
            let orphans: Vec<&TestCase> = sorted
                .iter()
                .copied()
                .filter(|tc| orphan_ids.contains(tc.test_id()))
                .collect();
            if !orphans.is_empty() {
                return orphans
                    .into_iter()
                    .take(self.options.max_candidate_tests)
                    .collect();
            }
        }

        sorted
            .into_iter()
            .take(self.options.max_candidate_tests)
            .collect()
    }

    /// Suggestions for every uncovered requirement. Never fails.
    pub fn suggest_missing_links(
        &self,
        requirements: &[Requirement],
        tests: &[TestCase],
        matrix: &TraceabilityMatrix,
    ) -> Vec<LinkSuggestion> {
        let mut uncovered = matrix.uncovered_requirements();
        uncovered.sort();
        if uncovered.is_empty() {
            return Vec::new();
        }

        let by_id: BTreeMap<&str, &Requirement> = requirements
            .iter()
            .map(|r| (r.requirement_id(), r))
            .collect();
        let candidates = self.candidate_tests(tests, matrix);
        let candidate_ids: HashSet<&str> = candidates.iter().map(|tc| tc.test_id()).collect();

        let mut suggestions = Vec::new();
        for req_id in &uncovered {
            let Some(req) = by_id.get(req_id.as_str()) else {
                self.observer.event(
                    &ObserverEvent::debug(
                        "advisory.requirement_missing",
                        "Uncovered requirement id not found in provided requirements",
                    )
                    .with_field("requirement_id", req_id),
                );
                continue;
            };

            let request = AdvisoryRequest {
                requirement_id: req_id.clone(),
                model: self.options.model.clone(),
                prompt: build_prompt(req, &candidates, self.options.max_suggestions_per_req),
                candidate_test_ids: candidates.iter().map(|tc| tc.test_id().to_string()).collect(),
            };

            let text = match run_with_retry(req_id, &self.options.retry, self.observer, |_| {
                self.provider.suggest(&request)
            }) {
                Ok(text) => text,
                Err(err) => {
                    self.observer.event(
                        &ObserverEvent::warn("advisory.call_failed", "AI call failed, skipping requirement")
                            .with_field("requirement_id", req_id)
                            .with_field("error", &err),
                    );
                    continue;
                }
            };

            match parse_suggestions(
                &text,
                req_id,
                &candidate_ids,
                self.options.max_suggestions_per_req,
            ) {
                Ok(found) => suggestions.extend(found),
                Err(err) => {
                    self.observer.event(
                        &ObserverEvent::warn(
                            "advisory.invalid_response",
                            "AI returned an unusable response, skipping requirement",
                        )
                        .with_field("requirement_id", req_id)
                        .with_field("error", &err),
                    );
                }
            }
        }

        self.observer.event(
            &ObserverEvent::info("advisory.completed", "Advisory suggestions collected")
                .with_field("uncovered", uncovered.len())
                .with_field("candidates", candidates.len())
                .with_field("suggestions", suggestions.len()),
        );
        suggestions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequirementDraft, TestCaseDraft};
    use crate::observe::RecordingObserver;
    use crate::traceability::build_matrix_from_testcases;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    /// Replays canned responses and records every request.
    struct ScriptedProvider {
        replies: RefCell<VecDeque<Result<String, AdvisoryError>>>,
        seen: RefCell<Vec<AdvisoryRequest>>,
    }

    impl ScriptedProvider {
        fn new(replies: Vec<Result<String, AdvisoryError>>) -> Self {
            Self {
                replies: RefCell::new(replies.into()),
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl AdvisoryProvider for ScriptedProvider {
        fn suggest(&self, request: &AdvisoryRequest) -> Result<String, AdvisoryError> {
            self.seen.borrow_mut().push(request.clone());
            self.replies
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(r#"{"links": []}"#.to_string()))
        }
    }

    fn fast_options() -> AdvisoryOptions {
        AdvisoryOptions {
            retry: RetryPolicy {
                max_attempts: 2,
                base_delay: std::time::Duration::ZERO,
                max_delay: std::time::Duration::ZERO,
                jitter: 0.0,
            },
            ..AdvisoryOptions::default()
        }
    }

    fn fixture() -> (Vec<Requirement>, Vec<TestCase>) {
        let reqs = vec![
            RequirementDraft::new("REQ-001", "a", "").build().unwrap(),
            RequirementDraft::new("REQ-002", "b", "").build().unwrap(),
        ];
        let tests = vec![
            TestCaseDraft::new("TC-002", "orphan", "").build().unwrap(),
            TestCaseDraft::new("TC-001", "linked", "")
                .with_links_raw("REQ-001")
                .build()
                .unwrap(),
        ];
        (reqs, tests)
    }

    #[test]
    fn test_is_ai_enabled() {
        assert!(is_ai_enabled(true, Some("sk-x")));
        assert!(!is_ai_enabled(true, Some("  ")));
        assert!(!is_ai_enabled(true, None));
        assert!(!is_ai_enabled(false, Some("sk-x")));
    }

    #[test]
    fn test_error_retry_classification() {
        assert!(AdvisoryError::Timeout.is_retryable());
        assert!(AdvisoryError::Transport("reset".into()).is_retryable());
        assert!(
            AdvisoryError::Status {
                status: 429,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            AdvisoryError::Status {
                status: 503,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(
            !AdvisoryError::Status {
                status: 401,
                message: String::new()
            }
            .is_retryable()
        );
        assert!(!AdvisoryError::InvalidResponse("x".into()).is_retryable());
    }

    #[test]
    fn test_candidates_prefer_orphans() {
        let (reqs, tests) = fixture();
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let provider = ScriptedProvider::new(Vec::new());

        let gate = AdvisoryGate::new(&provider, fast_options());
        let ids: Vec<_> = gate
            .candidate_tests(&tests, &matrix)
            .iter()
            .map(|tc| tc.test_id())
            .collect();
        assert_eq!(ids, vec!["TC-002"]);

        let gate = AdvisoryGate::new(
            &provider,
            AdvisoryOptions {
                prefer_orphan_tests: false,
                max_candidate_tests: 1,
                ..fast_options()
            },
        );
        let ids: Vec<_> = gate
            .candidate_tests(&tests, &matrix)
            .iter()
            .map(|tc| tc.test_id())
            .collect();
        assert_eq!(ids, vec!["TC-001"]);
    }

    #[test]
    fn test_suggest_missing_links_happy_path() {
        let (reqs, tests) = fixture();
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let provider = ScriptedProvider::new(vec![Ok(r#"{"links": [
            {"requirement_id": "REQ-002", "test_id": "TC-002", "rationale": "same topic", "confidence": 0.7},
            {"requirement_id": "REQ-002", "test_id": "TC-001"}
        ]}"#
        .to_string())]);

        let suggestions =
            AdvisoryGate::new(&provider, fast_options()).suggest_missing_links(&reqs, &tests, &matrix);

        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].test_id, "TC-002");
        let seen = provider.seen.borrow();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].requirement_id, "REQ-002");
        assert_eq!(seen[0].model, DEFAULT_MODEL);
        assert_eq!(seen[0].candidate_test_ids, vec!["TC-002"]);

        let link = suggestions[0].to_trace_link().unwrap();
        assert_eq!(link.source(), LinkSource::Ai);
        assert_eq!(link.confidence(), Some(0.7));
        assert!(!matrix.cell("REQ-002", "TC-002"));
    }

    #[test]
    fn test_retryable_failure_then_success() {
        let (reqs, tests) = fixture();
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let provider = ScriptedProvider::new(vec![
            Err(AdvisoryError::Timeout),
            Ok(r#"{"links": [{"test_id": "TC-002"}]}"#.to_string()),
        ]);
        let suggestions =
            AdvisoryGate::new(&provider, fast_options()).suggest_missing_links(&reqs, &tests, &matrix);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].requirement_id, "REQ-002");
        assert_eq!(provider.seen.borrow().len(), 2);
    }

    #[test]
    fn test_failures_are_swallowed() {
        let (reqs, tests) = fixture();
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let observer = RecordingObserver::new();

        let provider = ScriptedProvider::new(vec![Err(AdvisoryError::Status {
            status: 401,
            message: "unauthorized".into(),
        })]);
        let out = AdvisoryGate::new(&provider, fast_options())
            .with_observer(&observer)
            .suggest_missing_links(&reqs, &tests, &matrix);
        assert!(out.is_empty());
        assert_eq!(observer.named("advisory.call_failed").len(), 1);

        let provider = ScriptedProvider::new(vec![Ok("sorry, no JSON".to_string())]);
        let out = AdvisoryGate::new(&provider, fast_options())
            .with_observer(&observer)
            .suggest_missing_links(&reqs, &tests, &matrix);
        assert!(out.is_empty());
        assert_eq!(observer.named("advisory.invalid_response").len(), 1);
    }

    #[test]
    fn test_no_uncovered_means_no_calls() {
        let reqs = vec![RequirementDraft::new("REQ-001", "a", "").build().unwrap()];
        let tests = vec![
            TestCaseDraft::new("TC-001", "t", "")
                .with_links_raw("REQ-001")
                .build()
                .unwrap(),
        ];
        let matrix = build_matrix_from_testcases(&reqs, &tests);
        let provider = ScriptedProvider::new(Vec::new());
        let out = AdvisoryGate::new(&provider, fast_options()).suggest_missing_links(&reqs, &tests, &matrix);
        assert!(out.is_empty());
        assert!(provider.seen.borrow().is_empty());
    }
}
