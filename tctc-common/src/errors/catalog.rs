//! Issue catalog for dataset validation.
//!
//! Every issue the validator can emit has a stable code, a severity and a
//! list of remediation steps. Codes are serialized in SCREAMING_SNAKE_CASE so
//! report consumers can match on them directly.
//!
//! | Code                       | Severity | Raised when                                   |
//! |----------------------------|----------|-----------------------------------------------|
//! | `DUPLICATE_REQUIREMENT_ID` | Blocking | a requirement id appears more than once       |
//! | `DUPLICATE_TEST_ID`        | Blocking | a test id appears more than once              |
//! | `UNKNOWN_REQUIREMENT_LINK` | Blocking | a test links to a requirement that is missing |
//! | `ORPHAN_TEST`              | Advisory | a test links to no requirement                |
//! | `UNCOVERED_REQUIREMENT`    | Advisory | no test links to a requirement                |

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Validation issue codes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// Requirement id used by more than one row
    DuplicateRequirementId,
    /// Test id used by more than one row
    DuplicateTestId,
    /// Test case references a requirement id that does not exist
    UnknownRequirementLink,
    /// Test case linked to no requirement
    OrphanTest,
    /// Requirement linked to no test case
    UncoveredRequirement,
}

impl IssueCode {
    /// Stable wire form (e.g. `"DUPLICATE_TEST_ID"`).
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DuplicateRequirementId => "DUPLICATE_REQUIREMENT_ID",
            Self::DuplicateTestId => "DUPLICATE_TEST_ID",
            Self::UnknownRequirementLink => "UNKNOWN_REQUIREMENT_LINK",
            Self::OrphanTest => "ORPHAN_TEST",
            Self::UncoveredRequirement => "UNCOVERED_REQUIREMENT",
        }
    }

    #[must_use]
    pub const fn severity(&self) -> IssueSeverity {
        match self {
            Self::DuplicateRequirementId | Self::DuplicateTestId | Self::UnknownRequirementLink => {
                IssueSeverity::Blocking
            }
            Self::OrphanTest | Self::UncoveredRequirement => IssueSeverity::Advisory,
        }
    }

    /// Human-readable message attached to the issue.
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::DuplicateRequirementId => "Duplicate requirement_id detected.",
            Self::DuplicateTestId => "Duplicate test_id detected.",
            Self::UnknownRequirementLink => {
                "One or more tests reference unknown requirement_id(s)."
            }
            Self::OrphanTest => {
                "One or more test cases have no linked requirements (orphan tests)."
            }
            Self::UncoveredRequirement => {
                "One or more requirements are not covered by any test case."
            }
        }
    }

    #[must_use]
    pub const fn remediation(&self) -> &'static [&'static str] {
        match self {
            Self::DuplicateRequirementId => &[
                "Make every requirement_id unique in the requirements dataset",
                "Merge rows that describe the same requirement",
            ],
            Self::DuplicateTestId => &[
                "Make every test_id unique in the tests dataset",
                "Rename copied test rows before exporting",
            ],
            Self::UnknownRequirementLink => &[
                "Check the linked_requirements column for typos",
                "Add the missing requirement to the requirements dataset",
                "Remove links to retired requirements",
            ],
            Self::OrphanTest => &[
                "Link the test to the requirement(s) it verifies",
                "Retire the test if it no longer verifies anything",
            ],
            Self::UncoveredRequirement => &[
                "Add or link a test case that verifies the requirement",
                "Review advisory suggestions, if enabled",
            ],
        }
    }

    /// Full catalog entry.
    #[must_use]
    pub fn entry(&self) -> IssueEntry {
        IssueEntry {
            code: self.as_str().to_string(),
            severity: self.severity(),
            message: self.message().to_string(),
            remediation: self
                .remediation()
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// All catalogued codes, blocking first.
    #[must_use]
    pub const fn all() -> &'static [IssueCode] {
        &[
            Self::DuplicateRequirementId,
            Self::DuplicateTestId,
            Self::UnknownRequirementLink,
            Self::OrphanTest,
            Self::UncoveredRequirement,
        ]
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an issue blocks the dataset or is only reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum IssueSeverity {
    /// Fails validation (`ok == false`)
    Blocking,
    /// Reported for visibility, never fails validation
    Advisory,
}

impl IssueSeverity {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Blocking => "blocking",
            Self::Advisory => "advisory",
        }
    }
}

impl fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Complete catalog entry with all metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueEntry {
    pub code: String,
    pub severity: IssueSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

impl IssueEntry {
    /// Formats the entry with numbered remediation steps.
    #[must_use]
    pub fn format_full(&self) -> String {
        let mut output = format!("[{}] ({}) {}\n", self.code, self.severity, self.message);

        if !self.remediation.is_empty() {
            output.push_str("Remediation steps:\n");
            for (i, step) in self.remediation.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, step));
            }
        }

        output
    }

    #[must_use]
    pub fn format_brief(&self) -> String {
        format!("[{}] {}", self.code, self.message)
    }
}

impl fmt::Display for IssueEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_brief())
    }
}
