//! Startup checks on a loaded configuration.
//!
//! Nothing here is fatal. Warnings are logged by the CLI before a run.

use super::TctcConfig;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigWarning {
    pub severity: Severity,
    /// Dotted path of the offending field, e.g. `advisory.max_candidate_tests`.
    pub field: String,
    pub message: String,
}

impl ConfigWarning {
    fn new(severity: Severity, field: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.field, self.message)
    }
}

pub fn validate_config(config: &TctcConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.inputs.requirements == config.inputs.tests {
        warnings.push(ConfigWarning::new(
            Severity::Error,
            "inputs.tests",
            format!(
                "requirements and tests point to the same file: {}",
                config.inputs.tests.display()
            ),
        ));
    }
    if config.output.out_dir.as_os_str().is_empty() {
        warnings.push(ConfigWarning::new(
            Severity::Error,
            "output.out_dir",
            "output directory is empty",
        ));
    }

    let adv = &config.advisory;
    if adv.enabled {
        if !adv.is_enabled() {
            warnings.push(ConfigWarning::new(
                Severity::Warning,
                "advisory.enabled",
                "advisory is enabled but OPENAI_API_KEY is not set; suggestions will be skipped",
            ));
        }
        if adv.max_candidate_tests == 0 {
            warnings.push(ConfigWarning::new(
                Severity::Warning,
                "advisory.max_candidate_tests",
                "no candidate tests will be offered; every suggestion will be rejected",
            ));
        }
        if adv.max_suggestions_per_req == 0 {
            warnings.push(ConfigWarning::new(
                Severity::Warning,
                "advisory.max_suggestions_per_req",
                "zero suggestions per requirement disables the advisory step in practice",
            ));
        }
        if adv.timeout_secs == 0 {
            warnings.push(ConfigWarning::new(
                Severity::Warning,
                "advisory.timeout_secs",
                "a zero timeout makes every provider call fail",
            ));
        }
    }

    warnings
}
