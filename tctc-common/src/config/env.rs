//! `TCTC_*` environment overrides.
//!
//! Bad values never abort a run: the parser falls back to the default,
//! remembers what went wrong and lets the caller report it once. A few
//! unprefixed names from older deployments are still read
//! (`ENABLE_AI`, `OPENAI_API_KEY`, `OPENAI_MODEL`, `OUTPUT_DIR`).

use super::source::Sourced;
use std::env;
use std::path::PathBuf;
use thiserror::Error;

const PREFIX: &str = "TCTC_";
const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "off"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("{var}={value:?} is not a valid {expected}")]
    InvalidValue {
        var: String,
        expected: String,
        value: String,
    },

    #[error("{var}={value} is outside {min}..={max}")]
    OutOfRange {
        var: String,
        value: u64,
        min: u64,
        max: u64,
    },

    #[error("{var}={value:?} is not a log level (expected one of {})", LOG_LEVELS.join(", "))]
    InvalidLogLevel { var: String, value: String },
}

/// Truthy spellings accepted for flags: 1, true, yes, y, on.
pub fn is_truthy(value: &str) -> bool {
    parse_bool(value) == Some(true)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" | "" => Some(false),
        _ => None,
    }
}

/// Reads overrides and accumulates the [`EnvError`]s it meets.
#[derive(Debug, Default)]
pub struct EnvParser {
    errors: Vec<EnvError>,
}

impl EnvParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> &[EnvError] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn take_errors(&mut self) -> Vec<EnvError> {
        std::mem::take(&mut self.errors)
    }

    /// For values the caller interprets itself (log format, for one).
    pub fn push_error(&mut self, error: EnvError) {
        self.errors.push(error);
    }

    /// `(full variable name, raw value)` when `TCTC_<name>` is set.
    fn lookup(name: &str) -> Option<(String, String)> {
        let var = format!("{PREFIX}{name}");
        env::var(&var).ok().map(|value| (var, value))
    }

    pub fn get_string(&mut self, name: &str, default: &str) -> Sourced<String> {
        Self::lookup(name).map_or_else(
            || Sourced::default_value(default.to_string()),
            |(var, value)| Sourced::from_env(value, var),
        )
    }

    /// Flag override. Blank counts as false; anything unrecognised keeps
    /// `default` and records an error.
    pub fn get_bool(&mut self, name: &str, default: bool) -> Sourced<bool> {
        let Some((var, raw)) = Self::lookup(name) else {
            return Sourced::default_value(default);
        };
        let value = parse_bool(&raw).unwrap_or_else(|| {
            self.errors.push(EnvError::InvalidValue {
                var: var.clone(),
                expected: "boolean (1/0, true/false, yes/no, on/off)".to_string(),
                value: raw,
            });
            default
        });
        Sourced::from_env(value, var)
    }

    pub fn get_u32_range(&mut self, name: &str, default: u32, min: u32, max: u32) -> Sourced<u32> {
        self.get_u64_range(name, default.into(), min.into(), max.into())
            .map(|v| u32::try_from(v).unwrap_or(default))
    }

    pub fn get_usize_range(
        &mut self,
        name: &str,
        default: usize,
        min: usize,
        max: usize,
    ) -> Sourced<usize> {
        self.get_u64_range(name, default as u64, min as u64, max as u64)
            .map(|v| usize::try_from(v).unwrap_or(default))
    }

    /// Unsigned override bounded to `min..=max`. A number out of range
    /// still counts as an env override (with the default value) so the
    /// operator sees which variable was ignored.
    pub fn get_u64_range(&mut self, name: &str, default: u64, min: u64, max: u64) -> Sourced<u64> {
        let Some((var, raw)) = Self::lookup(name) else {
            return Sourced::default_value(default);
        };
        match raw.trim().parse::<u64>() {
            Ok(n) if (min..=max).contains(&n) => Sourced::from_env(n, var),
            Ok(n) => {
                self.errors.push(EnvError::OutOfRange {
                    var: var.clone(),
                    value: n,
                    min,
                    max,
                });
                Sourced::from_env(default, var)
            }
            Err(_) => {
                self.errors.push(EnvError::InvalidValue {
                    var,
                    expected: "unsigned integer".to_string(),
                    value: raw,
                });
                Sourced::default_value(default)
            }
        }
    }

    /// Path override with `~/` expansion. Blank keeps the default.
    pub fn get_path(&mut self, name: &str, default: PathBuf) -> Sourced<PathBuf> {
        match Self::lookup(name) {
            Some((var, raw)) if !raw.trim().is_empty() => Sourced::from_env(expand_home(&raw), var),
            _ => Sourced::default_value(default),
        }
    }

    pub fn get_optional_path(&mut self, name: &str) -> Sourced<Option<PathBuf>> {
        self.get_optional_string(name)
            .map(|value| value.map(|v| expand_home(&v)))
    }

    /// Lower-cased level name; an unknown level keeps `default`.
    pub fn get_log_level(&mut self, name: &str, default: &str) -> Sourced<String> {
        let Some((var, raw)) = Self::lookup(name) else {
            return Sourced::default_value(default.to_string());
        };
        let level = raw.trim().to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Sourced::from_env(level, var)
        } else {
            self.errors.push(EnvError::InvalidLogLevel {
                var: var.clone(),
                value: raw,
            });
            Sourced::from_env(default.to_string(), var)
        }
    }

    /// Set but blank is an env override to `None`.
    pub fn get_optional_string(&mut self, name: &str) -> Sourced<Option<String>> {
        match Self::lookup(name) {
            Some((var, raw)) => {
                let value = (!raw.trim().is_empty()).then_some(raw);
                Sourced::from_env(value, var)
            }
            None => Sourced::default_value(None),
        }
    }

    /// Unprefixed legacy variable, trimmed. Unset or blank gives `None`.
    pub fn get_legacy_string(&mut self, var: &str) -> Sourced<Option<String>> {
        env::var(var)
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|v| !v.is_empty())
            .map_or_else(
                || Sourced::default_value(None),
                |v| Sourced::from_env(Some(v), var),
            )
    }

    /// Unprefixed legacy flag. Anything not truthy is false; never an error.
    pub fn get_legacy_flag(&mut self, var: &str) -> Sourced<Option<bool>> {
        env::var(var).ok().map_or_else(
            || Sourced::default_value(None),
            |raw| Sourced::from_env(Some(is_truthy(&raw)), var),
        )
    }
}

fn expand_home(value: &str) -> PathBuf {
    match value.strip_prefix("~/").zip(dirs::home_dir()) {
        Some((rest, home)) => home.join(rest),
        None => PathBuf::from(value),
    }
}
