//! Configuration for TCTC.
//!
//! Values are layered, lowest precedence first: built-in defaults, a TOML
//! file, `TCTC_*` environment variables, then command-line flags (applied
//! by the caller). The API key is only ever read from the environment.

pub mod env;
pub mod source;
pub mod validate;

pub use env::{EnvError, EnvParser, is_truthy};
pub use source::{ConfigSource, Sourced};
pub use validate::{ConfigWarning, Severity, validate_config};

use crate::advisory::{
    AdvisoryOptions, DEFAULT_MAX_CANDIDATE_TESTS, DEFAULT_MAX_SUGGESTIONS_PER_REQ, DEFAULT_MODEL,
    RetryPolicy, is_ai_enabled,
};
use crate::logging::{LogConfig, LogFormat};
use crate::report::DEFAULT_TITLE;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const LOCAL_CONFIG_FILE: &str = "tctc.toml";
pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/responses";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputsConfig {
    pub requirements: PathBuf,
    pub tests: PathBuf,
    /// Curated HUMAN/AI links merged with the dataset links.
    pub links: Option<PathBuf>,
}

impl Default for InputsConfig {
    fn default() -> Self {
        Self {
            requirements: PathBuf::from("data/inputs/requirements.csv"),
            tests: PathBuf::from("data/inputs/tests.csv"),
            links: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub out_dir: PathBuf,
    pub title: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            out_dir: PathBuf::from("data/outputs"),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Fail on empty datasets and on blocking validation issues.
    pub strict: bool,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvisoryConfig {
    pub enabled: bool,
    pub model: String,
    pub max_suggestions_per_req: usize,
    pub max_candidate_tests: usize,
    pub prefer_orphan_tests: bool,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub endpoint: String,
    /// Environment only.
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AdvisoryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: DEFAULT_MODEL.to_string(),
            max_suggestions_per_req: DEFAULT_MAX_SUGGESTIONS_PER_REQ,
            max_candidate_tests: DEFAULT_MAX_CANDIDATE_TESTS,
            prefer_orphan_tests: true,
            timeout_secs: 30,
            max_attempts: 3,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
        }
    }
}

impl fmt::Debug for AdvisoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdvisoryConfig")
            .field("enabled", &self.enabled)
            .field("model", &self.model)
            .field("max_suggestions_per_req", &self.max_suggestions_per_req)
            .field("max_candidate_tests", &self.max_candidate_tests)
            .field("prefer_orphan_tests", &self.prefer_orphan_tests)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_attempts", &self.max_attempts)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AdvisoryConfig {
    /// Enabled flag set and a non-empty key present.
    pub fn is_enabled(&self) -> bool {
        is_ai_enabled(self.enabled, self.api_key.as_deref())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn to_options(&self) -> AdvisoryOptions {
        AdvisoryOptions {
            max_suggestions_per_req: self.max_suggestions_per_req,
            max_candidate_tests: self.max_candidate_tests,
            prefer_orphan_tests: self.prefer_orphan_tests,
            model: self.model.clone(),
            retry: RetryPolicy {
                max_attempts: self.max_attempts.max(1),
                ..RetryPolicy::default()
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    pub format: LogFormat,
    pub file: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

impl LoggingSection {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::default()
            .with_level(self.level.clone())
            .with_format(self.format)
            .with_file(self.file.clone())
    }
}

/// Full configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TctcConfig {
    pub inputs: InputsConfig,
    pub output: OutputConfig,
    pub validation: ValidationConfig,
    pub advisory: AdvisoryConfig,
    pub logging: LoggingSection,
}

impl TctcConfig {
    /// Parse a TOML document.
    pub fn from_toml_str(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ConfigError::NotFound(path.to_path_buf()),
            _ => ConfigError::Read {
                path: path.to_path_buf(),
                source,
            },
        })?;
        Self::from_toml_str(&text, path)
    }

    /// Overlay environment variables. Returns the names of the variables
    /// that changed something; invalid values are left in `parser`.
    pub fn apply_env(&mut self, parser: &mut EnvParser) -> Vec<String> {
        let mut applied = Vec::new();
        let mut note = |sourced_var: Option<String>| {
            if let Some(var) = sourced_var {
                applied.push(var);
            }
        };

        // Legacy names first so the TCTC_ ones win.
        let legacy_ai = parser.get_legacy_flag("ENABLE_AI");
        if let Some(enabled) = legacy_ai.value {
            self.advisory.enabled = enabled;
            note(legacy_ai.env_var);
        }
        let legacy_model = parser.get_legacy_string("OPENAI_MODEL");
        if let Some(model) = legacy_model.value {
            self.advisory.model = model;
            note(legacy_model.env_var);
        }
        let legacy_out = parser.get_legacy_string("OUTPUT_DIR");
        if let Some(dir) = legacy_out.value {
            self.output.out_dir = PathBuf::from(dir);
            note(legacy_out.env_var);
        }
        let key = parser.get_legacy_string("OPENAI_API_KEY");
        if key.value.is_some() {
            self.advisory.api_key = key.value;
            note(key.env_var);
        }

        let v = parser.get_path("REQUIREMENTS", self.inputs.requirements.clone());
        self.inputs.requirements = v.value;
        note(v.env_var);
        let v = parser.get_path("TESTS", self.inputs.tests.clone());
        self.inputs.tests = v.value;
        note(v.env_var);
        let v = parser.get_optional_path("LINKS");
        if v.is_from_env() {
            self.inputs.links = v.value;
            note(v.env_var);
        }
        let v = parser.get_path("OUT_DIR", self.output.out_dir.clone());
        self.output.out_dir = v.value;
        note(v.env_var);
        let v = parser.get_string("TITLE", &self.output.title);
        self.output.title = v.value;
        note(v.env_var);

        let v = parser.get_bool("STRICT", self.validation.strict);
        self.validation.strict = v.value;
        note(v.env_var);

        let adv = &mut self.advisory;
        let v = parser.get_bool("AI_ENABLED", adv.enabled);
        adv.enabled = v.value;
        note(v.env_var);
        let v = parser.get_string("AI_MODEL", &adv.model);
        adv.model = v.value;
        note(v.env_var);
        let v = parser.get_usize_range("AI_MAX_SUGGESTIONS", adv.max_suggestions_per_req, 0, 50);
        adv.max_suggestions_per_req = v.value;
        note(v.env_var);
        let v = parser.get_usize_range("AI_MAX_CANDIDATES", adv.max_candidate_tests, 0, 1000);
        adv.max_candidate_tests = v.value;
        note(v.env_var);
        let v = parser.get_bool("AI_PREFER_ORPHANS", adv.prefer_orphan_tests);
        adv.prefer_orphan_tests = v.value;
        note(v.env_var);
        let v = parser.get_u64_range("AI_TIMEOUT_SECS", adv.timeout_secs, 0, 600);
        adv.timeout_secs = v.value;
        note(v.env_var);
        let v = parser.get_u32_range("AI_MAX_ATTEMPTS", adv.max_attempts, 1, 10);
        adv.max_attempts = v.value;
        note(v.env_var);
        let v = parser.get_string("AI_ENDPOINT", &adv.endpoint);
        adv.endpoint = v.value;
        note(v.env_var);

        let log = &mut self.logging;
        let v = parser.get_log_level("LOG_LEVEL", &log.level);
        log.level = v.value;
        note(v.env_var);
        let v = parser.get_string("LOG_FORMAT", &log.format.to_string());
        if let Some(var) = v.env_var {
            match v.value.parse() {
                Ok(format) => {
                    log.format = format;
                    note(Some(var));
                }
                Err(_) => parser.push_error(EnvError::InvalidValue {
                    var,
                    expected: "pretty, compact or json".to_string(),
                    value: v.value,
                }),
            }
        }
        let v = parser.get_optional_path("LOG_FILE");
        if v.is_from_env() {
            log.file = v.value;
            note(v.env_var);
        }

        applied
    }
}

/// Default user-level config file: `<config_dir>/tctc/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tctc").join("config.toml"))
}

/// Config file to read: the explicit path, else `./tctc.toml`, else the
/// user-level file, whichever exists first.
pub fn discover_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG_FILE);
    if local.is_file() {
        return Some(local);
    }
    user_config_path().filter(|p| p.is_file())
}

/// Result of [`load_config`].
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: TctcConfig,
    /// File that was read, if any.
    pub file: Option<PathBuf>,
    /// Invalid environment values, reported but not fatal.
    pub env_errors: Vec<EnvError>,
    /// Environment variables that overrode something.
    pub env_overrides: Vec<String>,
}

/// Defaults, then the discovered TOML file, then the environment.
/// An explicit path that does not exist is an error; a missing implicit
/// file is not.
pub fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, ConfigError> {
    let file = discover_config_file(explicit);
    let mut config = match &file {
        Some(path) => TctcConfig::from_file(path)?,
        None => TctcConfig::default(),
    };

    let mut parser = EnvParser::new();
    let env_overrides = config.apply_env(&mut parser);
    Ok(LoadedConfig {
        config,
        file,
        env_errors: parser.take_errors(),
        env_overrides,
    })
}

#[cfg(test)]
pub(crate) fn env_test_lock() -> std::sync::MutexGuard<'static, ()> {
    use std::sync::{Mutex, OnceLock};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
