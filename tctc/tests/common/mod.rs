#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const REQUIREMENTS_CSV: &str = "\
requirement_id;title;description;criticality
REQ-001;Braking;The vehicle shall stop within 40 m at 100 km/h;CRITICAL
REQ-002;Steering;Steering assist shall engage below 10 km/h;HIGH
";

pub const TESTS_CSV: &str = "\
test_id;title;description;linked_requirements
TC-001;Brake distance;Measure stopping distance;REQ-001
TC-002;Parking manoeuvre;Low speed steering;
";

pub const TESTS_WITH_UNKNOWN_CSV: &str = "\
test_id;title;linked_requirements
TC-001;Brake distance;REQ-001|REQ-404
";

/// A scratch project: datasets, an empty config file and an output dir.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new(requirements: &str, tests: &str) -> Self {
        let dir = TempDir::new().expect("create temp dir");
        fs::write(dir.path().join("requirements.csv"), requirements).expect("write requirements");
        fs::write(dir.path().join("tests.csv"), tests).expect("write tests");
        fs::write(dir.path().join("tctc.toml"), "").expect("write config");
        Self { dir }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn out_dir(&self) -> PathBuf {
        self.path("out")
    }

    /// `tctc` with a clean environment, run from the workspace.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tctc"));
        cmd.current_dir(self.dir.path())
            .arg("--config")
            .arg(self.path("tctc.toml"));
        for var in [
            "ENABLE_AI",
            "OPENAI_API_KEY",
            "OPENAI_MODEL",
            "OUTPUT_DIR",
            "RUST_LOG",
            "TCTC_AI_ENABLED",
            "TCTC_LINKS",
            "TCTC_LOG_FILE",
            "TCTC_LOG_FORMAT",
            "TCTC_LOG_LEVEL",
            "TCTC_OUT_DIR",
            "TCTC_REQUIREMENTS",
            "TCTC_STRICT",
            "TCTC_TESTS",
            "TCTC_TITLE",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    pub fn run(&self, args: &[&str]) -> Output {
        self.command().args(args).output().expect("run tctc")
    }
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

pub fn assert_contains(haystack: &str, needle: &str) {
    assert!(
        haystack.contains(needle),
        "Expected to find '{needle}' in output, got: {haystack}"
    );
}

pub fn assert_path_exists(path: &Path) {
    assert!(path.exists(), "Expected path to exist: {}", path.display());
}
