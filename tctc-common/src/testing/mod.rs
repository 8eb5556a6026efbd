//! Test support: once-only JSONL capture of `tctc` events.
//!
//! ```ignore
//! #[test]
//! fn test_example() {
//!     tctc_common::testing::init_test_logging();
//!     tracing::info!(target: "tctc", "lands in target/test-logs/tctc_tests.jsonl");
//! }
//! ```
//!
//! `TCTC_TEST_LOG_FILE` moves the file, `TCTC_TEST_LOG_LEVEL` sets the
//! level for the `tctc` crates (default `debug`).

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

static LOG_PATH: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Installs the test subscriber on first use. Later calls (and a
/// subscriber installed by someone else) are left alone.
pub fn init_test_logging() {
    LOG_PATH.get_or_init(install);
}

/// File the JSONL events go to, once [`init_test_logging`] has run and
/// the file could be created.
pub fn test_log_path() -> Option<&'static Path> {
    LOG_PATH.get().and_then(|p| p.as_deref())
}

fn install() -> Option<PathBuf> {
    let path = std::env::var_os("TCTC_TEST_LOG_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|| target_dir().join("test-logs").join("tctc_tests.jsonl"));
    let file = path
        .parent()
        .map_or(Ok(()), fs::create_dir_all)
        .and_then(|()| File::create(&path))
        .ok();
    let opened = file.is_some();

    let jsonl = file.map(|f| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(Mutex::new(f))
            .with_file(true)
            .with_line_number(true)
    });
    let console = tracing_subscriber::fmt::layer()
        .compact()
        .with_test_writer();

    let level = std::env::var("TCTC_TEST_LOG_LEVEL").unwrap_or_else(|_| "debug".into());
    let filter = EnvFilter::try_new(format!("tctc={level},tctc_common={level}"))
        .unwrap_or_else(|_| EnvFilter::new("tctc=debug,tctc_common=debug"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(jsonl)
        .with(console)
        .try_init();

    opened.then_some(path)
}

/// `CARGO_TARGET_DIR`, else the closest existing `target/` from the
/// working directory upward.
fn target_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("CARGO_TARGET_DIR") {
        return dir.into();
    }
    let cwd = std::env::current_dir().unwrap_or_default();
    cwd.ancestors()
        .map(|dir| dir.join("target"))
        .find(|candidate| candidate.is_dir())
        .unwrap_or_else(|| PathBuf::from("target"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_init() {
        init_test_logging();
        init_test_logging();
        tracing::debug!(target: "tctc_common", "captured");
        if let Some(path) = test_log_path() {
            assert!(path.ends_with("tctc_tests.jsonl") || std::env::var_os("TCTC_TEST_LOG_FILE").is_some());
        }
    }

    #[test]
    fn test_target_dir_name() {
        let dir = target_dir();
        assert!(dir.ends_with("target") || std::env::var_os("CARGO_TARGET_DIR").is_some());
    }
}
