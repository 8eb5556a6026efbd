//! CSV ingestion for requirements, tests and extra links.

use crate::models::{
    ModelError, RawRow, Requirement, RequirementDraft, TestCase, TestCaseDraft, TraceLink,
    TraceLinkDraft,
};
use crate::observe::{Observer, ObserverEvent};
use crate::tabular::{Table, TextEncoding, decode_text, parse_table};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("CSV has no header row: {}", .0.display())]
    NoHeader(PathBuf),

    #[error("{} row {row}: {source}", path.display())]
    InvalidRow {
        path: PathBuf,
        row: usize,
        #[source]
        source: ModelError,
    },
}

/// Read and parse a CSV file.
pub fn read_table(path: &Path, observer: &dyn Observer) -> Result<(Table, TextEncoding), LoadError> {
    let bytes = fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => LoadError::NotFound(path.to_path_buf()),
        _ => LoadError::Io {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let (text, encoding) = decode_text(&bytes);
    let table = parse_table(&text).ok_or_else(|| LoadError::NoHeader(path.to_path_buf()))?;

    observer.event(
        &ObserverEvent::debug("load.csv_read", "CSV read")
            .with_field("path", path.display())
            .with_field("encoding", encoding)
            .with_field("delimiter", table.delimiter)
            .with_field("rows", table.rows.len()),
    );
    Ok((table, encoding))
}

fn has_text(draft_title: &str, draft_description: &str) -> bool {
    !draft_title.trim().is_empty() || !draft_description.trim().is_empty()
}

fn skipped(observer: &dyn Observer, kind: &str, path: &Path, idx: usize) {
    observer.event(
        &ObserverEvent::warn("load.row_skipped", format!("{kind} row {idx}: empty, skipped"))
            .with_field("path", path.display())
            .with_field("row", idx),
    );
}

/// Requirements from rows already parsed. `path` is only used in messages.
pub fn requirements_from_rows(
    rows: &[RawRow],
    path: &Path,
    observer: &dyn Observer,
) -> Result<Vec<Requirement>, LoadError> {
    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate().map(|(i, r)| (i + 1, r)) {
        let mut draft = RequirementDraft::from_row(row);
        if draft.requirement_id.is_empty() {
            draft.requirement_id = format!("REQ-{idx:03}");
        }
        if !has_text(&draft.title, &draft.description) {
            skipped(observer, "Requirement", path, idx);
            continue;
        }
        out.push(draft.build().map_err(|source| LoadError::InvalidRow {
            path: path.to_path_buf(),
            row: idx,
            source,
        })?);
    }
    Ok(out)
}

/// Test cases from rows already parsed.
pub fn tests_from_rows(
    rows: &[RawRow],
    path: &Path,
    observer: &dyn Observer,
) -> Result<Vec<TestCase>, LoadError> {
    let mut out = Vec::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate().map(|(i, r)| (i + 1, r)) {
        let mut draft = TestCaseDraft::from_row(row);
        if draft.test_id.is_empty() {
            draft.test_id = format!("TC-{idx:03}");
        }
        if !has_text(&draft.title, &draft.description) {
            skipped(observer, "Test", path, idx);
            continue;
        }
        out.push(draft.build().map_err(|source| LoadError::InvalidRow {
            path: path.to_path_buf(),
            row: idx,
            source,
        })?);
    }
    Ok(out)
}

/// Load `requirements.csv`.
///
/// Missing ids default to `REQ-001`, `REQ-002`, ... by row; rows with
/// neither title nor description are skipped with a warning.
pub fn load_requirements(path: &Path, observer: &dyn Observer) -> Result<Vec<Requirement>, LoadError> {
    let (table, _) = read_table(path, observer)?;
    requirements_from_rows(&table.rows, path, observer)
}

/// Load `tests.csv`. Missing ids default to `TC-001`, ... by row.
pub fn load_tests(path: &Path, observer: &dyn Observer) -> Result<Vec<TestCase>, LoadError> {
    let (table, _) = read_table(path, observer)?;
    tests_from_rows(&table.rows, path, observer)
}

/// Load curated links (`requirement_id,test_id,source,confidence,rationale`).
/// Blank rows are ignored; any other invalid row is an error.
pub fn load_links(path: &Path, observer: &dyn Observer) -> Result<Vec<TraceLink>, LoadError> {
    let (table, _) = read_table(path, observer)?;
    let mut out = Vec::with_capacity(table.rows.len());
    for (idx, row) in table.rows.iter().enumerate().map(|(i, r)| (i + 1, r)) {
        if row.values().all(|v| v.is_empty()) {
            continue;
        }
        let invalid = |source| LoadError::InvalidRow {
            path: path.to_path_buf(),
            row: idx,
            source,
        };
        let link = TraceLinkDraft::from_row(row)
            .map_err(invalid)?
            .build()
            .map_err(invalid)?;
        out.push(link);
    }
    Ok(out)
}
