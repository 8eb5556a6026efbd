//! Issue catalog for TCTC dataset validation.
//!
//! Module-specific error types live next to the code that raises them
//! (`ModelError` in `models`, `KpiError` in `kpi`, ...). This module only
//! holds the catalog of validation issue codes, which is shared by the
//! validator, the report and the CLI.

pub mod catalog;

pub use catalog::{IssueCode, IssueEntry, IssueSeverity};
