//! Writers for the accepted record set.
//!
//! # Submodules
//!
//! - [`xlsx`]: the formatted spreadsheet, one row per record
//! - [`json`]: an optional machine-readable snapshot of the same rows
//!
//! Both writers refuse to create a file for an empty record set and report
//! that through [`ExportOutcome::Skipped`] instead of an error.

pub mod json;
pub mod xlsx;

/// What an exporter did with the record set it was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written { path: String, rows: usize },
    /// Nothing to write; no file was created.
    Skipped,
}
