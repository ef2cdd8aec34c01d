//! Result aggregation and export.
//!
//! [`build_workbooks`] groups results by OS family and definition and names
//! sheets; [`export_workbooks`] hands each sheet to a [`WorkbookWriter`].

mod aggregator;
mod naming;
mod summary;
mod writer;

pub use aggregator::{build_workbooks, ReportOptions, SheetData, WorkbookData, WorkbookLayout};
pub use naming::{sanitize_column_names, sanitize_sheet_name, truncate_cell, SheetNamer};
pub use summary::{DefinitionEntry, FailureEntry, RunSummary, SystemEntry};
pub use writer::{export_workbooks, CsvWriter, WorkbookWriter, XlsxWriter};
