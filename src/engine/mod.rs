//! Search engine: runs definitions against systems.
//!
//! A unit is one (definition, system) pair. Units share the definitions and
//! systems read-only; workers only send outcomes back, and the coordinator
//! alone accumulates results and logs progress.

mod executor;
mod fields;
mod matcher;
mod watchdog;

pub use executor::{execute, execute_all, ExecutionOptions, ExecutionReport, UnitFailure};
pub use fields::{dedup_rows, truncate_rows, Row, RowSet, RowShape};
pub use matcher::{enclosing_lines, extract, scan, Flow};
pub use watchdog::{CancelToken, Watchdog};
