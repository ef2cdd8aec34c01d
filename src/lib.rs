//! # audit-parser
//!
//! Turns the text evidence files written by the KPWINAUDIT, KPNIXAUDIT and
//! KPMACAUDIT collectors into per-OS spreadsheet reports.
//!
//! ## Overview
//!
//! A run goes through four stages:
//!
//! 1. [`config`] resolves a YAML configuration, following `include` chains,
//!    and compiles every search definition.
//! 2. [`detect`] walks the evidence directory, detects each file's encoding
//!    and classifies it into a [`models::System`].
//! 3. [`engine`] runs every definition against every eligible system, in
//!    parallel when asked, with a per-unit timeout.
//! 4. [`report`] groups the rows by OS family and writes one workbook per
//!    family, plus a JSON run summary.
//!
//! ## Usage
//!
//! ```no_run
//! use audit_parser::config::resolve;
//! use audit_parser::detect::{enumerate, DetectOptions};
//! use audit_parser::engine::{execute_all, ExecutionOptions};
//! use std::path::Path;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = resolve("linux.yaml")?;
//! let detection = enumerate(Path::new("evidence"), DetectOptions::default())?;
//! let report = execute_all(&config.definitions, &detection.systems, &ExecutionOptions::default());
//!
//! println!("{} rows from {} systems", report.total_rows(), detection.systems.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: Configuration loading, include resolution and validation
//! - [`detect`]: Evidence discovery, encoding detection and classification
//! - [`engine`]: Search execution, field extraction and the unit watchdog
//! - [`report`]: Workbook aggregation, sheet naming and export
//! - [`pipeline`]: The end-to-end run used by the binary
//! - [`constants`]: Application-wide limits and names

/// Command-line interface definitions and argument parsing
pub mod cli;

/// Core data models shared by every stage
pub mod models;

/// Error types for each pipeline stage
pub mod error;

/// Configuration resolution and search definitions
pub mod config;

/// Evidence file discovery and system classification
pub mod detect;

/// Search execution
pub mod engine;

/// Aggregation and spreadsheet export
pub mod report;

/// End-to-end run orchestration
pub mod pipeline;

/// Hashing helpers
pub mod utils;

/// Application constants and limits
pub mod constants;

/// Test utilities and helpers
#[cfg(test)]
pub mod test_utils;
