//! Error types for each pipeline stage.
//!
//! Only [`ConfigError`] and [`ExportError`] abort a run. [`DetectError`] is
//! fatal for a single evidence file and [`UnitError`] for a single
//! (definition, system) execution; both are recorded and reported in the run
//! summary.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Structural configuration failures raised before any search runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The root configuration or an included file could not be located.
    #[error("Configuration not found: {name} (searched {searched})")]
    NotFound { name: String, searched: String },

    /// Malformed YAML or a block with the wrong shape.
    #[error("Failed to parse configuration {origin}: {reason}")]
    Parse { origin: String, reason: String },

    /// An include chain revisits a file that is still being resolved.
    #[error("Include cycle detected: {}", .chain.join(" -> "))]
    Cycle { chain: Vec<String> },

    /// A located configuration could not be read.
    #[error("Failed to read configuration {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reasons an evidence file is skipped during detection.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("Source directory {} is not accessible: {reason}", .path.display())]
    SourceUnavailable { path: PathBuf, reason: String },

    #[error("Failed to read {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is {size} bytes, above the {limit} byte limit", .path.display())]
    TooLarge { path: PathBuf, size: u64, limit: u64 },

    #[error(
        "Encoding of {} could not be determined with confidence (best guess {guess} at {confidence:.2})",
        .path.display()
    )]
    Encoding {
        path: PathBuf,
        guess: String,
        confidence: f32,
    },

    #[error("{} is not valid {encoding}", .path.display())]
    Decode { path: PathBuf, encoding: String },

    #[error("{} does not carry a known audit producer marker", .path.display())]
    Unrecognized { path: PathBuf },
}

/// Failure of one (definition, system) execution unit.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum UnitError {
    #[error("Regex execution exceeded {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Execution cancelled")]
    Cancelled,

    #[error("Worker panicked: {message}")]
    Panicked { message: String },
}

/// Failures producing report files. Always fatal.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to create {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {reason}", .path.display())]
    Write { path: PathBuf, reason: String },

    #[error("No workbook is open")]
    NotOpen,
}
