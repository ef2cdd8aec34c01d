//! Global constants for the audit-parser application.
//!
//! This module centralizes hardcoded limits and names so the pipeline stages
//! agree on them.

// Detection limits
/// Bytes at the head of a file scanned for producer markers (64KB)
pub const SIGNATURE_SCAN_BYTES: usize = 64 * 1024;

/// Bytes sampled for the UTF-16 byte-pattern heuristic (4KB)
pub const ENCODING_SAMPLE_BYTES: usize = 4 * 1024;

/// Default maximum evidence file size (256MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Default minimum encoding confidence for a file to be decoded
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

/// Default file-name pattern for evidence files
pub const DEFAULT_FILE_SPEC: &str = "*.txt";

// Search limits
/// Compiled-program size limit for configuration regexes (10MB)
pub const REGEX_SIZE_LIMIT: usize = 10 * 1024 * 1024;

/// Default wall-clock budget for one (definition, system) unit in seconds
pub const DEFAULT_UNIT_TIMEOUT_SECS: u64 = 60;

/// Number of watchdog checkpoints between deadline checks
pub const WATCHDOG_CHECK_INTERVAL: u32 = 64;

/// Field name used when a definition has no `field_list`
pub const IMPLICIT_FIELD: &str = "match";

// Report limits
/// Maximum sheet-name length accepted by spreadsheet applications
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Maximum characters in a single cell
pub const MAX_CELL_LEN: usize = 32_767;

/// Maximum columns in a worksheet
pub const MAX_COLUMNS: usize = 16_384;

/// Sheet names the exporter never hands out to definitions
pub const RESERVED_SHEET_NAMES: &[&str] = &["Summary", "History"];

/// Name of the optional run summary sheet
pub const SUMMARY_SHEET_NAME: &str = "Summary";

/// System-identifying columns that lead every result sheet
pub const SYSTEM_COLUMNS: &[&str] = &["system_name", "producer", "producer_version"];

// Default file names
pub const DEFAULT_OUTPUT_DIR: &str = "results";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

// Exit codes
pub const EXIT_CANCELLED: u8 = 130;
