use clap::{Parser, ValueEnum};
use std::fmt;
use std::path::PathBuf;

use crate::constants::{DEFAULT_FILE_SPEC, DEFAULT_UNIT_TIMEOUT_SECS};

/// Command-line arguments for the audit-parser tool.
///
/// A run resolves `--config`, classifies every evidence file under
/// `--source`, executes the search definitions and writes the reports to
/// `--output`. The list modes print information and exit without searching.
#[derive(Parser, Debug)]
#[clap(
    name = "audit-parser",
    version,
    about = "Turns audit-collector evidence files into per-OS spreadsheet reports"
)]
pub struct Args {
    /// Root configuration file, or the name of a bundled configuration
    #[clap(short = 'c', long, default_value = "all.yaml")]
    pub config: String,

    /// Directory containing the evidence files
    #[clap(short = 's', long)]
    pub source: Option<PathBuf>,

    /// File-name pattern(s) of evidence files, e.g. "*.txt" or "*.txt;*.log"
    #[clap(short = 'f', long, default_value = DEFAULT_FILE_SPEC)]
    pub file_spec: String,

    /// Directory the reports are written to (default: ./results)
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Worker threads (1 = sequential, 0 = one per CPU)
    #[clap(short, long, default_value = "1")]
    pub workers: usize,

    /// Time budget in seconds for one definition on one system (0 disables)
    #[clap(long, default_value_t = DEFAULT_UNIT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Minimum encoding-detection confidence for a file to be read
    #[clap(long)]
    pub min_confidence: Option<f32>,

    /// Skip evidence files larger than this many MB
    #[clap(long)]
    pub max_file_size: Option<u64>,

    /// Directory levels below --source to search
    #[clap(long)]
    pub max_depth: Option<usize>,

    /// Write one combined workbook instead of one per OS family
    #[clap(long)]
    pub combined: bool,

    /// Leave the Summary sheet out of the workbooks
    #[clap(long)]
    pub no_summary: bool,

    /// Report format
    #[clap(long, value_enum, default_value_t = ReportFormat::Xlsx)]
    pub format: ReportFormat,

    /// Verbose logging
    #[clap(short, long)]
    pub verbose: bool,

    /// List the bundled configurations and exit
    #[clap(long)]
    pub list_configs: bool,

    /// List the systems detected under --source and exit
    #[clap(long)]
    pub list_systems: bool,

    /// List the evidence sections of each detected system and exit
    #[clap(long)]
    pub list_sections: bool,
}

impl Args {
    pub fn list_mode(&self) -> bool {
        self.list_configs || self.list_systems || self.list_sections
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Xlsx,
    Csv,
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportFormat::Xlsx => write!(f, "xlsx"),
            ReportFormat::Csv => write!(f, "csv"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["audit-parser", "-s", "evidence"]);
        assert_eq!(args.config, "all.yaml");
        assert_eq!(args.file_spec, "*.txt");
        assert_eq!(args.workers, 1);
        assert_eq!(args.timeout, DEFAULT_UNIT_TIMEOUT_SECS);
        assert_eq!(args.format, ReportFormat::Xlsx);
        assert!(!args.combined);
        assert!(!args.list_mode());
    }

    #[test]
    fn test_full_flags() {
        let args = Args::parse_from([
            "audit-parser",
            "-c",
            "linux.yaml",
            "-s",
            "evidence",
            "-o",
            "out",
            "-w",
            "0",
            "--timeout",
            "5",
            "--min-confidence",
            "0.7",
            "--max-file-size",
            "64",
            "--max-depth",
            "2",
            "--combined",
            "--no-summary",
            "--format",
            "csv",
            "-v",
        ]);
        assert_eq!(args.config, "linux.yaml");
        assert_eq!(args.workers, 0);
        assert_eq!(args.min_confidence, Some(0.7));
        assert_eq!(args.max_file_size, Some(64));
        assert_eq!(args.max_depth, Some(2));
        assert!(args.combined && args.no_summary && args.verbose);
        assert_eq!(args.format, ReportFormat::Csv);
    }

    #[test]
    fn test_list_modes() {
        let args = Args::parse_from(["audit-parser", "--list-configs"]);
        assert!(args.list_mode());
        assert!(args.source.is_none());
    }
}
