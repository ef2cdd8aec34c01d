//! End-to-end run: resolve, detect, execute, aggregate, export.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;

use crate::cli::ReportFormat;
use crate::config::ConfigResolver;
use crate::detect::{DetectOptions, SystemDetector};
use crate::engine::{execute_all, ExecutionOptions};
use crate::report::{
    build_workbooks, export_workbooks, CsvWriter, ReportOptions, RunSummary, WorkbookWriter, XlsxWriter,
};

/// Everything a run needs, built once from the command line
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: String,
    pub source: PathBuf,
    pub output_dir: PathBuf,
    pub format: ReportFormat,
    pub detect: DetectOptions,
    pub execution: ExecutionOptions,
    /// An empty `workbook_stem` is replaced by the configuration's stem
    pub report: ReportOptions,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub workbooks: Vec<PathBuf>,
    pub summary_path: PathBuf,
    pub cancelled: bool,
}

fn writer_for(format: ReportFormat) -> Box<dyn WorkbookWriter> {
    match format {
        ReportFormat::Xlsx => Box::new(XlsxWriter::new()),
        ReportFormat::Csv => Box::new(CsvWriter::new()),
    }
}

/// Run the whole pipeline with the resolver and detector defaults
pub fn run(options: &RunOptions) -> Result<RunOutcome> {
    run_with(options, &ConfigResolver::new(), writer_for(options.format).as_mut())
}

/// Run the whole pipeline with explicit collaborators.
///
/// Configuration and export failures abort the run; per-file and per-unit
/// failures are recorded in the summary. A cancelled run still exports what
/// was collected.
pub fn run_with(
    options: &RunOptions,
    resolver: &ConfigResolver,
    writer: &mut dyn WorkbookWriter,
) -> Result<RunOutcome> {
    let started = Utc::now();

    let config = resolver
        .resolve(&options.config)
        .with_context(|| format!("Failed to resolve configuration {}", options.config))?;

    let detection = SystemDetector::new(options.detect.clone())
        .enumerate(&options.source)
        .context("Failed to enumerate evidence files")?;

    let report = execute_all(&config.definitions, &detection.systems, &options.execution);

    let mut summary = RunSummary::new(&config, &options.source, &detection, &report, started);

    let mut report_options = options.report.clone();
    if report_options.workbook_stem.is_empty() {
        report_options.workbook_stem = config.root.stem();
    }
    let workbooks = build_workbooks(
        &config.definitions,
        &report.results,
        &detection.systems,
        Some(&summary),
        &report_options,
    );

    let written = export(&workbooks, writer, &options.output_dir)?;
    summary.workbooks = written.clone();

    let summary_path = summary
        .write_json(&options.output_dir)
        .context("Failed to write run summary")?;
    info!("Run summary written to {}", summary_path.display());
    summary.log_report();

    Ok(RunOutcome {
        cancelled: summary.cancelled,
        summary,
        workbooks: written,
        summary_path,
    })
}

fn export(
    workbooks: &[crate::report::WorkbookData],
    writer: &mut dyn WorkbookWriter,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    export_workbooks(workbooks, writer, output_dir)
        .with_context(|| format!("Failed to export reports to {}", output_dir.display()))
}
