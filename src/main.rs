use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use audit_parser::cli::Args;
use audit_parser::config::list_bundled_configs;
use audit_parser::constants::{DEFAULT_OUTPUT_DIR, EXIT_CANCELLED};
use audit_parser::detect::{list_sections, DetectOptions, SystemDetector};
use audit_parser::engine::{CancelToken, ExecutionOptions};
use audit_parser::pipeline::{self, RunOptions};
use audit_parser::report::{ReportOptions, WorkbookLayout};

fn main() -> ExitCode {
    // Parse arguments
    let args = Args::parse();

    // Initialize logging
    if let Err(e) = initialize_logging(args.verbose) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<ExitCode> {
    // Handle list modes
    if args.list_mode() {
        if args.list_configs {
            print_bundled_configs();
        } else {
            print_systems(args, require_source(args)?)?;
        }
        return Ok(ExitCode::SUCCESS);
    }

    let source = require_source(args)?;
    info!("Starting audit evidence parsing");

    // Cancellation on Ctrl-C
    let cancel = CancelToken::new();
    install_interrupt_handler(cancel.clone());

    // Build run options
    let options = build_run_options(args, source, cancel)?;
    info!(
        "Configuration {}, source {}, output {}",
        options.config,
        options.source.display(),
        options.output_dir.display()
    );

    // Run the pipeline
    let outcome = pipeline::run(&options)?;

    for path in &outcome.workbooks {
        info!("Report: {}", path.display());
    }

    if outcome.cancelled {
        warn!("Run was cancelled; reports contain partial results");
        return Ok(ExitCode::from(EXIT_CANCELLED));
    }

    info!("Parsing completed successfully");
    Ok(ExitCode::SUCCESS)
}

fn initialize_logging(verbose: bool) -> Result<()> {
    let log_level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };

    TermLogger::init(log_level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto)
        .context("Failed to initialize logger")?;

    Ok(())
}

fn require_source(args: &Args) -> Result<&Path> {
    args.source
        .as_deref()
        .ok_or_else(|| anyhow!("--source is required"))
}

fn detect_options(args: &Args) -> Result<DetectOptions> {
    let mut options = DetectOptions::default();
    options.file_spec = args.file_spec.clone();
    options.max_depth = args.max_depth;

    if let Some(mb) = args.max_file_size {
        options.max_file_size = mb.saturating_mul(1024 * 1024);
    }
    if let Some(confidence) = args.min_confidence {
        if !(0.0..=1.0).contains(&confidence) {
            bail!("--min-confidence must be between 0 and 1, got {}", confidence);
        }
        options.min_confidence = confidence;
    }
    Ok(options)
}

fn build_run_options(args: &Args, source: &Path, cancel: CancelToken) -> Result<RunOptions> {
    let execution = ExecutionOptions {
        workers: args.workers,
        unit_timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
        cancel,
    };

    let report = ReportOptions {
        layout: if args.combined {
            WorkbookLayout::Combined
        } else {
            WorkbookLayout::PerOsFamily
        },
        include_summary: !args.no_summary,
        // Filled from the configuration name
        workbook_stem: String::new(),
    };

    Ok(RunOptions {
        config: args.config.clone(),
        source: source.to_path_buf(),
        output_dir: args
            .output
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        format: args.format,
        detect: detect_options(args)?,
        execution,
        report,
    })
}

fn install_interrupt_handler(cancel: CancelToken) {
    let result = ctrlc::set_handler(move || {
        warn!("Interrupt received, cancelling remaining searches");
        cancel.cancel();
    });
    if let Err(e) = result {
        warn!("Failed to install Ctrl-C handler: {}", e);
    }
}

fn print_bundled_configs() {
    let configs = list_bundled_configs();
    if configs.is_empty() {
        println!("No bundled configurations");
        return;
    }
    println!("Bundled configurations:");
    for name in configs {
        println!("  {}", name);
    }
}

fn print_systems(args: &Args, source: &Path) -> Result<()> {
    let detection = SystemDetector::new(detect_options(args)?)
        .enumerate(source)
        .context("Failed to enumerate evidence files")?;

    for system in &detection.systems {
        let distro = system
            .distro_family
            .as_ref()
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{}\t{}\t{}\t{} {}\t{}",
            system.system_name,
            system.os_family,
            distro,
            system.producer,
            system.producer_version,
            system.source_path.display()
        );

        if args.list_sections {
            for section in list_sections(system) {
                println!("    {}", section);
            }
        }
    }

    for skipped in &detection.warnings {
        println!("skipped\t{}\t{}", skipped.path.display(), skipped.reason);
    }
    Ok(())
}
