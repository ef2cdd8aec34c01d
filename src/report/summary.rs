use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{ConfigWarning, ResolvedConfig};
use crate::constants::RUN_SUMMARY_FILE;
use crate::detect::{Detection, DetectionWarning};
use crate::engine::ExecutionReport;
use crate::error::ExportError;
use crate::models::{OsFamily, System};
use crate::report::aggregator::SheetData;
use crate::report::naming::truncate_cell;

#[derive(Debug, Clone, Serialize)]
pub struct SystemEntry {
    pub system_name: String,
    pub os_family: OsFamily,
    pub distro_family: Option<String>,
    pub producer: String,
    pub producer_version: String,
    pub source_path: PathBuf,
    pub encoding: String,
    pub encoding_confidence: f32,
    pub sha256: String,
}

impl From<&System> for SystemEntry {
    fn from(system: &System) -> Self {
        Self {
            system_name: system.system_name.clone(),
            os_family: system.os_family,
            distro_family: system.distro_family.map(|d| d.to_string()),
            producer: system.producer.to_string(),
            producer_version: system.producer_version.clone(),
            source_path: system.source_path.clone(),
            encoding: system.encoding.to_string(),
            encoding_confidence: system.encoding_confidence,
            sha256: system.sha256.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DefinitionEntry {
    pub name: String,
    pub excel_sheet_name: String,
    pub rows: usize,
    pub rows_by_family: BTreeMap<OsFamily, usize>,
    pub systems_evaluated: usize,
    pub truncated: bool,
    pub truncated_systems: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FailureEntry {
    pub definition: String,
    pub system: String,
    pub reason: String,
}

/// Machine-readable record of one run, also rendered as the Summary sheet
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub started: String,
    pub finished: String,
    pub tool_version: String,
    pub configuration: String,
    pub configuration_sources: Vec<String>,
    pub source_directory: PathBuf,
    pub cancelled: bool,
    pub units_planned: usize,
    pub units_run: usize,
    pub systems: Vec<SystemEntry>,
    pub skipped_files: Vec<DetectionWarning>,
    pub definitions: Vec<DefinitionEntry>,
    pub rejected_definitions: Vec<ConfigWarning>,
    pub config_warnings: Vec<ConfigWarning>,
    pub unit_failures: Vec<FailureEntry>,
    pub workbooks: Vec<PathBuf>,
}

impl RunSummary {
    pub fn new(
        config: &ResolvedConfig,
        source_directory: &Path,
        detection: &Detection,
        report: &ExecutionReport,
        started: DateTime<Utc>,
    ) -> Self {
        let family_of: BTreeMap<usize, OsFamily> = detection
            .systems
            .iter()
            .map(|s| (s.discovery_index, s.os_family))
            .collect();

        let definitions = config
            .definitions
            .iter()
            .zip(&report.results)
            .map(|(definition, results)| {
                let mut rows_by_family = BTreeMap::new();
                for result in &results.results {
                    *rows_by_family.entry(result.system.os_family).or_insert(0) += 1;
                }
                // Families evaluated without a match still get an explicit zero
                for index in &results.evaluated_systems {
                    if let Some(family) = family_of.get(index) {
                        rows_by_family.entry(*family).or_insert(0);
                    }
                }
                DefinitionEntry {
                    name: definition.name.clone(),
                    excel_sheet_name: definition.excel_sheet_name.clone(),
                    rows: results.len(),
                    rows_by_family,
                    systems_evaluated: results.evaluated_systems.len(),
                    truncated: results.truncated,
                    truncated_systems: results.truncated_systems.clone(),
                }
            })
            .collect();

        let (rejected_definitions, config_warnings): (Vec<_>, Vec<_>) = config
            .warnings
            .iter()
            .cloned()
            .partition(|w| w.rejects_definition());

        Self {
            run_id: Uuid::new_v4().to_string(),
            started: started.to_rfc3339(),
            finished: Utc::now().to_rfc3339(),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
            configuration: config.root.to_string(),
            configuration_sources: config.sources.iter().map(|s| s.to_string()).collect(),
            source_directory: source_directory.to_path_buf(),
            cancelled: report.cancelled,
            units_planned: report.units_planned,
            units_run: report.units_run,
            systems: detection.systems.iter().map(|s| SystemEntry::from(s.as_ref())).collect(),
            skipped_files: detection.warnings.clone(),
            definitions,
            rejected_definitions,
            config_warnings,
            unit_failures: report
                .failures
                .iter()
                .map(|f| FailureEntry {
                    definition: f.definition.clone(),
                    system: f.system.clone(),
                    reason: f.error.to_string(),
                })
                .collect(),
            workbooks: Vec::new(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write `run_summary.json` into `output_dir`
    pub fn write_json(&self, output_dir: &Path) -> Result<PathBuf, ExportError> {
        fs::create_dir_all(output_dir).map_err(|e| ExportError::CreateDir {
            path: output_dir.to_path_buf(),
            source: e,
        })?;

        let path = output_dir.join(RUN_SUMMARY_FILE);
        let json = self.to_json().map_err(|e| ExportError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| ExportError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }

    /// Summary sheet restricted to one family, or the whole run for `None`
    pub fn sheet(&self, family: Option<OsFamily>, name: &str) -> SheetData {
        let in_family = |f: OsFamily| family.map_or(true, |wanted| wanted == f);
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut push = |category: &str, name: &str, value: String, detail: String| {
            rows.push(vec![
                category.to_string(),
                truncate_cell(name),
                truncate_cell(&value),
                truncate_cell(&detail),
            ]);
        };

        push("run", "run_id", self.run_id.clone(), String::new());
        push("run", "configuration", self.configuration.clone(), String::new());
        push("run", "started", self.started.clone(), String::new());
        push(
            "run",
            "status",
            if self.cancelled { "cancelled" } else { "complete" }.to_string(),
            format!("{}/{} units", self.units_run, self.units_planned),
        );

        let systems: Vec<&SystemEntry> = self.systems.iter().filter(|s| in_family(s.os_family)).collect();
        push("run", "systems_processed", systems.len().to_string(), String::new());
        for system in systems {
            push(
                "system",
                &system.system_name,
                format!("{} {}", system.producer, system.producer_version),
                system.source_path.display().to_string(),
            );
        }

        for definition in &self.definitions {
            let rows = match family {
                Some(f) => match definition.rows_by_family.get(&f) {
                    Some(rows) => *rows,
                    None => continue,
                },
                None => definition.rows,
            };
            let detail = if definition.truncated {
                format!("truncated: {}", definition.truncated_systems.join(", "))
            } else {
                String::new()
            };
            push("definition", &definition.name, rows.to_string(), detail);
        }

        for skipped in &self.skipped_files {
            push(
                "skipped_file",
                &skipped.path.display().to_string(),
                String::new(),
                skipped.reason.clone(),
            );
        }
        for rejected in &self.rejected_definitions {
            push(
                "rejected_definition",
                rejected.definition.as_deref().unwrap_or_default(),
                rejected.origin.clone(),
                rejected.message.clone(),
            );
        }
        for failure in &self.unit_failures {
            push(
                "unit_failure",
                &failure.definition,
                failure.system.clone(),
                failure.reason.clone(),
            );
        }

        SheetData {
            name: name.to_string(),
            definition: None,
            columns: ["category", "name", "value", "detail"].iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    /// Log the end-of-run report; problems are called out with a banner
    pub fn log_report(&self) {
        info!(
            "Run {}: {} system(s), {} definition(s), {} unit(s) run",
            self.run_id,
            self.systems.len(),
            self.definitions.len(),
            self.units_run
        );
        for workbook in &self.workbooks {
            info!("Wrote {}", workbook.display());
        }

        let problems = self.skipped_files.len() + self.rejected_definitions.len() + self.unit_failures.len();
        if problems == 0 && !self.cancelled {
            return;
        }

        warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        warn!("⚠️  Run Issues Summary");
        warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if self.cancelled {
            warn!("");
            warn!(
                "The run was cancelled; reports contain {}/{} unit(s).",
                self.units_run, self.units_planned
            );
        }
        if !self.skipped_files.is_empty() {
            warn!("");
            warn!("{} file(s) were skipped:", self.skipped_files.len());
            for skipped in &self.skipped_files {
                warn!("  • {}: {}", skipped.path.display(), skipped.reason);
            }
        }
        if !self.rejected_definitions.is_empty() {
            warn!("");
            warn!("{} definition(s) were rejected:", self.rejected_definitions.len());
            for rejected in &self.rejected_definitions {
                warn!("  • {}", rejected);
            }
        }
        if !self.unit_failures.is_empty() {
            warn!("");
            warn!("{} search unit(s) failed:", self.unit_failures.len());
            for failure in &self.unit_failures {
                warn!("  • {} on {}: {}", failure.definition, failure.system, failure.reason);
            }
        }
        warn!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }
}
