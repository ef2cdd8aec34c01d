use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use log::{debug, warn};

use crate::config::SearchDefinition;
use crate::constants::{MAX_COLUMNS, SUMMARY_SHEET_NAME, SYSTEM_COLUMNS};
use crate::models::{OsFamily, SearchResults, System};
use crate::report::naming::{sanitize_column_names, truncate_cell, SheetNamer};
use crate::report::summary::RunSummary;

/// How results are split into workbooks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkbookLayout {
    /// One workbook per OS family, named `<stem>_<Family>`
    #[default]
    PerOsFamily,
    /// A single workbook named `<stem>`
    Combined,
}

#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub layout: WorkbookLayout,
    pub include_summary: bool,
    /// Usually the configuration's file stem
    pub workbook_stem: String,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            layout: WorkbookLayout::PerOsFamily,
            include_summary: true,
            workbook_stem: "report".to_string(),
        }
    }
}

/// One sheet ready for a writer: name, ordered columns and rows
#[derive(Debug, Clone, PartialEq)]
pub struct SheetData {
    pub name: String,
    /// Definition the sheet was built from; `None` for the summary
    pub definition: Option<String>,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookData {
    pub stem: String,
    /// `None` for a combined workbook
    pub os_family: Option<OsFamily>,
    pub sheets: Vec<SheetData>,
}

/// Group results into workbooks and sheets.
///
/// `results` must be in the same order as `definitions`. A definition gets
/// a sheet in every workbook whose family it was evaluated against, even
/// when nothing matched.
pub fn build_workbooks(
    definitions: &[SearchDefinition],
    results: &[SearchResults],
    systems: &[Arc<System>],
    summary: Option<&RunSummary>,
    options: &ReportOptions,
) -> Vec<WorkbookData> {
    let family_of: HashMap<usize, OsFamily> = systems
        .iter()
        .map(|s| (s.discovery_index, s.os_family))
        .collect();

    let targets: Vec<Option<OsFamily>> = match options.layout {
        WorkbookLayout::Combined => vec![None],
        WorkbookLayout::PerOsFamily => systems
            .iter()
            .map(|s| s.os_family)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(Some)
            .collect(),
    };

    targets
        .into_iter()
        .map(|family| {
            let stem = match family {
                Some(family) => format!("{}_{}", options.workbook_stem, family),
                None => options.workbook_stem.clone(),
            };
            let mut namer = SheetNamer::new();
            let mut sheets = Vec::new();

            if options.include_summary {
                if let Some(summary) = summary {
                    let name = namer.claim_reserved(SUMMARY_SHEET_NAME);
                    sheets.push(summary.sheet(family, &name));
                }
            }

            for (definition, collected) in definitions.iter().zip(results) {
                let evaluated = collected
                    .evaluated_systems
                    .iter()
                    .any(|index| family.map_or(true, |f| family_of.get(index) == Some(&f)));
                if !evaluated {
                    continue;
                }
                let name = namer.assign(&definition.excel_sheet_name);
                sheets.push(definition_sheet(definition, collected, family, name));
            }

            debug!("Workbook {} has {} sheet(s)", stem, sheets.len());
            WorkbookData {
                stem,
                os_family: family,
                sheets,
            }
        })
        .collect()
}

fn definition_sheet(
    definition: &SearchDefinition,
    collected: &SearchResults,
    family: Option<OsFamily>,
    name: String,
) -> SheetData {
    let mut fields = definition.output_columns();
    let room = MAX_COLUMNS - SYSTEM_COLUMNS.len();
    if fields.len() > room {
        warn!(
            "Definition {} has {} columns; keeping the first {}",
            definition.name,
            fields.len(),
            room
        );
        fields.truncate(room);
    }

    let mut columns: Vec<String> = SYSTEM_COLUMNS.iter().map(|c| c.to_string()).collect();
    columns.extend(fields.iter().cloned());

    let rows = collected
        .results
        .iter()
        .filter(|r| family.map_or(true, |f| r.system.os_family == f))
        .map(|result| {
            let mut row = vec![
                truncate_cell(&result.system.system_name),
                result.system.producer.to_string(),
                truncate_cell(&result.system.producer_version),
            ];
            row.extend(
                fields
                    .iter()
                    .map(|field| result.fields.get(field).map(|v| truncate_cell(v)).unwrap_or_default()),
            );
            row
        })
        .collect();

    SheetData {
        name,
        definition: Some(definition.name.clone()),
        columns: sanitize_column_names(&columns),
        rows,
    }
}
