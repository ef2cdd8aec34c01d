use std::fs;
use std::path::{Path, PathBuf};

use log::{info, warn};
use rust_xlsxwriter::{Format, Workbook};

use crate::error::ExportError;
use crate::report::aggregator::WorkbookData;

/// Rows per worksheet, header included
const MAX_XLSX_ROWS: usize = 1_048_576;

/// Generic spreadsheet export primitive driven by the aggregator
#[cfg_attr(test, mockall::automock)]
pub trait WorkbookWriter {
    /// Start a workbook named `stem` under `output_dir`
    fn open(&mut self, output_dir: &Path, stem: &str) -> Result<(), ExportError>;

    fn write_sheet(&mut self, name: &str, columns: &[String], rows: &[Vec<String>]) -> Result<(), ExportError>;

    /// Finish the workbook and return where it was written
    fn close(&mut self) -> Result<PathBuf, ExportError>;
}

fn create_dir(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path).map_err(|e| ExportError::CreateDir {
        path: path.to_path_buf(),
        source: e,
    })
}

/// `.xlsx` workbooks via rust_xlsxwriter, with a bold header row
#[derive(Default)]
pub struct XlsxWriter {
    current: Option<(Workbook, PathBuf)>,
}

impl XlsxWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkbookWriter for XlsxWriter {
    fn open(&mut self, output_dir: &Path, stem: &str) -> Result<(), ExportError> {
        create_dir(output_dir)?;
        self.current = Some((Workbook::new(), output_dir.join(format!("{}.xlsx", stem))));
        Ok(())
    }

    fn write_sheet(&mut self, name: &str, columns: &[String], rows: &[Vec<String>]) -> Result<(), ExportError> {
        let (workbook, path) = self.current.as_mut().ok_or(ExportError::NotOpen)?;
        let write_error = |e: rust_xlsxwriter::XlsxError| ExportError::Write {
            path: path.clone(),
            reason: format!("sheet {}: {}", name, e),
        };

        let header = Format::new().set_bold();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name).map_err(write_error)?;

        for (col, column) in columns.iter().enumerate() {
            worksheet
                .write_string_with_format(0, col as u16, column.as_str(), &header)
                .map_err(write_error)?;
        }

        let keep = rows.len().min(MAX_XLSX_ROWS - 1);
        if keep < rows.len() {
            warn!(
                "Sheet {} has {} rows; only the first {} fit in a worksheet",
                name,
                rows.len(),
                keep
            );
        }
        for (r, row) in rows.iter().take(keep).enumerate() {
            for (col, value) in row.iter().enumerate() {
                worksheet
                    .write_string((r + 1) as u32, col as u16, value.as_str())
                    .map_err(write_error)?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> Result<PathBuf, ExportError> {
        let (mut workbook, path) = self.current.take().ok_or(ExportError::NotOpen)?;
        workbook.save(&path).map_err(|e| ExportError::Write {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(path)
    }
}

/// A directory per workbook holding one `.csv` file per sheet
#[derive(Debug, Default)]
pub struct CsvWriter {
    current: Option<PathBuf>,
}

impl CsvWriter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WorkbookWriter for CsvWriter {
    fn open(&mut self, output_dir: &Path, stem: &str) -> Result<(), ExportError> {
        let dir = output_dir.join(stem);
        create_dir(&dir)?;
        self.current = Some(dir);
        Ok(())
    }

    fn write_sheet(&mut self, name: &str, columns: &[String], rows: &[Vec<String>]) -> Result<(), ExportError> {
        let dir = self.current.as_ref().ok_or(ExportError::NotOpen)?;
        let path = dir.join(format!("{}.csv", name));
        let write_error = |reason: String| ExportError::Write {
            path: path.clone(),
            reason,
        };

        let mut writer = csv::Writer::from_path(&path).map_err(|e| write_error(e.to_string()))?;
        writer.write_record(columns).map_err(|e| write_error(e.to_string()))?;
        for row in rows {
            writer.write_record(row).map_err(|e| write_error(e.to_string()))?;
        }
        writer.flush().map_err(|e| write_error(e.to_string()))?;
        Ok(())
    }

    fn close(&mut self) -> Result<PathBuf, ExportError> {
        self.current.take().ok_or(ExportError::NotOpen)
    }
}

/// Write every workbook through `writer`, returning the written paths
pub fn export_workbooks(
    workbooks: &[WorkbookData],
    writer: &mut dyn WorkbookWriter,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, ExportError> {
    let mut written = Vec::with_capacity(workbooks.len());
    for workbook in workbooks {
        writer.open(output_dir, &workbook.stem)?;
        for sheet in &workbook.sheets {
            writer.write_sheet(&sheet.name, &sheet.columns, &sheet.rows)?;
        }
        let path = writer.close()?;
        info!("Wrote {} sheet(s) to {}", workbook.sheets.len(), path.display());
        written.push(path);
    }
    Ok(written)
}
