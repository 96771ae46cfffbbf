// Ledger I/O: load tables for the engine, write reconciliation reports.

pub mod csv;
pub mod error;
pub mod json;
pub mod xlsx;

use std::path::Path;

use ledgermatch_recon::model::{Cell, Table};

pub use error::IoError;

/// File families the loader understands, picked by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Tsv,
    Excel,
}

impl SourceFormat {
    pub fn from_path(path: &Path) -> Result<Self, IoError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match extension.as_str() {
            "csv" | "txt" => Ok(SourceFormat::Csv),
            "tsv" | "tab" => Ok(SourceFormat::Tsv),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => Ok(SourceFormat::Excel),
            _ => Err(IoError::UnsupportedFormat {
                path: path.to_path_buf(),
                extension,
            }),
        }
    }
}

/// Load one ledger. `sheet` is ignored for delimited text; for workbooks it
/// defaults to the first sheet. `header_row` is 1-based.
pub fn load_table(path: &Path, sheet: Option<&str>, header_row: usize) -> Result<Table, IoError> {
    let grid = match SourceFormat::from_path(path)? {
        SourceFormat::Csv => csv::read_grid(path, None)?,
        SourceFormat::Tsv => csv::read_grid(path, Some(b'\t'))?,
        SourceFormat::Excel => xlsx::read_grid(path, sheet)?,
    };
    let table = table_from_grid(path, grid, header_row)?;
    log::debug!(
        "loaded {}: {} columns, {} rows",
        path.display(),
        table.headers.len(),
        table.len()
    );
    Ok(table)
}

/// Cut a raw grid into headers and data rows.
///
/// Rows above the header are skipped, blank data rows are dropped, and data
/// rows are clipped to the header width.
pub fn table_from_grid(path: &Path, grid: Vec<Vec<Cell>>, header_row: usize) -> Result<Table, IoError> {
    if header_row == 0 || header_row > grid.len() {
        return Err(IoError::HeaderRow {
            path: path.to_path_buf(),
            header_row,
            rows: grid.len(),
        });
    }

    let mut rows = grid.into_iter().skip(header_row - 1);
    let mut headers: Vec<String> = rows
        .next()
        .unwrap_or_default()
        .iter()
        .map(|c| c.to_string())
        .collect();
    while headers.last().is_some_and(|h| h.trim().is_empty()) {
        headers.pop();
    }

    let width = headers.len();
    let mut table = Table::new(headers);
    let mut clipped = 0usize;
    for mut row in rows {
        if row.iter().all(Cell::is_empty) {
            continue;
        }
        if row.iter().skip(width).any(|c| !c.is_empty()) {
            clipped += 1;
        }
        row.truncate(width);
        table.rows.push(row);
    }
    if clipped > 0 {
        log::warn!(
            "{}: {clipped} rows have values beyond the last named column; those values are ignored",
            path.display()
        );
    }
    Ok(table)
}
