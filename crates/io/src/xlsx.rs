// Excel import (calamine) and report workbook export (rust_xlsxwriter)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use ledgermatch_recon::model::Cell;
use ledgermatch_recon::report::{OutputTable, ReconReport};
use rust_xlsxwriter::{Format, Workbook as XlsxWorkbook, Worksheet};

use crate::error::IoError;

/// Excel's hard limit on sheet name length.
const MAX_SHEET_NAME: usize = 31;

/// Read one sheet (the first one unless `sheet` is given) into a grid of
/// cells, positioned as in the workbook even when the used range does not
/// start at A1.
pub fn read_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>, IoError> {
    let xlsx_err = |source| IoError::Xlsx {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook: Sheets<_> = open_workbook_auto(path).map_err(xlsx_err)?;
    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();

    let sheet_name = match sheet {
        Some(name) => sheet_names
            .iter()
            .find(|s| s.as_str() == name)
            .or_else(|| sheet_names.iter().find(|s| s.trim().eq_ignore_ascii_case(name.trim())))
            .cloned()
            .ok_or_else(|| IoError::UnknownSheet {
                path: path.to_path_buf(),
                sheet: name.to_string(),
                available: sheet_names.clone(),
            })?,
        None => sheet_names.first().cloned().ok_or_else(|| IoError::NoSheets {
            path: path.to_path_buf(),
        })?,
    };

    let range = workbook.worksheet_range(&sheet_name).map_err(xlsx_err)?;

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }

    log::debug!(
        "read sheet '{}' of {}: {} rows",
        sheet_name,
        path.display(),
        grid.len()
    );
    Ok(grid)
}

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::text(if *b { "TRUE" } else { "FALSE" }),
        Data::Error(e) => Cell::text(format!("#{e:?}")),
        // Dates keep their serial number; nothing downstream reads them as dates
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) => Cell::text(s.as_str()),
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

/// Excel rejects `[]:*?/\` in sheet names and anything over 31 chars.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if "[]:*?/\\".contains(c) { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect();
    let cleaned = cleaned.trim_matches('\'').to_string();
    if cleaned.is_empty() {
        "Sheet".to_string()
    } else {
        cleaned
    }
}

/// Append ` (2)`, ` (3)`, ... until `name` differs from every sheet in `used`.
/// Excel compares sheet names case-insensitively.
fn unique_sheet_name(name: &str, used: &[String]) -> String {
    let taken = |candidate: &str| {
        let candidate = candidate.to_lowercase();
        used.iter().any(|u| u.to_lowercase() == candidate)
    };
    if !taken(name) {
        return name.to_string();
    }
    let mut n = 2usize;
    loop {
        let suffix = format!(" ({n})");
        let base: String = name.chars().take(MAX_SHEET_NAME - suffix.len()).collect();
        let candidate = format!("{base}{suffix}");
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

fn write_table(worksheet: &mut Worksheet, table: &OutputTable, header: &Format) -> Result<(), String> {
    for (col, name) in table.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, name, header)
            .map_err(|e| e.to_string())?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            match cell {
                Cell::Empty => {}
                Cell::Number(n) if n.is_finite() => {
                    worksheet
                        .write_number(row_num, col as u16, *n)
                        .map_err(|e| e.to_string())?;
                }
                Cell::Number(_) => {}
                Cell::Text(s) => {
                    worksheet
                        .write_string(row_num, col as u16, s)
                        .map_err(|e| e.to_string())?;
                }
            }
        }
    }

    worksheet.set_freeze_panes(1, 0).map_err(|e| e.to_string())?;
    Ok(())
}

/// Write the report as a three-sheet workbook: Matched, then the unmatched
/// rows of each side.
pub fn export_report(report: &ReconReport, path: &Path) -> Result<(), IoError> {
    let mut xlsx_workbook = XlsxWorkbook::new();
    let header = Format::new().set_bold();

    let mut used: Vec<String> = Vec::new();
    for table in report.tables() {
        let name = unique_sheet_name(&sanitize_sheet_name(&table.name), &used);
        used.push(name.clone());
        let worksheet = xlsx_workbook
            .add_worksheet()
            .set_name(&name)
            .map_err(|e| IoError::export(path, format!("failed to create sheet '{name}': {e}")))?;
        write_table(worksheet, table, &header)
            .map_err(|e| IoError::export(path, format!("sheet '{name}': {e}")))?;
    }

    xlsx_workbook
        .save(path)
        .map_err(|e| IoError::export(path, e))?;
    Ok(())
}
