// CSV/TSV import and report export

use std::io::Read;
use std::path::Path;

use ledgermatch_recon::model::Cell;
use ledgermatch_recon::report::{OutputTable, ReconReport};

use crate::error::IoError;

/// File names written by [`export_report`].
pub const MATCHED_FILE: &str = "matched.csv";
pub const UNMATCHED_LEFT_FILE: &str = "unmatched_left.csv";
pub const UNMATCHED_RIGHT_FILE: &str = "unmatched_right.csv";

/// Read a delimited file into a grid of text cells. Without an explicit
/// delimiter the file is sniffed.
pub fn read_grid(path: &Path, delimiter: Option<u8>) -> Result<Vec<Vec<Cell>>, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = delimiter.unwrap_or_else(|| sniff_delimiter(&content));
    grid_from_str(&content, delimiter).map_err(|source| IoError::Csv {
        path: path.to_path_buf(),
        source,
    })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        let target = match counts.first() {
            Some(&n) if n > 1 => n,
            _ => continue,
        };
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed. Registers exported from Excel
/// are often Windows-1252.
fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let open_err = |source| IoError::Open {
        path: path.to_path_buf(),
        source,
    };
    let mut file = std::fs::File::open(path).map_err(open_err)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(open_err)?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s.strip_prefix('\u{feff}').map(str::to_string).unwrap_or(s)),
        Err(e) => {
            log::debug!("{} is not UTF-8, decoding as Windows-1252", path.display());
            let bytes = e.into_bytes();
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn grid_from_str(content: &str, delimiter: u8) -> Result<Vec<Vec<Cell>>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut grid = Vec::new();
    for result in reader.records() {
        let record = result?;
        grid.push(record.iter().map(Cell::text).collect());
    }
    Ok(grid)
}

/// Write one output table as CSV with a header line.
pub fn export_table(table: &OutputTable, path: &Path) -> Result<(), IoError> {
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| IoError::export(path, e))?;

    writer
        .write_record(&table.columns)
        .map_err(|e| IoError::export(path, e))?;
    for row in &table.rows {
        let mut record: Vec<String> = row.iter().map(|c| c.to_string()).collect();
        record.resize(table.columns.len(), String::new());
        writer
            .write_record(&record)
            .map_err(|e| IoError::export(path, e))?;
    }

    writer.flush().map_err(|e| IoError::export(path, e))?;
    Ok(())
}

/// Write the three report tables into `dir`, creating it if needed.
pub fn export_report(report: &ReconReport, dir: &Path) -> Result<(), IoError> {
    std::fs::create_dir_all(dir).map_err(|e| IoError::export(dir, e))?;
    export_table(&report.matched, &dir.join(MATCHED_FILE))?;
    export_table(&report.unmatched_left, &dir.join(UNMATCHED_LEFT_FILE))?;
    export_table(&report.unmatched_right, &dir.join(UNMATCHED_RIGHT_FILE))?;
    Ok(())
}
