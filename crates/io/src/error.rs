use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IoError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("Excel error in {}: {source}", path.display())]
    Xlsx {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },
    /// Any failure while writing a report file.
    #[error("cannot write {}: {message}", path.display())]
    Export { path: PathBuf, message: String },
    #[error("{}: no sheet named '{sheet}' (available: {})", path.display(), available.join(", "))]
    UnknownSheet {
        path: PathBuf,
        sheet: String,
        available: Vec<String>,
    },
    #[error("{}: workbook contains no sheets", path.display())]
    NoSheets { path: PathBuf },
    #[error("{}: unsupported file type '{extension}' (expected csv, tsv, txt, xlsx, xlsm, xls, xlsb or ods)", path.display())]
    UnsupportedFormat { path: PathBuf, extension: String },
    /// Header row points past the end of the data.
    #[error("{}: header_row {header_row} is beyond the last row ({rows})", path.display())]
    HeaderRow {
        path: PathBuf,
        header_row: usize,
        rows: usize,
    },
}

impl IoError {
    pub(crate) fn export(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        IoError::Export {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
