use thiserror::Error;

use crate::model::Side;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),
    /// Config validation error (bad threshold, empty column name, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),
    /// A mapped column is not present in the table headers.
    #[error("{side} table: missing column '{column}' (available: {})", available.join(", "))]
    MissingColumn {
        side: Side,
        column: String,
        available: Vec<String>,
    },
    /// Table has no header row at all.
    #[error("{side} table: no header row")]
    EmptyHeader { side: Side },
    /// Row-count ceiling exceeded.
    #[error("{side} table: {rows} rows exceeds the limit of {limit}")]
    SizeExceeded { side: Side, rows: usize, limit: usize },
}
