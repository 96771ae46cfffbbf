use serde::Serialize;

use crate::config::{InvoicePolicy, SelectionPolicy};
use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Cells + tables
// ---------------------------------------------------------------------------

/// A single scalar cell as delivered by the loader.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            Cell::Number(n) => n.is_nan(),
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            // Integers without decimals, the way a spreadsheet shows them
            Cell::Number(n) if n.is_nan() => Ok(()),
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

/// Which ledger a table, row, or error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// A loaded table: ordered headers plus rows of cells.
///
/// Rows may be shorter than the header; missing trailing cells read as empty.
#[derive(Debug, Clone, Default)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Locate a mapped column. Exact header match wins; otherwise the first
    /// header equal after trimming and case-folding.
    pub fn resolve_column(&self, side: Side, name: &str) -> Result<usize, ReconError> {
        if let Some(idx) = self.headers.iter().position(|h| h == name) {
            return Ok(idx);
        }
        let wanted = name.trim().to_lowercase();
        self.headers
            .iter()
            .position(|h| h.trim().to_lowercase() == wanted)
            .ok_or_else(|| ReconError::MissingColumn {
                side,
                column: name.to_string(),
                available: self.headers.clone(),
            })
    }
}

/// The two ledgers handed to the engine.
pub struct ReconInput {
    pub left: Table,
    pub right: Table,
}

// ---------------------------------------------------------------------------
// Normalized keys
// ---------------------------------------------------------------------------

/// Canonical comparison keys for one record. Rebuilt every run.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NormalizedKey {
    pub invoice_key: String,
    pub party_key: String,
    pub tax_id_key: String,
}

/// A record reduced to what the matcher needs.
#[derive(Debug, Clone)]
pub struct KeyedRecord {
    pub row: usize,
    pub key: NormalizedKey,
    /// `None` when the amount cell did not parse.
    pub amount: Option<f64>,
}

// ---------------------------------------------------------------------------
// Matching output
// ---------------------------------------------------------------------------

/// Accepted link between one left row and one right row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchedPair {
    pub left_row: usize,
    pub right_row: usize,
    pub fuzzy_score: u8,
    pub amount_diff: f64,
    pub tax_id_match: bool,
}

/// Why candidates were turned down. Absorbs per-row data problems.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RejectionTally {
    pub no_candidate: usize,
    pub candidates_scored: usize,
    pub rejected_party: usize,
    pub rejected_amount: usize,
    pub rejected_tax_id: usize,
}

impl RejectionTally {
    pub fn absorb(&mut self, other: &RejectionTally) {
        self.no_candidate += other.no_candidate;
        self.candidates_scored += other.candidates_scored;
        self.rejected_party += other.rejected_party;
        self.rejected_amount += other.rejected_amount;
        self.rejected_tax_id += other.rejected_tax_id;
    }
}

#[derive(Debug)]
pub struct MatchOutput {
    pub matched: Vec<MatchedPair>,
    pub unmatched_left: Vec<usize>,
    pub unmatched_right: Vec<usize>,
    pub tally: RejectionTally,
    pub buckets: usize,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub left_rows: usize,
    pub right_rows: usize,
    pub matched: usize,
    pub unmatched_left: usize,
    pub unmatched_right: usize,
    pub unparseable_amounts: usize,
    pub buckets: usize,
    pub rejections: RejectionTally,
}

impl ReconSummary {
    pub fn is_reconciled(&self) -> bool {
        self.unmatched_left == 0 && self.unmatched_right == 0
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    pub invoice_policy: InvoicePolicy,
    pub selection: SelectionPolicy,
    pub threshold: u8,
    pub amount_tolerance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub matched: Vec<MatchedPair>,
    pub unmatched_left: Vec<usize>,
    pub unmatched_right: Vec<usize>,
}
