//! Report tables handed to exporters: Matched, UnmatchedLeft, UnmatchedRight.

use serde::Serialize;

use crate::config::ReconConfig;
use crate::engine::resolve_columns;
use crate::error::ReconError;
use crate::model::{Cell, ReconInput, ReconResult, Side};

/// A named, rectangular table of cells.
#[derive(Debug, Clone, Serialize)]
pub struct OutputTable {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl OutputTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub matched: OutputTable,
    pub unmatched_left: OutputTable,
    pub unmatched_right: OutputTable,
}

/// Column headers of the Matched table for the given side labels.
pub fn matched_columns(left_label: &str, right_label: &str) -> Vec<String> {
    vec![
        "Invoice".to_string(),
        format!("Party ({left_label})"),
        format!("Party ({right_label})"),
        format!("Amount ({left_label})"),
        format!("Amount ({right_label})"),
        "Difference".to_string(),
        "Fuzzy Score".to_string(),
        "GSTIN Match".to_string(),
    ]
}

impl ReconReport {
    /// Assemble the three tables. Unmatched tables keep every original column
    /// and the original row order.
    pub fn build(
        config: &ReconConfig,
        input: &ReconInput,
        result: &ReconResult,
    ) -> Result<Self, ReconError> {
        let left_label = config.left_label();
        let right_label = config.right_label();
        let lc = resolve_columns(Side::Left, &input.left, &config.left.columns)?;
        let rc = resolve_columns(Side::Right, &input.right, &config.right.columns)?;

        let matched_rows = result
            .matched
            .iter()
            .map(|m| {
                let l = |col| input.left.cell(m.left_row, col).clone();
                let r = |col| input.right.cell(m.right_row, col).clone();
                vec![
                    l(lc.invoice),
                    l(lc.party),
                    r(rc.party),
                    l(lc.amount),
                    r(rc.amount),
                    Cell::Number(m.amount_diff),
                    Cell::Number(f64::from(m.fuzzy_score)),
                    Cell::Text(if m.tax_id_match { "TRUE" } else { "FALSE" }.to_string()),
                ]
            })
            .collect();

        let copy_rows = |table: &crate::model::Table, rows: &[usize]| -> Vec<Vec<Cell>> {
            rows.iter()
                .map(|&row| (0..table.headers.len()).map(|c| table.cell(row, c).clone()).collect())
                .collect()
        };

        Ok(Self {
            matched: OutputTable {
                name: "Matched".to_string(),
                columns: matched_columns(left_label, right_label),
                rows: matched_rows,
            },
            unmatched_left: OutputTable {
                name: format!("Unmatched_{left_label}"),
                columns: input.left.headers.clone(),
                rows: copy_rows(&input.left, &result.unmatched_left),
            },
            unmatched_right: OutputTable {
                name: format!("Unmatched_{right_label}"),
                columns: input.right.headers.clone(),
                rows: copy_rows(&input.right, &result.unmatched_right),
            },
        })
    }

    pub fn tables(&self) -> [&OutputTable; 3] {
        [&self.matched, &self.unmatched_left, &self.unmatched_right]
    }
}
