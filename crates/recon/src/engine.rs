use crate::config::{ColumnMapping, MatchingConfig, ReconConfig, RECOMMENDED_MIN_THRESHOLD};
use crate::error::ReconError;
use crate::matcher::match_records;
use crate::model::{
    Cell, KeyedRecord, NormalizedKey, ReconInput, ReconMeta, ReconResult, ReconSummary, Side,
    Table,
};
use crate::normalize::{normalize_tax_id, normalize_text, parse_amount, InvoiceNormalizer};

/// Column positions for one side, resolved against its headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedColumns {
    pub invoice: usize,
    pub party: usize,
    pub amount: usize,
    pub tax_id: Option<usize>,
}

/// Resolve a side's column mapping. Any unresolved column is fatal.
pub fn resolve_columns(
    side: Side,
    table: &Table,
    mapping: &ColumnMapping,
) -> Result<ResolvedColumns, ReconError> {
    if table.headers.is_empty() {
        return Err(ReconError::EmptyHeader { side });
    }
    Ok(ResolvedColumns {
        invoice: table.resolve_column(side, &mapping.invoice)?,
        party: table.resolve_column(side, &mapping.party)?,
        amount: table.resolve_column(side, &mapping.amount)?,
        tax_id: mapping
            .tax_id
            .as_deref()
            .map(|c| table.resolve_column(side, c))
            .transpose()?,
    })
}

/// Compute comparison keys and parsed amounts for every row of one side.
pub fn key_records(
    table: &Table,
    cols: &ResolvedColumns,
    invoices: &InvoiceNormalizer,
) -> Vec<KeyedRecord> {
    (0..table.len())
        .map(|row| KeyedRecord {
            row,
            key: NormalizedKey {
                invoice_key: invoices.normalize_cell(table.cell(row, cols.invoice)),
                party_key: normalize_text(table.cell(row, cols.party)),
                tax_id_key: match cols.tax_id {
                    Some(c) => normalize_tax_id(table.cell(row, c), true),
                    None => normalize_tax_id(&Cell::Empty, false),
                },
            },
            amount: parse_amount(table.cell(row, cols.amount)),
        })
        .collect()
}

fn check_size(side: Side, table: &Table, matching: &MatchingConfig) -> Result<(), ReconError> {
    if table.len() > matching.max_rows {
        return Err(ReconError::SizeExceeded {
            side,
            rows: table.len(),
            limit: matching.max_rows,
        });
    }
    Ok(())
}

/// Run reconciliation per config. Input-shape problems abort before matching;
/// per-row data problems only show up in the summary tallies.
pub fn run(config: &ReconConfig, input: &ReconInput) -> Result<ReconResult, ReconError> {
    config.validate()?;
    let matching = &config.matching;

    check_size(Side::Left, &input.left, matching)?;
    check_size(Side::Right, &input.right, matching)?;

    let left_cols = resolve_columns(Side::Left, &input.left, &config.left.columns)?;
    let right_cols = resolve_columns(Side::Right, &input.right, &config.right.columns)?;

    if matching.threshold < RECOMMENDED_MIN_THRESHOLD {
        log::warn!(
            "threshold {} is below the recommended floor of {}; expect loose party matches",
            matching.threshold,
            RECOMMENDED_MIN_THRESHOLD
        );
    }

    log::info!(
        "reconciling '{}': {} {} rows vs {} {} rows (policy {}, threshold {}, tolerance {})",
        config.name,
        input.left.len(),
        config.left_label(),
        input.right.len(),
        config.right_label(),
        matching.invoice_policy,
        matching.threshold,
        matching.amount_tolerance,
    );

    let invoices = InvoiceNormalizer::new(matching.invoice_policy, matching.separator_chars());
    let left = key_records(&input.left, &left_cols, &invoices);
    let right = key_records(&input.right, &right_cols, &invoices);

    let unparseable_amounts = left
        .iter()
        .chain(right.iter())
        .filter(|r| r.amount.is_none())
        .count();
    if unparseable_amounts > 0 {
        log::debug!("{unparseable_amounts} rows have amounts that do not parse");
    }

    let output = match_records(&left, &right, matching);

    let summary = ReconSummary {
        left_rows: left.len(),
        right_rows: right.len(),
        matched: output.matched.len(),
        unmatched_left: output.unmatched_left.len(),
        unmatched_right: output.unmatched_right.len(),
        unparseable_amounts,
        buckets: output.buckets,
        rejections: output.tally,
    };

    log::info!(
        "reconciled '{}': {} matched, {} unmatched {}, {} unmatched {}",
        config.name,
        summary.matched,
        summary.unmatched_left,
        config.left_label(),
        summary.unmatched_right,
        config.right_label(),
    );

    Ok(ReconResult {
        meta: ReconMeta {
            config_name: config.name.clone(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            invoice_policy: matching.invoice_policy,
            selection: matching.selection,
            threshold: matching.threshold,
            amount_tolerance: matching.amount_tolerance,
        },
        summary,
        matched: output.matched,
        unmatched_left: output.unmatched_left,
        unmatched_right: output.unmatched_right,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| Cell::text(*v)).collect())
                .collect(),
        }
    }

    fn config() -> ReconConfig {
        ReconConfig::from_mappings(
            "engine test",
            ColumnMapping::new("Invoice", "Party", "Amount", Some("GSTIN")),
            ColumnMapping::new("Inv No", "Supplier", "Taxable", None),
        )
    }

    #[test]
    fn resolve_missing_column_is_fatal() {
        let left = table(&["Invoice", "Party", "Amount"], &[]);
        let err = resolve_columns(Side::Left, &left, &config().left.columns).unwrap_err();
        assert!(matches!(err, ReconError::MissingColumn { ref column, .. } if column == "GSTIN"));
    }

    #[test]
    fn empty_header_is_fatal() {
        let err = resolve_columns(Side::Right, &Table::default(), &config().right.columns).unwrap_err();
        assert!(matches!(err, ReconError::EmptyHeader { side: Side::Right }));
    }

    #[test]
    fn absent_tax_column_yields_empty_keys() {
        let right = table(&["Inv No", "Supplier", "Taxable"], &[&["A-1", "Acme", "10"]]);
        let cols = resolve_columns(Side::Right, &right, &config().right.columns).unwrap();
        assert_eq!(cols.tax_id, None);
        let keyed = key_records(&right, &cols, &InvoiceNormalizer::default());
        assert_eq!(keyed[0].key.invoice_key, "a1");
        assert_eq!(keyed[0].key.party_key, "acme");
        assert_eq!(keyed[0].key.tax_id_key, "");
        assert_eq!(keyed[0].amount, Some(10.0));
    }

    #[test]
    fn run_partitions_rows() {
        let left = table(
            &["Invoice", "Party", "Amount", "GSTIN"],
            &[
                &["INV-1", "Acme", "100", "29AAA"],
                &["INV-2", "Beta", "oops", ""],
                &["INV-3", "Gamma", "300", ""],
            ],
        );
        let right = table(
            &["Inv No", "Supplier", "Taxable"],
            &[&["inv 1", "ACME LTD", "100.4"], &["INV2", "Beta", "200"], &["X", "Zeta", "1"]],
        );
        let result = run(&config(), &ReconInput { left, right }).unwrap();
        assert_eq!(result.summary.matched, 1);
        assert_eq!(result.matched[0].left_row, 0);
        assert_eq!(result.matched[0].right_row, 0);
        assert_eq!(result.unmatched_left, vec![1, 2]);
        assert_eq!(result.unmatched_right, vec![1, 2]);
        assert_eq!(result.summary.unparseable_amounts, 1);
        assert_eq!(result.summary.rejections.rejected_amount, 1);
        assert_eq!(result.summary.rejections.no_candidate, 1);
        assert!(!result.summary.is_reconciled());
        assert_eq!(result.meta.threshold, 80);
    }

    #[test]
    fn size_ceiling_fails_fast() {
        let mut cfg = config();
        cfg.matching.max_rows = 1;
        let left = table(&["Invoice", "Party", "Amount", "GSTIN"], &[&["1", "a", "1", ""], &["2", "b", "2", ""]]);
        let right = table(&["Inv No", "Supplier", "Taxable"], &[]);
        let err = run(&cfg, &ReconInput { left, right }).unwrap_err();
        assert!(matches!(err, ReconError::SizeExceeded { side: Side::Left, rows: 2, limit: 1 }));
    }
}
