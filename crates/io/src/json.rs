// JSON report export

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use ledgermatch_recon::model::{Cell, ReconMeta, ReconResult, ReconSummary};
use ledgermatch_recon::report::{OutputTable, ReconReport};
use serde::Serialize;

use crate::error::IoError;

/// A report table without its sheet name.
#[derive(Debug, Serialize)]
pub struct JsonTable<'a> {
    pub columns: &'a [String],
    pub rows: &'a [Vec<Cell>],
}

impl<'a> From<&'a OutputTable> for JsonTable<'a> {
    fn from(table: &'a OutputTable) -> Self {
        JsonTable {
            columns: &table.columns,
            rows: &table.rows,
        }
    }
}

/// Top-level JSON document: run metadata, summary counts, and the three tables.
#[derive(Debug, Serialize)]
pub struct ReconDocument<'a> {
    pub meta: &'a ReconMeta,
    pub summary: &'a ReconSummary,
    pub matched: JsonTable<'a>,
    pub unmatched_left: JsonTable<'a>,
    pub unmatched_right: JsonTable<'a>,
}

impl<'a> ReconDocument<'a> {
    pub fn new(result: &'a ReconResult, report: &'a ReconReport) -> Self {
        ReconDocument {
            meta: &result.meta,
            summary: &result.summary,
            matched: (&report.matched).into(),
            unmatched_left: (&report.unmatched_left).into(),
            unmatched_right: (&report.unmatched_right).into(),
        }
    }

    pub fn to_string_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

pub fn export(document: &ReconDocument<'_>, path: &Path) -> Result<(), IoError> {
    let file = File::create(path).map_err(|e| IoError::export(path, e))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, document).map_err(|e| IoError::export(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgermatch_recon::config::ColumnMapping;
    use ledgermatch_recon::model::{ReconInput, Table};
    use ledgermatch_recon::ReconConfig;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_json_export() {
        let config = ReconConfig::from_mappings(
            "json",
            ColumnMapping::new("Invoice", "Party", "Amount", None),
            ColumnMapping::new("Invoice", "Party", "Amount", None),
        );
        let headers = vec!["Invoice".to_string(), "Party".to_string(), "Amount".to_string()];
        let mut left = Table::new(headers.clone());
        left.rows.push(vec![Cell::text("A-1"), Cell::text("Acme"), Cell::Number(100.0)]);
        left.rows.push(vec![Cell::text("A-9"), Cell::text("Zed"), Cell::Number(5.0)]);
        let mut right = Table::new(headers);
        right.rows.push(vec![Cell::text("a1"), Cell::text("Acme"), Cell::Number(100.0)]);
        let input = ReconInput { left, right };

        let result = ledgermatch_recon::run(&config, &input).unwrap();
        let report = ReconReport::build(&config, &input, &result).unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("recon.json");
        export(&ReconDocument::new(&result, &report), &path).unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed["meta"]["config_name"], "json");
        assert_eq!(parsed["summary"]["matched"], 1);
        assert_eq!(parsed["summary"]["unmatched_left"], 1);
        assert_eq!(parsed["matched"]["columns"][0], "Invoice");
        assert_eq!(parsed["matched"]["rows"][0][0], "A-1");
        assert_eq!(parsed["unmatched_left"]["rows"][0], serde_json::json!(["A-9", "Zed", 5.0]));
        assert!(parsed["unmatched_right"]["rows"].as_array().unwrap().is_empty());
        assert!(parsed["matched"].get("name").is_none());
    }
}
