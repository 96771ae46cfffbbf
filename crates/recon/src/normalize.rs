//! Canonical comparison keys for invoice numbers, party names and tax IDs.
//!
//! Everything here is total: missing or malformed input maps to an empty key,
//! never to an error.

use crate::config::InvoicePolicy;
use crate::model::Cell;

/// Invoice-number normalizer configured once per run and shared by both sides.
#[derive(Debug, Clone)]
pub struct InvoiceNormalizer {
    policy: InvoicePolicy,
    separators: Vec<char>,
}

impl InvoiceNormalizer {
    pub fn new(policy: InvoicePolicy, separators: Vec<char>) -> Self {
        Self { policy, separators }
    }

    pub fn policy(&self) -> InvoicePolicy {
        self.policy
    }

    pub fn normalize_cell(&self, cell: &Cell) -> String {
        if cell.is_empty() {
            return String::new();
        }
        self.normalize(&cell.to_string())
    }

    pub fn normalize(&self, raw: &str) -> String {
        match self.policy {
            InvoicePolicy::AlnumFold => alnum_fold(raw, &self.separators),
            InvoicePolicy::NumericSuffix => numeric_suffix(raw),
        }
    }
}

impl Default for InvoiceNormalizer {
    fn default() -> Self {
        Self::new(InvoicePolicy::AlnumFold, vec![' ', '-', '/'])
    }
}

/// Lower-case, then drop whitespace and every configured separator.
pub fn alnum_fold(raw: &str, separators: &[char]) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace() && !separators.contains(c))
        .collect()
}

/// Trailing numeric serial with any fiscal-year suffix removed.
///
/// `"INV-001/25-26"` and `"inv00125-26"` both become `"1"`.
pub fn numeric_suffix(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let mut s: &str = &lowered;
    loop {
        let trimmed = s.trim_end_matches(|c: char| !c.is_alphanumeric());
        match strip_fiscal_year(trimmed) {
            Some(rest) => s = rest,
            None => {
                s = trimmed;
                break;
            }
        }
    }

    let digits_start = s
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    s[digits_start..].trim_start_matches('0').to_string()
}

/// Remove a trailing `YY-YY`, `YYYY-YY` or `YYYY/YYYY` pair of consecutive years.
fn strip_fiscal_year(s: &str) -> Option<&str> {
    let bytes = s.as_bytes();
    let tail_len = bytes.iter().rev().take_while(|b| b.is_ascii_digit()).count();
    if tail_len != 2 && tail_len != 4 {
        return None;
    }
    let sep_idx = bytes.len().checked_sub(tail_len + 1)?;
    if bytes[sep_idx] != b'-' && bytes[sep_idx] != b'/' {
        return None;
    }
    let second: u32 = s[sep_idx + 1..].parse().ok()?;
    let head = &s[..sep_idx];
    let head_digits = head.bytes().rev().take_while(|b| b.is_ascii_digit()).count();

    // Two-digit first year unless the head clearly ends in a full 19xx/20xx year.
    for width in [4usize, 2] {
        if head_digits < width {
            continue;
        }
        let start = head.len() - width;
        let token = &head[start..];
        if width == 4 && !(token.starts_with("19") || token.starts_with("20")) {
            continue;
        }
        let first: u32 = match token.parse() {
            Ok(v) => v,
            Err(_) => continue,
        };
        if (first % 100 + 1) % 100 == second % 100 {
            return Some(&head[..start]);
        }
    }
    None
}

/// Lower-cased, trimmed free text; missing becomes empty.
pub fn normalize_text(cell: &Cell) -> String {
    if cell.is_empty() {
        return String::new();
    }
    cell.to_string().trim().to_lowercase()
}

/// Tax-ID key. When the column was not mapped on a side, every row is empty,
/// which turns the tax-ID gate into a pass for the whole run.
pub fn normalize_tax_id(cell: &Cell, present: bool) -> String {
    if !present {
        return String::new();
    }
    normalize_text(cell)
}

/// Parse an amount cell. Text may carry thousands separators (`1,23,456.50`).
/// Non-finite or unparseable values return `None`.
pub fn parse_amount(cell: &Cell) -> Option<f64> {
    let value = match cell {
        Cell::Empty => return None,
        Cell::Number(n) => *n,
        Cell::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            cleaned.parse::<f64>().ok()?
        }
    };
    value.is_finite().then_some(value)
}
