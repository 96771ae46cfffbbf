use serde::{Deserialize, Serialize};

use crate::error::ReconError;

/// Default strictness for the party-name gate.
pub const DEFAULT_THRESHOLD: u8 = 80;

/// Lowest threshold the tool recommends. Lower values are accepted with a warning.
pub const RECOMMENDED_MIN_THRESHOLD: u8 = 50;

/// Absolute amount tolerance, in the units of the mapped amount columns.
pub const DEFAULT_AMOUNT_TOLERANCE: f64 = 1000.0;

/// Per-side row ceiling. Larger inputs fail fast instead of degrading.
pub const DEFAULT_MAX_ROWS: usize = 1_000_000;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReconConfig {
    pub name: String,
    pub left: SideConfig,
    pub right: SideConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

// ---------------------------------------------------------------------------
// Sides
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SideConfig {
    /// Shown in report headers, e.g. "Party (Purchase)".
    #[serde(default)]
    pub label: Option<String>,
    pub file: String,
    /// Worksheet name for workbook inputs. First sheet when absent.
    #[serde(default)]
    pub sheet: Option<String>,
    /// 1-based row holding the column names.
    #[serde(default = "default_header_row")]
    pub header_row: usize,
    pub columns: ColumnMapping,
}

fn default_header_row() -> usize {
    1
}

/// User-chosen columns for one side.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnMapping {
    pub invoice: String,
    pub party: String,
    pub amount: String,
    #[serde(default)]
    pub tax_id: Option<String>,
}

impl ColumnMapping {
    pub fn new(invoice: &str, party: &str, amount: &str, tax_id: Option<&str>) -> Self {
        Self {
            invoice: invoice.into(),
            party: party.into(),
            amount: amount.into(),
            tax_id: tax_id.map(Into::into),
        }
    }
}

// ---------------------------------------------------------------------------
// Matching
// ---------------------------------------------------------------------------

/// Invoice-number normalization. Both sides always use the same policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvoicePolicy {
    /// Lower-case, drop whitespace and separator characters.
    #[default]
    AlnumFold,
    /// Strip a trailing fiscal-year pair, keep the trailing digit run.
    NumericSuffix,
}

impl std::fmt::Display for InvoicePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlnumFold => write!(f, "alnum_fold"),
            Self::NumericSuffix => write!(f, "numeric_suffix"),
        }
    }
}

impl std::str::FromStr for InvoicePolicy {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "alnum_fold" => Ok(Self::AlnumFold),
            "numeric_suffix" => Ok(Self::NumericSuffix),
            other => Err(ReconError::ConfigValidation(format!(
                "unknown invoice policy \"{other}\" (expected \"alnum_fold\" or \"numeric_suffix\")"
            ))),
        }
    }
}

/// Which passing candidate claims the left row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// First passing candidate in right-table order.
    #[default]
    FirstMatch,
    /// Highest party score; ties go to the lower right row index.
    BestScore,
}

impl std::fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstMatch => write!(f, "first_match"),
            Self::BestScore => write!(f, "best_score"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatchingConfig {
    #[serde(default = "default_threshold")]
    pub threshold: u8,
    #[serde(default = "default_amount_tolerance")]
    pub amount_tolerance: f64,
    #[serde(default)]
    pub invoice_policy: InvoicePolicy,
    /// Characters removed by `alnum_fold`, one entry per separator.
    #[serde(default = "default_separators")]
    pub separators: Vec<String>,
    #[serde(default)]
    pub selection: SelectionPolicy,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

fn default_threshold() -> u8 {
    DEFAULT_THRESHOLD
}

fn default_amount_tolerance() -> f64 {
    DEFAULT_AMOUNT_TOLERANCE
}

fn default_separators() -> Vec<String> {
    vec![" ".into(), "-".into(), "/".into()]
}

fn default_parallel() -> bool {
    true
}

fn default_max_rows() -> usize {
    DEFAULT_MAX_ROWS
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            amount_tolerance: DEFAULT_AMOUNT_TOLERANCE,
            invoice_policy: InvoicePolicy::default(),
            separators: default_separators(),
            selection: SelectionPolicy::default(),
            parallel: true,
            max_rows: DEFAULT_MAX_ROWS,
        }
    }
}

impl MatchingConfig {
    /// Separator characters for `alnum_fold`.
    pub fn separator_chars(&self) -> Vec<char> {
        self.separators.iter().flat_map(|s| s.chars()).collect()
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub xlsx: Option<String>,
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv_dir: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config = Self::parse(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Deserialize without validating, for callers that adjust the config
    /// before calling [`ReconConfig::validate`].
    pub fn parse(input: &str) -> Result<Self, ReconError> {
        toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))
    }

    /// Build a config in code, for callers that skip the TOML layer.
    pub fn from_mappings(name: &str, left: ColumnMapping, right: ColumnMapping) -> Self {
        let side = |columns| SideConfig {
            label: None,
            file: String::new(),
            sheet: None,
            header_row: 1,
            columns,
        };
        Self {
            name: name.into(),
            left: side(left),
            right: side(right),
            matching: MatchingConfig::default(),
            output: OutputConfig::default(),
        }
    }

    pub fn left_label(&self) -> &str {
        self.left.label.as_deref().unwrap_or("Purchase")
    }

    pub fn right_label(&self) -> &str {
        self.right.label.as_deref().unwrap_or("GSTR2B")
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let m = &self.matching;

        if m.threshold > 100 {
            return Err(ReconError::ConfigValidation(format!(
                "threshold must be between 0 and 100, got {}",
                m.threshold
            )));
        }

        if !m.amount_tolerance.is_finite() || m.amount_tolerance < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "amount_tolerance must be a finite, non-negative number, got {}",
                m.amount_tolerance
            )));
        }

        if m.max_rows == 0 {
            return Err(ReconError::ConfigValidation("max_rows must be at least 1".into()));
        }

        if m.separators.iter().any(|s| s.is_empty()) {
            return Err(ReconError::ConfigValidation(
                "separators must not contain empty strings".into(),
            ));
        }

        for (side_name, side) in [("left", &self.left), ("right", &self.right)] {
            if side.header_row == 0 {
                return Err(ReconError::ConfigValidation(format!(
                    "{side_name}: header_row is 1-based, got 0"
                )));
            }
            let c = &side.columns;
            for (field, value) in [
                ("invoice", Some(&c.invoice)),
                ("party", Some(&c.party)),
                ("amount", Some(&c.amount)),
                ("tax_id", c.tax_id.as_ref()),
            ] {
                if let Some(v) = value {
                    if v.trim().is_empty() {
                        return Err(ReconError::ConfigValidation(format!(
                            "{side_name}.columns.{field} must not be empty"
                        )));
                    }
                }
            }
        }

        // Labels name the report sheets and the party/amount columns
        if self.left_label().trim().to_lowercase() == self.right_label().trim().to_lowercase() {
            return Err(ReconError::ConfigValidation(format!(
                "left and right labels must differ, both are '{}'",
                self.left_label()
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "April 2B"

[left]
label = "Purchase"
file = "purchase.xlsx"
sheet = "Register"

[left.columns]
invoice = "Invoice No"
party   = "Party Name"
amount  = "Taxable Value"
tax_id  = "GSTIN"

[right]
label = "GSTR2B"
file = "gstr2b.csv"
header_row = 3

[right.columns]
invoice = "Invoice number"
party   = "Trade/Legal name"
amount  = "Taxable Value"

[matching]
threshold = 85
amount_tolerance = 10.0
invoice_policy = "numeric_suffix"
selection = "best_score"
"#;

    #[test]
    fn parse_valid() {
        let config = ReconConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "April 2B");
        assert_eq!(config.left.sheet.as_deref(), Some("Register"));
        assert_eq!(config.left.header_row, 1);
        assert_eq!(config.right.header_row, 3);
        assert_eq!(config.left.columns.tax_id.as_deref(), Some("GSTIN"));
        assert!(config.right.columns.tax_id.is_none());
        assert_eq!(config.matching.threshold, 85);
        assert_eq!(config.matching.amount_tolerance, 10.0);
        assert_eq!(config.matching.invoice_policy, InvoicePolicy::NumericSuffix);
        assert_eq!(config.matching.selection, SelectionPolicy::BestScore);
        assert!(config.matching.parallel);
        assert!(config.output.xlsx.is_none());
    }

    #[test]
    fn matching_defaults() {
        let input = r#"
name = "Defaults"
[left]
file = "a.csv"
[left.columns]
invoice = "inv"
party = "party"
amount = "amt"
[right]
file = "b.csv"
[right.columns]
invoice = "inv"
party = "party"
amount = "amt"
"#;
        let config = ReconConfig::from_toml(input).unwrap();
        assert_eq!(config.matching.threshold, DEFAULT_THRESHOLD);
        assert_eq!(config.matching.amount_tolerance, DEFAULT_AMOUNT_TOLERANCE);
        assert_eq!(config.matching.invoice_policy, InvoicePolicy::AlnumFold);
        assert_eq!(config.matching.selection, SelectionPolicy::FirstMatch);
        assert_eq!(config.matching.max_rows, DEFAULT_MAX_ROWS);
        assert_eq!(config.matching.separator_chars(), vec![' ', '-', '/']);
        assert_eq!(config.left_label(), "Purchase");
        assert_eq!(config.right_label(), "GSTR2B");
    }

    #[test]
    fn reject_threshold_over_100() {
        let input = VALID.replace("threshold = 85", "threshold = 101");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("threshold must be between 0 and 100"));
    }

    #[test]
    fn reject_negative_tolerance() {
        let input = VALID.replace("amount_tolerance = 10.0", "amount_tolerance = -1.0");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("amount_tolerance"));
    }

    #[test]
    fn reject_unknown_policy() {
        let input = VALID.replace("\"numeric_suffix\"", "\"suffix\"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigParse(_)));
    }

    #[test]
    fn reject_zero_header_row() {
        let input = VALID.replace("header_row = 3", "header_row = 0");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("right: header_row"));
    }

    #[test]
    fn reject_blank_column() {
        let input = VALID.replace("tax_id  = \"GSTIN\"", "tax_id  = \" \"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(err.to_string().contains("left.columns.tax_id"));
    }

    #[test]
    fn reject_same_label_on_both_sides() {
        let input = VALID.replace("label = \"GSTR2B\"", "label = \"purchase \"");
        let err = ReconConfig::from_toml(&input).unwrap_err();
        assert!(matches!(err, ReconError::ConfigValidation(_)));
        assert!(err.to_string().contains("labels must differ"));
    }

    #[test]
    fn reject_unknown_field() {
        let input = format!("{VALID}\nstrictness = 3\n");
        assert!(ReconConfig::from_toml(&input).is_err());
    }

    #[test]
    fn policy_from_str() {
        assert_eq!("alnum_fold".parse::<InvoicePolicy>().unwrap(), InvoicePolicy::AlnumFold);
        assert!("loose".parse::<InvoicePolicy>().is_err());
    }
}
