//! `lmatch` commands: config-driven purchase register vs GSTR-2B reconciliation.

use std::path::{Path, PathBuf};

use clap::Subcommand;
use ledgermatch_io::json::ReconDocument;
use ledgermatch_io::IoError;
use ledgermatch_recon::engine::resolve_columns;
use ledgermatch_recon::model::{ReconInput, Side, Table};
use ledgermatch_recon::normalize::{normalize_text, InvoiceNormalizer};
use ledgermatch_recon::{fuzz, Cell, InvoicePolicy, ReconConfig, ReconError, ReconReport};

use crate::exit_codes::{
    EXIT_RECON_INPUT, EXIT_RECON_INVALID_CONFIG, EXIT_RECON_OUTPUT, EXIT_RECON_UNMATCHED,
};
use crate::CliError;

#[derive(Subcommand)]
pub enum ReconCommands {
    /// Reconcile the two ledgers named in a TOML config file
    #[command(after_help = "\
Examples:
  lmatch run april.toml
  lmatch run april.toml --xlsx april-recon.xlsx
  lmatch run april.toml --json > april.json
  lmatch run april.toml --policy numeric_suffix --threshold 85 --csv-dir out/")]
    Run {
        /// Path to the reconciliation config (.toml)
        config: PathBuf,

        /// Output JSON to stdout instead of human summary
        #[arg(long)]
        json: bool,

        /// Write JSON output to file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the Matched / Unmatched workbook
        #[arg(long)]
        xlsx: Option<PathBuf>,

        /// Write matched.csv, unmatched_left.csv and unmatched_right.csv here
        #[arg(long)]
        csv_dir: Option<PathBuf>,

        /// Party-name similarity threshold (0-100), overrides the config
        #[arg(long)]
        threshold: Option<u8>,

        /// Absolute amount tolerance, overrides the config
        #[arg(long)]
        tolerance: Option<f64>,

        /// Invoice normalization policy: alnum_fold or numeric_suffix
        #[arg(long, value_parser = parse_policy)]
        policy: Option<InvoicePolicy>,

        /// Suppress the summary on stderr
        #[arg(long, short = 'q')]
        quiet: bool,
    },

    /// Check a config and the headers of both ledgers without matching
    #[command(after_help = "\
Examples:
  lmatch validate april.toml")]
    Validate {
        /// Path to the reconciliation config (.toml)
        config: PathBuf,
    },

    /// Show how similar two party names are
    #[command(after_help = "\
Examples:
  lmatch score 'Acme Traders' 'ACME TRADERS PVT LTD'")]
    Score {
        a: String,
        b: String,

        /// Output JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Show the join key an invoice number normalizes to
    #[command(after_help = "\
Examples:
  lmatch normalize 'INV-001/25-26'
  lmatch normalize 'INV-001/25-26' --policy numeric_suffix")]
    Normalize {
        value: String,

        #[arg(long, value_parser = parse_policy, default_value = "alnum_fold")]
        policy: InvoicePolicy,

        /// Characters dropped by alnum_fold
        #[arg(long, default_value = " -/")]
        separators: String,
    },
}

pub fn cmd_recon(cmd: ReconCommands) -> Result<(), CliError> {
    match cmd {
        ReconCommands::Run {
            config,
            json,
            output,
            xlsx,
            csv_dir,
            threshold,
            tolerance,
            policy,
            quiet,
        } => {
            let overrides = Overrides { threshold, tolerance, policy };
            let outputs = OutputTargets { json_file: output, xlsx, csv_dir };
            cmd_recon_run(config, overrides, outputs, json, quiet)
        }
        ReconCommands::Validate { config } => cmd_recon_validate(config),
        ReconCommands::Score { a, b, json } => cmd_score(&a, &b, json),
        ReconCommands::Normalize { value, policy, separators } => {
            cmd_normalize(&value, policy, &separators)
        }
    }
}

fn parse_policy(s: &str) -> Result<InvoicePolicy, String> {
    s.parse::<InvoicePolicy>().map_err(|e| e.to_string())
}

fn recon_err(code: u8, msg: impl Into<String>) -> CliError {
    CliError { code, message: msg.into(), hint: None }
}

/// Exit code for an engine error: config problems vs input problems.
fn engine_err(err: ReconError) -> CliError {
    let code = match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_RECON_INVALID_CONFIG,
        ReconError::MissingColumn { .. }
        | ReconError::EmptyHeader { .. }
        | ReconError::SizeExceeded { .. } => EXIT_RECON_INPUT,
    };
    let hint = match &err {
        ReconError::MissingColumn { .. } => Some("check the [left.columns] / [right.columns] names and header_row"),
        ReconError::SizeExceeded { .. } => Some("raise [matching].max_rows if the ledger really is this large"),
        _ => None,
    };
    let cli_err = recon_err(code, err.to_string());
    match hint {
        Some(h) => cli_err.with_hint(h),
        None => cli_err,
    }
}

fn input_err(err: IoError) -> CliError {
    let hint = match &err {
        IoError::UnknownSheet { .. } => Some("set [left].sheet / [right].sheet to one of the listed sheets"),
        IoError::HeaderRow { .. } => Some("header_row is 1-based"),
        _ => None,
    };
    let cli_err = recon_err(EXIT_RECON_INPUT, err.to_string());
    match hint {
        Some(h) => cli_err.with_hint(h),
        None => cli_err,
    }
}

struct Overrides {
    threshold: Option<u8>,
    tolerance: Option<f64>,
    policy: Option<InvoicePolicy>,
}

struct OutputTargets {
    json_file: Option<PathBuf>,
    xlsx: Option<PathBuf>,
    csv_dir: Option<PathBuf>,
}

/// Read and parse the config. Command-line overrides are applied before
/// validation so an override cannot sneak past the range checks.
fn load_config(config_path: &Path, overrides: &Overrides) -> Result<ReconConfig, CliError> {
    let config_str = std::fs::read_to_string(config_path).map_err(|e| {
        recon_err(
            EXIT_RECON_INVALID_CONFIG,
            format!("cannot read config {}: {e}", config_path.display()),
        )
    })?;

    let mut config = ReconConfig::parse(&config_str).map_err(engine_err)?;
    if let Some(t) = overrides.threshold {
        config.matching.threshold = t;
    }
    if let Some(t) = overrides.tolerance {
        config.matching.amount_tolerance = t;
    }
    if let Some(p) = overrides.policy {
        config.matching.invoice_policy = p;
    }
    config.validate().map_err(engine_err)?;
    Ok(config)
}

/// Directory that relative paths inside the config resolve against.
fn base_dir(config_path: &Path) -> &Path {
    config_path.parent().unwrap_or_else(|| Path::new("."))
}

fn load_inputs(config: &ReconConfig, base_dir: &Path) -> Result<ReconInput, CliError> {
    let load = |side: &ledgermatch_recon::config::SideConfig| -> Result<Table, CliError> {
        let path = base_dir.join(&side.file);
        ledgermatch_io::load_table(&path, side.sheet.as_deref(), side.header_row).map_err(input_err)
    };
    Ok(ReconInput {
        left: load(&config.left)?,
        right: load(&config.right)?,
    })
}

fn cmd_recon_run(
    config_path: PathBuf,
    overrides: Overrides,
    outputs: OutputTargets,
    json_output: bool,
    quiet: bool,
) -> Result<(), CliError> {
    let config = load_config(&config_path, &overrides)?;
    let base_dir = base_dir(&config_path);
    let input = load_inputs(&config, base_dir)?;

    let result = ledgermatch_recon::run(&config, &input).map_err(engine_err)?;
    let report = ReconReport::build(&config, &input, &result).map_err(engine_err)?;

    // Command-line paths are relative to the working directory, config paths
    // to the config file
    let from_config = |p: &Option<String>| p.as_ref().map(|p| base_dir.join(p));
    let xlsx_path = outputs.xlsx.or_else(|| from_config(&config.output.xlsx));
    let csv_dir = outputs.csv_dir.or_else(|| from_config(&config.output.csv_dir));
    let json_path = outputs.json_file.or_else(|| from_config(&config.output.json));

    let output_err = |e: IoError| recon_err(EXIT_RECON_OUTPUT, e.to_string());

    if let Some(ref path) = xlsx_path {
        ledgermatch_io::xlsx::export_report(&report, path).map_err(output_err)?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if let Some(ref dir) = csv_dir {
        ledgermatch_io::csv::export_report(&report, dir).map_err(output_err)?;
        if !quiet {
            eprintln!("wrote {}", dir.display());
        }
    }

    let document = ReconDocument::new(&result, &report);
    if let Some(ref path) = json_path {
        ledgermatch_io::json::export(&document, path).map_err(output_err)?;
        if !quiet {
            eprintln!("wrote {}", path.display());
        }
    }

    if json_output {
        let json_str = document
            .to_string_pretty()
            .map_err(|e| recon_err(EXIT_RECON_OUTPUT, format!("JSON serialization error: {e}")))?;
        println!("{json_str}");
    }

    // Human summary to stderr
    let s = &result.summary;
    if !quiet {
        eprintln!(
            "recon '{}': {} {} rows vs {} {} rows: {} matched, {} unmatched {}, {} unmatched {}",
            config.name,
            s.left_rows,
            config.left_label(),
            s.right_rows,
            config.right_label(),
            s.matched,
            s.unmatched_left,
            config.left_label(),
            s.unmatched_right,
            config.right_label(),
        );
        let r = &s.rejections;
        if r.candidates_scored > 0 || r.no_candidate > 0 {
            eprintln!(
                "rejections: {} no invoice match, {} party below {}, {} amount outside {}, {} GSTIN mismatch",
                r.no_candidate,
                r.rejected_party,
                config.matching.threshold,
                r.rejected_amount,
                config.matching.amount_tolerance,
                r.rejected_tax_id,
            );
        }
        if s.unparseable_amounts > 0 {
            eprintln!("warning: {} rows have amounts that do not parse", s.unparseable_amounts);
        }
    }

    if !s.is_reconciled() {
        return Err(recon_err(EXIT_RECON_UNMATCHED, if quiet { "" } else { "unmatched rows found" }));
    }

    Ok(())
}

fn cmd_recon_validate(config_path: PathBuf) -> Result<(), CliError> {
    let overrides = Overrides { threshold: None, tolerance: None, policy: None };
    let config = load_config(&config_path, &overrides)?;
    let input = load_inputs(&config, base_dir(&config_path))?;

    resolve_columns(Side::Left, &input.left, &config.left.columns).map_err(engine_err)?;
    resolve_columns(Side::Right, &input.right, &config.right.columns).map_err(engine_err)?;

    if config.matching.threshold < ledgermatch_recon::config::RECOMMENDED_MIN_THRESHOLD {
        log::warn!(
            "threshold {} is below the recommended floor of {}",
            config.matching.threshold,
            ledgermatch_recon::config::RECOMMENDED_MIN_THRESHOLD
        );
    }

    eprintln!(
        "ok: '{}' ({} {} rows, {} {} rows, policy {}, threshold {}, tolerance {})",
        config.name,
        input.left.len(),
        config.left_label(),
        input.right.len(),
        config.right_label(),
        config.matching.invoice_policy,
        config.matching.threshold,
        config.matching.amount_tolerance,
    );
    Ok(())
}

fn cmd_score(a: &str, b: &str, json: bool) -> Result<(), CliError> {
    let na = normalize_text(&Cell::text(a));
    let nb = normalize_text(&Cell::text(b));
    let partial = fuzz::partial_ratio(&na, &nb);
    let full = fuzz::ratio(&na, &nb);

    if json {
        let out = serde_json::json!({
            "a": na,
            "b": nb,
            "partial_ratio": partial,
            "ratio": full,
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    } else {
        println!("partial_ratio: {partial}");
        println!("ratio:         {full}");
    }
    Ok(())
}

fn cmd_normalize(value: &str, policy: InvoicePolicy, separators: &str) -> Result<(), CliError> {
    let normalizer = InvoiceNormalizer::new(policy, separators.chars().collect());
    println!("{}", normalizer.normalize(value));
    Ok(())
}
