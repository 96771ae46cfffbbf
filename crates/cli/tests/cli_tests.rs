// Integration tests for the lmatch binary: exit codes, --json stdout contract,
// and report files.
//
// Run with: cargo test -p ledgermatch-cli --test cli_tests -- --nocapture

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn lmatch() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_lmatch"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures").join(name)
}

fn run(args: &[&str]) -> Output {
    lmatch().args(args).output().expect("run lmatch")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

/// Assert stdout is a single, parseable JSON value with no extra lines.
fn assert_single_json(stdout: &[u8]) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(stdout);
    let trimmed = stdout.trim();
    assert!(!trimmed.is_empty(), "stdout should not be empty");
    serde_json::from_str(trimmed).unwrap_or_else(|e| {
        panic!("stdout must be valid JSON.\nParse error: {}\nstdout:\n{}", e, trimmed)
    })
}

/// Config plus two ledgers in a temp dir; every purchase row has a 2B counterpart.
fn reconciled_workspace() -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("left.csv"),
        "Invoice No,Party Name,Taxable Value\nA-1,Acme Traders,100\nB/7,Beta,200\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("right.csv"),
        "Invoice number,Trade/Legal name,Taxable Value\nb7,BETA PVT LTD,200.25\na 1,Acme Traders,100\n",
    )
    .unwrap();
    let config = dir.path().join("recon.toml");
    fs::write(
        &config,
        r#"
name = "tmp"

[left]
file = "left.csv"
[left.columns]
invoice = "Invoice No"
party = "Party Name"
amount = "Taxable Value"

[right]
file = "right.csv"
[right.columns]
invoice = "Invoice number"
party = "Trade/Legal name"
amount = "Taxable Value"
"#,
    )
    .unwrap();
    (dir, config)
}

// ===========================================================================
// lmatch run
// ===========================================================================

#[test]
fn run_with_unmatched_rows_exits_1() {
    let output = run(&["run", fixture("april.toml").to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("2 matched"), "stderr: {err}");
    assert!(err.contains("2 unmatched Purchase"), "stderr: {err}");
    assert!(err.contains("2 unmatched GSTR2B"), "stderr: {err}");
    assert!(err.contains("error: unmatched rows found"), "stderr: {err}");
    assert!(output.stdout.is_empty(), "human mode writes nothing to stdout");
}

#[test]
fn run_json_stdout_contract() {
    let output = run(&["run", fixture("april.toml").to_str().unwrap(), "--json"]);
    assert_eq!(output.status.code(), Some(1));

    let val = assert_single_json(&output.stdout);
    let keys: Vec<&str> = val.as_object().unwrap().keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["meta", "summary", "matched", "unmatched_left", "unmatched_right"]);

    assert_eq!(val["meta"]["config_name"], "April 2025");
    assert_eq!(val["meta"]["invoice_policy"], "alnum_fold");
    assert_eq!(val["summary"]["left_rows"], 4);
    assert_eq!(val["summary"]["right_rows"], 4);
    assert_eq!(val["summary"]["matched"], 2);
    assert_eq!(val["summary"]["rejections"]["rejected_amount"], 1);
    assert_eq!(val["summary"]["rejections"]["no_candidate"], 1);

    let matched = val["matched"]["rows"].as_array().unwrap();
    assert_eq!(matched.len(), 2);
    assert_eq!(matched[0][0], "INV-001/25-26");
    assert_eq!(matched[0][2], "ACME TRADERS PVT LTD");
    assert_eq!(matched[0][6], serde_json::json!(100.0));
    assert_eq!(matched[0][7], "TRUE");

    let left = val["unmatched_left"]["rows"].as_array().unwrap();
    assert_eq!(left[0][0], "INV-003/25-26");
    assert_eq!(left[1][0], "INV-004/25-26");
    assert_eq!(val["unmatched_left"]["columns"][0], "Invoice No");

    let right = val["unmatched_right"]["rows"].as_array().unwrap();
    assert_eq!(right[0][0], "INV-003/25-26");
    assert_eq!(right[1][0], "INV-099/25-26");
}

#[test]
fn run_numeric_suffix_policy_override() {
    let output = run(&[
        "run",
        fixture("april.toml").to_str().unwrap(),
        "--json",
        "--policy",
        "numeric_suffix",
    ]);
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["meta"]["invoice_policy"], "numeric_suffix");
    assert_eq!(val["summary"]["matched"], 2);
}

#[test]
fn run_tolerance_override_recovers_match() {
    let output = run(&[
        "run",
        fixture("april.toml").to_str().unwrap(),
        "--json",
        "--tolerance",
        "5000",
    ]);
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["summary"]["matched"], 3);
    assert_eq!(val["meta"]["amount_tolerance"], serde_json::json!(5000.0));
}

#[test]
fn run_reconciled_exits_0_and_writes_reports() {
    let (dir, config) = reconciled_workspace();
    let xlsx = dir.path().join("out.xlsx");
    let csv_dir = dir.path().join("csv");
    let json = dir.path().join("out.json");

    let output = run(&[
        "run",
        config.to_str().unwrap(),
        "--xlsx",
        xlsx.to_str().unwrap(),
        "--csv-dir",
        csv_dir.to_str().unwrap(),
        "--output",
        json.to_str().unwrap(),
    ]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(xlsx.exists());
    let matched = fs::read_to_string(csv_dir.join("matched.csv")).unwrap();
    assert!(matched.starts_with("Invoice,Party (Purchase),Party (GSTR2B),"), "{matched}");
    assert_eq!(matched.lines().count(), 3);
    assert_eq!(fs::read_to_string(csv_dir.join("unmatched_left.csv")).unwrap().lines().count(), 1);

    let doc: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(doc["summary"]["matched"], 2);
}

#[test]
fn run_quiet_prints_nothing() {
    let output = run(&["run", fixture("april.toml").to_str().unwrap(), "--quiet"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr.is_empty(), "stderr: {}", stderr(&output));
}

#[test]
fn run_missing_column_exits_4_with_hint() {
    let (dir, config) = reconciled_workspace();
    let text = fs::read_to_string(&config).unwrap().replace("Party Name", "Supplier");
    fs::write(&config, text).unwrap();

    let output = run(&["run", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
    let err = stderr(&output);
    assert!(err.contains("missing column 'Supplier'"), "stderr: {err}");
    assert!(err.contains("hint:"), "stderr: {err}");
    drop(dir);
}

#[test]
fn run_missing_ledger_exits_4() {
    let (dir, config) = reconciled_workspace();
    fs::remove_file(dir.path().join("right.csv")).unwrap();
    let output = run(&["run", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4), "stderr: {}", stderr(&output));
}

#[test]
fn run_invalid_config_exits_3() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    fs::write(&config, "name = \"x\"\n[matching]\nthreshold = 80\n").unwrap();
    let output = run(&["run", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
}

#[test]
fn run_threshold_override_is_validated() {
    let output = run(&["run", fixture("april.toml").to_str().unwrap(), "--threshold", "101"]);
    assert_eq!(output.status.code(), Some(3), "stderr: {}", stderr(&output));
}

#[test]
fn run_unknown_policy_is_usage_error() {
    let output = run(&["run", fixture("april.toml").to_str().unwrap(), "--policy", "fuzzy"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn run_unwritable_output_exits_5() {
    let (dir, config) = reconciled_workspace();
    let target = dir.path().join("no-such-dir").join("out.json");
    let output = run(&["run", config.to_str().unwrap(), "--output", target.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(5), "stderr: {}", stderr(&output));
}

// ===========================================================================
// lmatch validate / score / normalize
// ===========================================================================

#[test]
fn validate_ok() {
    let output = run(&["validate", fixture("april.toml").to_str().unwrap()]);
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("ok: 'April 2025'"));
}

#[test]
fn validate_reports_missing_column() {
    let (_dir, config) = reconciled_workspace();
    let text = fs::read_to_string(&config).unwrap().replace("Trade/Legal name", "Supplier Name");
    fs::write(&config, text).unwrap();

    let output = run(&["validate", config.to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(4));
    assert!(stderr(&output).contains("right table: missing column 'Supplier Name'"));
}

#[test]
fn score_substring_party() {
    let output = run(&["score", "Acme Traders", "ACME TRADERS PVT LTD", "--json"]);
    assert!(output.status.success());
    let val = assert_single_json(&output.stdout);
    assert_eq!(val["partial_ratio"], 100);
    assert_eq!(val["a"], "acme traders");
    assert!(val["ratio"].as_u64().unwrap() < 100);
}

#[test]
fn normalize_both_policies() {
    let output = run(&["normalize", "INV-001/25-26"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "inv0012526");

    let output = run(&["normalize", "INV-001/25-26", "--policy", "numeric_suffix"]);
    assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "1");
}

#[test]
fn no_subcommand_is_usage_error() {
    let output = run(&[]);
    assert_eq!(output.status.code(), Some(2));
}
