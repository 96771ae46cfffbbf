//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract: month-end scripts branch on them.
//!
//! | Code | Meaning                                                  |
//! |------|----------------------------------------------------------|
//! | 0    | Success (for `run`: every row on both sides matched)     |
//! | 1    | `run` finished but some rows are unmatched               |
//! | 2    | CLI usage error (bad args, unknown policy)               |
//! | 3    | Config could not be parsed or failed validation          |
//! | 4    | Input ledger unreadable or missing mapped columns        |
//! | 5    | Report could not be written                              |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Reconciliation ran; at least one row on either side is unmatched.
/// Like `diff(1)`, exit 1 means "ledgers differ."
pub const EXIT_RECON_UNMATCHED: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config file unreadable, unparseable, or invalid.
pub const EXIT_RECON_INVALID_CONFIG: u8 = 3;

/// Input ledger could not be loaded, or its headers do not fit the mapping.
pub const EXIT_RECON_INPUT: u8 = 4;

/// XLSX, CSV, or JSON report could not be written.
pub const EXIT_RECON_OUTPUT: u8 = 5;
