//! `ledgermatch-recon`: invoice-level reconciliation of a purchase register
//! against a tax-authority statement.
//!
//! Pure engine crate: receives pre-loaded tables, returns matched and
//! unmatched partitions. No CLI or IO dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod fuzz;
pub mod matcher;
pub mod model;
pub mod normalize;
pub mod report;

pub use config::{ColumnMapping, InvoicePolicy, ReconConfig, SelectionPolicy};
pub use engine::run;
pub use error::ReconError;
pub use model::{Cell, MatchedPair, ReconInput, ReconResult, Side, Table};
pub use report::{OutputTable, ReconReport};
