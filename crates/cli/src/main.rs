// ledgermatch CLI - purchase register vs GSTR-2B reconciliation

mod exit_codes;
mod logging;
mod recon;

use std::process::ExitCode;

use clap::{ArgAction, Parser};

use exit_codes::{EXIT_SUCCESS, EXIT_USAGE};
use recon::ReconCommands;

#[derive(Parser)]
#[command(name = "lmatch")]
#[command(about = "Match a purchase register against a GSTR-2B statement")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// More log output on stderr (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: ReconCommands,
}

fn long_version() -> &'static str {
    if cfg!(debug_assertions) {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("LMATCH_COMMIT"), ")",
            "\nengine:  ledgermatch-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   debug",
            "\ntarget:  ", env!("LMATCH_TARGET"),
        )
    } else {
        concat!(
            env!("CARGO_PKG_VERSION"),
            " (", env!("LMATCH_COMMIT"), ")",
            "\nengine:  ledgermatch-recon ", env!("CARGO_PKG_VERSION"),
            "\nbuild:   release",
            "\ntarget:  ", env!("LMATCH_TARGET"),
        )
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_USAGE)
            } else {
                ExitCode::from(EXIT_SUCCESS)
            };
        }
    };

    let quiet = matches!(cli.command, ReconCommands::Run { quiet: true, .. });
    logging::init_logger(cli.verbose, quiet);

    match recon::cmd_recon(cli.command) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
