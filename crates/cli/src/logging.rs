use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install the stderr logger. `RUST_LOG` wins over the flags. Library crates
/// log through the `log` facade, which this subscriber picks up.
pub fn init_logger(verbose: u8, quiet: bool) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "ledgermatch_recon=info,ledgermatch_io=info,warn",
            2 => "ledgermatch_recon=debug,ledgermatch_io=debug,info",
            _ => "ledgermatch_recon=trace,ledgermatch_io=trace,debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A second init (tests driving main twice) is harmless
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
