use clap::Parser;
use log::LevelFilter;
use std::io;
use std::panic::{self, PanicHookInfo};
use switchbot_listener::app::{Options, RealScanner, run_with_io};

/// Exit codes for the application
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_PANIC: i32 = 2;

/// Log to stderr; `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set up panic hook to ensure clean exit codes for process managers
    // (e.g., systemd, Telegraf execd) that monitor exit status
    panic::set_hook(Box::new(move |info: &PanicHookInfo| {
        eprintln!("Panic! {}", info);
        std::process::exit(EXIT_PANIC);
    }));

    let options = Options::parse();
    init_logging(options.verbose);

    let mut out = io::stdout();
    let mut err = io::stderr();
    match run_with_io(options, &RealScanner, &mut out, &mut err).await {
        Ok(()) => std::process::exit(EXIT_SUCCESS),
        Err(why) => {
            log::error!("{why}");
            std::process::exit(EXIT_ERROR);
        }
    }
}
