//! Core application runner for `switchbot-listener`.
//!
//! This module is decoupled from process setup (logging, exit codes) so the
//! run loop can be tested with an injected scanner and output streams.

use crate::alias::{Alias, AliasMap, parse_alias, resolve_name, to_map};
use crate::frame::Frame;
use crate::output::{self, Format, OutputFormatter};
use crate::registry::{FrameError, Registry};
use crate::scanner::ScanError;
use crate::staleness::{Staleness, parse_duration};
use clap::Parser;
use log::{debug, trace};
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

/// Command-line configuration.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    pub format: Format,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "switchbot")]
    pub influxdb_measurement: String,

    /// Specify human-readable alias for a meter address.
    /// Format: --alias F3:50:26:00:00:01=Office
    #[arg(long = "alias", value_parser = parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Verbose output, print rejected frames
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// How often to print all current readings.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    #[arg(long, default_value = "5s", value_parser = parse_interval)]
    pub interval: Duration,

    /// Hide readings that have not been updated for this long.
    #[arg(long, value_parser = parse_duration)]
    pub max_age: Option<Duration>,

    /// Track at most this many meters; frames from further meters are ignored.
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Index of the HCI device to scan with (0 for hci0).
    #[arg(long, default_value_t = 0)]
    pub hci_device: u16,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(
        &self,
        device: u16,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Frame>, ScanError>> + Send + '_>>;
}

/// Real scanner implementation that delegates to the compiled-in backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(
        &self,
        device: u16,
    ) -> Pin<Box<dyn Future<Output = Result<mpsc::Receiver<Frame>, ScanError>> + Send + '_>> {
        Box::pin(async move { crate::scanner::start_scan(device).await })
    }
}

fn parse_interval(src: &str) -> Result<Duration, String> {
    match parse_duration(src)? {
        interval if interval.is_zero() => Err("interval must be greater than zero".into()),
        interval => Ok(interval),
    }
}

fn handle_frame(
    registry: &mut Registry,
    frame: &Frame,
    verbose: bool,
    err: &mut dyn Write,
) -> io::Result<()> {
    match registry.on_frame(frame) {
        Ok(_) => Ok(()),
        // Every other BLE device nearby ends up here.
        Err(e @ FrameError::UnknownDevice { .. }) => {
            trace!("{e}");
            Ok(())
        }
        Err(e) => {
            debug!("{}: {e}", frame.address);
            if verbose {
                writeln!(err, "{}: {e}", frame.address)?;
            }
            Ok(())
        }
    }
}

fn write_readings(
    registry: &Registry,
    formatter: &dyn OutputFormatter,
    aliases: &AliasMap,
    staleness: Staleness,
    out: &mut dyn Write,
) -> io::Result<()> {
    let now = SystemTime::now();
    for reading in registry
        .readings()
        .filter(|reading| staleness.is_fresh(reading, now))
    {
        let name = resolve_name(&reading.address, aliases);
        writeln!(out, "{}", formatter.format(&reading, &name))?;
    }
    out.flush()
}

/// Run the scan loop, writing readings to `out` and rejected frames to `err`.
///
/// - Every frame from the scanner is routed into the device registry.
/// - Every `options.interval`, all fresh readings are written to `out`.
/// - Rejected frames are written to `err` only when `options.verbose` is true.
/// - When the scanner stops, the current readings are written one last time.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let aliases = to_map(&options.aliases);
    let formatter = output::formatter(options.format, &options.influxdb_measurement);
    let staleness = Staleness::from(options.max_age);
    let mut registry = options
        .capacity
        .map_or_else(Registry::new, Registry::with_capacity);

    let mut frames = scanner.start_scan(options.hci_device).await?;

    let mut ticker = tokio::time::interval(options.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately, before any frame has arrived.
    ticker.tick().await;

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Some(frame) => handle_frame(&mut registry, &frame, options.verbose, err)?,
                None => break,
            },
            _ = ticker.tick() => {
                write_readings(&registry, formatter.as_ref(), &aliases, staleness, out)?;
            }
        }
    }

    debug!("Scanner stopped with {} registered meters", registry.len());
    write_readings(&registry, formatter.as_ref(), &aliases, staleness, out)?;
    Ok(())
}
