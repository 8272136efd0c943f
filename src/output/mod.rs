//! Output formatters for meter readings.
//!
//! Each formatter turns one `SensorReading` plus its display name into a
//! single line of text.

pub mod influxdb;
pub mod text;

use crate::reading::SensorReading;
use influxdb::InfluxDbFormatter;
use text::TextFormatter;

/// Trait for formatting readings into output lines.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading.
    ///
    /// # Arguments
    /// * `reading` - The reading to format (includes its timestamp)
    /// * `name` - Display name of the meter (alias or fallback)
    fn format(&self, reading: &SensorReading, name: &str) -> String;
}

/// Selectable output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    /// InfluxDB line protocol, suitable for Telegraf `execd`
    #[default]
    Influx,
    /// One human-readable line per meter
    Text,
}

/// Build the formatter for `format`.
pub fn formatter(format: Format, measurement_name: &str) -> Box<dyn OutputFormatter> {
    match format {
        Format::Influx => Box::new(InfluxDbFormatter::new(measurement_name.to_string())),
        Format::Text => Box::new(TextFormatter),
    }
}
