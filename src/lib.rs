//! `switchbot-listener` library.
//!
//! Decodes the advertisements of SwitchBot thermometer/hygrometer meters.
//! A meter splits each reading over two broadcasts: a scan response with its
//! type marker and battery level, and an advertising indication with
//! temperature and humidity. The [`Registry`] pairs them per radio address
//! into [`SensorReading`]s.
//!
//! The binary (`src/main.rs`) is responsible for logging setup and process
//! exit codes; the run loop lives in [`crate::app`].

pub mod address;
pub mod alias;
pub mod app;
pub mod decode;
pub mod dew_point;
pub mod frame;
pub mod output;
pub mod reading;
pub mod record;
pub mod registry;
pub mod scanner;
pub mod staleness;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use address::RadioAddress;
pub use alias::{Alias, AliasMap, parse_alias, resolve_name};
pub use decode::{Climate, DecodeError, Layout, Unit};
pub use dew_point::{DewPointError, dew_point};
pub use frame::{DeviceVariant, Frame, FrameRole};
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use reading::SensorReading;
pub use record::{DeviceRecord, RawFragment};
pub use registry::{FrameError, FrameOutcome, Registry};
pub use scanner::ScanError;
pub use staleness::Staleness;
