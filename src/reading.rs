//! Reconciled sensor reading.

use crate::address::RadioAddress;
use crate::decode::Unit;
use crate::frame::DeviceVariant;
use std::time::{Duration, SystemTime};

/// A complete reading of one meter, assembled from its latest scan response
/// and advertising indication.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub address: RadioAddress,
    pub variant: DeviceVariant,
    /// Temperature in `unit`
    pub temperature: f64,
    /// Relative humidity in percent
    pub humidity: u8,
    pub unit: Unit,
    /// Dew point in `unit`, `None` when undefined (e.g. 0 % humidity)
    pub dew_point: Option<f64>,
    /// Battery level in percent
    pub battery: u8,
    /// Signal strength of the most recent frame, in dBm
    pub rssi: i8,
    /// When the most recent fragment of this reading was received
    pub timestamp: SystemTime,
}

impl SensorReading {
    /// Time since the reading was last updated, zero if the clock went backwards.
    pub fn age(&self, now: SystemTime) -> Duration {
        now.duration_since(self.timestamp).unwrap_or_default()
    }
}
