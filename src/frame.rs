//! Scan events as delivered by the radio driver, and device classification.

use crate::address::RadioAddress;
use std::fmt;
use std::time::SystemTime;

/// Offset of the device type marker inside a scan-response payload.
pub const TYPE_MARKER_OFFSET: usize = 4;

/// Type marker of the classic indoor meter (`'T'`).
pub const CLASSIC_MARKER: u8 = 0x54;

/// Type marker of the outdoor meter (`'w'`).
pub const OUTDOOR_MARKER: u8 = 0x77;

/// Which advertisement PDU a payload arrived in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameRole {
    /// Reply to an active scan request; carries the type marker and battery.
    ScanResponse,
    /// Periodic connectable or non-connectable advertisement.
    AdvertisingIndication,
}

impl fmt::Display for FrameRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameRole::ScanResponse => write!(f, "scan response"),
            FrameRole::AdvertisingIndication => write!(f, "advertising indication"),
        }
    }
}

/// One scan event.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub address: RadioAddress,
    pub role: FrameRole,
    /// Advertising data exactly as received over the air.
    pub payload: Vec<u8>,
    pub rssi: i8,
    pub received_at: SystemTime,
}

impl Frame {
    /// Create a frame stamped with the current time.
    pub fn new(address: RadioAddress, role: FrameRole, payload: Vec<u8>, rssi: i8) -> Self {
        Self {
            address,
            role,
            payload,
            rssi,
            received_at: SystemTime::now(),
        }
    }
}

/// Sensor hardware family, determined by the scan-response type marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceVariant {
    Classic,
    Outdoor,
    Unknown,
}

impl DeviceVariant {
    /// Classify a scan-response payload by its type marker.
    ///
    /// Payloads too short to carry a marker are `Unknown`.
    ///
    /// # Example
    /// ```
    /// use switchbot_listener::DeviceVariant;
    ///
    /// assert_eq!(DeviceVariant::classify(&[0x09, 0x16, 0x00, 0x0D, 0x54, 0x00, 0x64]), DeviceVariant::Classic);
    /// assert_eq!(DeviceVariant::classify(&[0x09, 0x16]), DeviceVariant::Unknown);
    /// ```
    pub fn classify(payload: &[u8]) -> Self {
        payload
            .get(TYPE_MARKER_OFFSET)
            .map_or(DeviceVariant::Unknown, |&marker| Self::from_marker(marker))
    }

    pub fn from_marker(marker: u8) -> Self {
        match marker {
            CLASSIC_MARKER => DeviceVariant::Classic,
            OUTDOOR_MARKER => DeviceVariant::Outdoor,
            _ => DeviceVariant::Unknown,
        }
    }

    pub fn is_known(self) -> bool {
        self != DeviceVariant::Unknown
    }
}

impl fmt::Display for DeviceVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceVariant::Classic => write!(f, "classic"),
            DeviceVariant::Outdoor => write!(f, "outdoor"),
            DeviceVariant::Unknown => write!(f, "unknown"),
        }
    }
}
