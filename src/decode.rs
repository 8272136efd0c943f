//! Field decoding for the two SwitchBot meter byte layouts.
//!
//! Offsets are relative to the start of the advertising data as received.
//! Every numeric field is a 7-bit value; bit 7 of the whole-degrees byte is
//! the "positive" flag and bit 7 of the classic unit/humidity byte is the
//! Fahrenheit flag.

use crate::frame::{DeviceVariant, FrameRole, TYPE_MARKER_OFFSET};
use std::fmt;
use thiserror::Error;

const VALUE_MASK: u8 = 0x7F;
const FLAG_BIT: u8 = 0x80;

/// Offset of the battery byte in both scan-response layouts.
const BATTERY_OFFSET: usize = 6;

/// Errors produced while decoding a single payload.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload shorter than the decode path requires.
    #[error("Malformed {role} frame: need at least {needed} bytes, got {actual}")]
    MalformedFrame {
        role: FrameRole,
        needed: usize,
        actual: usize,
    },
    /// Type marker not one of the supported sensor families.
    #[error("Unrecognized device type marker 0x{0:02X}")]
    UnrecognizedVariant(u8),
}

/// Temperature unit selected on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Unit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl Unit {
    /// Express a Celsius value in this unit.
    pub fn convert_celsius(self, celsius: f64) -> f64 {
        match self {
            Unit::Celsius => celsius,
            Unit::Fahrenheit => celsius * 1.8 + 32.0,
        }
    }

    /// Express a value given in this unit in Celsius.
    pub fn to_celsius(self, value: f64) -> f64 {
        match self {
            Unit::Celsius => value,
            Unit::Fahrenheit => (value - 32.0) / 1.8,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Celsius => "°C",
            Unit::Fahrenheit => "°F",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Celsius => write!(f, "C"),
            Unit::Fahrenheit => write!(f, "F"),
        }
    }
}

/// Climate fields carried by an advertising indication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Climate {
    /// Temperature in `unit`.
    pub temperature: f64,
    /// Relative humidity in percent. Not range checked beyond the 7-bit mask.
    pub humidity: u8,
    pub unit: Unit,
}

/// Byte layout of one sensor family.
///
/// A record picks its layout once, when the device is classified, and uses it
/// for every later frame.
pub trait Layout: fmt::Debug + Send + Sync {
    fn variant(&self) -> DeviceVariant;

    /// Decode the battery percentage from a scan response.
    fn decode_battery(&self, payload: &[u8]) -> Result<u8, DecodeError>;

    /// Decode temperature, humidity and unit from an advertising indication.
    fn decode_climate(&self, payload: &[u8]) -> Result<Climate, DecodeError>;
}

/// Indoor thermometer/hygrometer (type marker `0x54`).
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassicLayout;

/// Outdoor thermometer/hygrometer (type marker `0x77`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OutdoorLayout;

static CLASSIC: ClassicLayout = ClassicLayout;
static OUTDOOR: OutdoorLayout = OutdoorLayout;

impl ClassicLayout {
    const FRACTION_OFFSET: usize = 7;
    const WHOLE_OFFSET: usize = 8;
    const UNIT_HUMIDITY_OFFSET: usize = 9;
}

impl OutdoorLayout {
    const FRACTION_OFFSET: usize = 15;
    const WHOLE_OFFSET: usize = 16;
    const HUMIDITY_OFFSET: usize = 17;
}

impl Layout for ClassicLayout {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Classic
    }

    fn decode_battery(&self, payload: &[u8]) -> Result<u8, DecodeError> {
        battery(payload)
    }

    fn decode_climate(&self, payload: &[u8]) -> Result<Climate, DecodeError> {
        require(
            payload,
            FrameRole::AdvertisingIndication,
            Self::UNIT_HUMIDITY_OFFSET + 1,
        )?;

        let celsius = temperature(payload, Self::FRACTION_OFFSET, Self::WHOLE_OFFSET);
        let unit_humidity = payload[Self::UNIT_HUMIDITY_OFFSET];
        let unit = if unit_humidity & FLAG_BIT != 0 {
            Unit::Fahrenheit
        } else {
            Unit::Celsius
        };

        Ok(Climate {
            temperature: unit.convert_celsius(celsius),
            humidity: unit_humidity & VALUE_MASK,
            unit,
        })
    }
}

impl Layout for OutdoorLayout {
    fn variant(&self) -> DeviceVariant {
        DeviceVariant::Outdoor
    }

    fn decode_battery(&self, payload: &[u8]) -> Result<u8, DecodeError> {
        battery(payload)
    }

    // The outdoor indication has no unit flag; readings are always Celsius.
    fn decode_climate(&self, payload: &[u8]) -> Result<Climate, DecodeError> {
        require(
            payload,
            FrameRole::AdvertisingIndication,
            Self::HUMIDITY_OFFSET + 1,
        )?;

        Ok(Climate {
            temperature: temperature(payload, Self::FRACTION_OFFSET, Self::WHOLE_OFFSET),
            humidity: payload[Self::HUMIDITY_OFFSET] & VALUE_MASK,
            unit: Unit::Celsius,
        })
    }
}

/// Look up the decode path for a classified variant.
pub fn layout_for(variant: DeviceVariant) -> Option<&'static dyn Layout> {
    match variant {
        DeviceVariant::Classic => Some(&CLASSIC),
        DeviceVariant::Outdoor => Some(&OUTDOOR),
        DeviceVariant::Unknown => None,
    }
}

/// Resolve the layout announced by a scan-response payload.
pub fn classify_scan_response(payload: &[u8]) -> Result<&'static dyn Layout, DecodeError> {
    require(payload, FrameRole::ScanResponse, TYPE_MARKER_OFFSET + 1)?;
    let marker = payload[TYPE_MARKER_OFFSET];
    layout_for(DeviceVariant::from_marker(marker)).ok_or(DecodeError::UnrecognizedVariant(marker))
}

fn require(payload: &[u8], role: FrameRole, needed: usize) -> Result<(), DecodeError> {
    if payload.len() < needed {
        return Err(DecodeError::MalformedFrame {
            role,
            needed,
            actual: payload.len(),
        });
    }
    Ok(())
}

fn battery(payload: &[u8]) -> Result<u8, DecodeError> {
    require(payload, FrameRole::ScanResponse, BATTERY_OFFSET + 1)?;
    Ok(payload[BATTERY_OFFSET] & VALUE_MASK)
}

/// Whole degrees plus tenths, negative unless the whole byte's top bit is set.
fn temperature(payload: &[u8], fraction_at: usize, whole_at: usize) -> f64 {
    let whole = payload[whole_at];
    let magnitude =
        f64::from(whole & VALUE_MASK) + f64::from(payload[fraction_at] & VALUE_MASK) / 10.0;
    if whole & FLAG_BIT != 0 {
        magnitude
    } else {
        -magnitude
    }
}
