//! Bluetooth radio address of a sensor.
//!
//! The address is the registry key, so it is a plain 6-byte value with
//! exact equality and a total order (readings are listed in address order).

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 6-byte Bluetooth device address, most significant byte first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct RadioAddress(pub [u8; 6]);

impl RadioAddress {
    /// Build an address from the little-endian byte order used on the HCI wire.
    pub fn from_le_bytes(mut bytes: [u8; 6]) -> Self {
        bytes.reverse();
        Self(bytes)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for RadioAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Errors returned when parsing an address string such as `AA:BB:CC:DD:EE:FF`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseAddressError {
    #[error("invalid address: expected 6 octets, got {0}")]
    WrongOctetCount(usize),
    #[error("invalid address: '{0}' is not a two-digit hex octet")]
    InvalidOctet(String),
}

impl FromStr for RadioAddress {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let octets: Vec<&str> = s.trim().split(':').collect();
        if octets.len() != 6 {
            return Err(ParseAddressError::WrongOctetCount(octets.len()));
        }

        let mut bytes = [0u8; 6];
        for (slot, octet) in bytes.iter_mut().zip(&octets) {
            if octet.len() != 2 {
                return Err(ParseAddressError::InvalidOctet(octet.to_string()));
            }
            *slot = u8::from_str_radix(octet, 16)
                .map_err(|_| ParseAddressError::InvalidOctet(octet.to_string()))?;
        }

        Ok(RadioAddress(bytes))
    }
}

impl From<[u8; 6]> for RadioAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}
