//! Address-keyed collection of device records.
//!
//! The registry is owned by whoever drives the scan loop; it is not
//! synchronized. Hosts that read readings from another thread should wrap it
//! in a single mutex.

use crate::address::RadioAddress;
use crate::decode::DecodeError;
use crate::frame::{Frame, FrameRole};
use crate::reading::SensorReading;
use crate::record::DeviceRecord;
use log::info;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a frame was not accepted. None of these are fatal to the scan loop.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FrameError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Advertising indication from an address that never sent a valid scan response
    #[error("Ignoring {role} from unregistered device {address}")]
    UnknownDevice {
        address: RadioAddress,
        role: FrameRole,
    },
    /// Bounded registry is full
    #[error("Registry full ({capacity} devices), ignoring new device {address}")]
    CapacityExhausted {
        address: RadioAddress,
        capacity: usize,
    },
}

/// What happened to an accepted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A new record was created for the address
    Registered,
    /// An existing record was updated
    Updated,
}

/// Device records keyed by radio address.
#[derive(Debug, Default)]
pub struct Registry {
    records: BTreeMap<RadioAddress, DeviceRecord>,
    capacity: Option<usize>,
}

impl Registry {
    /// Create a registry without a device limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that tracks at most `capacity` devices.
    ///
    /// # Example
    /// ```
    /// use switchbot_listener::Registry;
    ///
    /// let registry = Registry::with_capacity(20);
    /// assert_eq!(registry.capacity(), Some(20));
    /// assert!(registry.is_empty());
    /// ```
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            capacity: Some(capacity),
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, address: &RadioAddress) -> Option<&DeviceRecord> {
        self.records.get(address)
    }

    /// Route a frame to its record.
    ///
    /// Only a scan response with a recognized type marker can register a new
    /// address. A rejected frame never mutates the registry.
    pub fn on_frame(&mut self, frame: &Frame) -> Result<FrameOutcome, FrameError> {
        if let Some(record) = self.records.get_mut(&frame.address) {
            record.store(frame)?;
            return Ok(FrameOutcome::Updated);
        }

        if frame.role != FrameRole::ScanResponse {
            return Err(FrameError::UnknownDevice {
                address: frame.address,
                role: frame.role,
            });
        }

        if let Some(capacity) = self.capacity
            && self.records.len() >= capacity
        {
            return Err(FrameError::CapacityExhausted {
                address: frame.address,
                capacity,
            });
        }

        let mut record = DeviceRecord::new(frame.address);
        record.store(frame)?;
        info!("Registered {} meter {}", record.variant(), frame.address);
        self.records.insert(frame.address, record);
        Ok(FrameOutcome::Registered)
    }

    /// Lazily yield the available readings in address order.
    pub fn readings(&self) -> impl Iterator<Item = SensorReading> + '_ {
        self.records.values().filter_map(DeviceRecord::snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Unit;
    use crate::frame::DeviceVariant;
    use crate::test_utils::{
        TEST_ADDRESS, classic_indication, classic_scan_response, frame, outdoor_indication,
        outdoor_scan_response,
    };

    const OTHER_ADDRESS: RadioAddress = RadioAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    fn scan_response(address: RadioAddress, payload: Vec<u8>) -> Frame {
        frame(address, FrameRole::ScanResponse, payload)
    }

    fn indication(address: RadioAddress, payload: Vec<u8>) -> Frame {
        frame(address, FrameRole::AdvertisingIndication, payload)
    }

    #[test]
    fn test_reference_scenario() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.on_frame(&scan_response(TEST_ADDRESS, classic_scan_response(0x40))),
            Ok(FrameOutcome::Registered)
        );
        assert_eq!(
            registry.on_frame(&indication(
                TEST_ADDRESS,
                classic_indication(0x03, 0xA5, 0x32)
            )),
            Ok(FrameOutcome::Updated)
        );

        let readings: Vec<_> = registry.readings().collect();
        assert_eq!(readings.len(), 1);
        let reading = &readings[0];
        assert_eq!(reading.address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(reading.variant, DeviceVariant::Classic);
        assert!((reading.temperature - 37.3).abs() < 1e-9);
        assert_eq!(reading.humidity, 50);
        assert_eq!(reading.unit, Unit::Celsius);
        assert_eq!(reading.battery, 64);
        assert_eq!(reading.dew_point, Some(25.1));
    }

    #[test]
    fn test_unrecognized_marker_never_registers() {
        let mut registry = Registry::new();
        let mut payload = classic_scan_response(0x40);
        payload[4] = 0x99;

        assert_eq!(
            registry.on_frame(&scan_response(TEST_ADDRESS, payload)),
            Err(FrameError::Decode(DecodeError::UnrecognizedVariant(0x99)))
        );
        assert!(registry.is_empty());
        assert!(registry.get(&TEST_ADDRESS).is_none());
        assert_eq!(registry.readings().count(), 0);
    }

    #[test]
    fn test_indication_from_unknown_address_is_dropped() {
        let mut registry = Registry::new();
        let result = registry.on_frame(&indication(
            TEST_ADDRESS,
            classic_indication(0x03, 0xA5, 0x32),
        ));
        assert_eq!(
            result,
            Err(FrameError::UnknownDevice {
                address: TEST_ADDRESS,
                role: FrameRole::AdvertisingIndication,
            })
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn test_short_scan_response_creates_no_record() {
        let mut registry = Registry::new();
        let result = registry.on_frame(&scan_response(TEST_ADDRESS, vec![0x09, 0x16, 0x00]));
        assert!(matches!(
            result,
            Err(FrameError::Decode(DecodeError::MalformedFrame { .. }))
        ));

        // Marker present but battery byte missing.
        let result = registry.on_frame(&scan_response(
            TEST_ADDRESS,
            vec![0x09, 0x16, 0x00, 0x0D, 0x54, 0x00],
        ));
        assert!(result.is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_records_are_independent() {
        let mut registry = Registry::new();
        registry
            .on_frame(&scan_response(TEST_ADDRESS, classic_scan_response(0x40)))
            .unwrap();
        registry
            .on_frame(&scan_response(OTHER_ADDRESS, outdoor_scan_response(0x5A)))
            .unwrap();
        registry
            .on_frame(&indication(OTHER_ADDRESS, outdoor_indication(0x02, 0x8C, 0x41)))
            .unwrap();

        assert_eq!(registry.len(), 2);
        let readings: Vec<_> = registry.readings().collect();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].address, OTHER_ADDRESS);
        assert_eq!(readings[0].variant, DeviceVariant::Outdoor);
        assert_eq!(
            registry.get(&TEST_ADDRESS).unwrap().variant(),
            DeviceVariant::Classic
        );
    }

    #[test]
    fn test_readings_are_in_address_order() {
        let mut registry = Registry::new();
        for address in [TEST_ADDRESS, OTHER_ADDRESS] {
            registry
                .on_frame(&scan_response(address, classic_scan_response(0x40)))
                .unwrap();
            registry
                .on_frame(&indication(address, classic_indication(0x00, 0x94, 0x32)))
                .unwrap();
        }

        let addresses: Vec<_> = registry.readings().map(|r| r.address).collect();
        assert_eq!(addresses, vec![OTHER_ADDRESS, TEST_ADDRESS]);
    }

    #[test]
    fn test_bounded_registry_drops_new_devices_only() {
        let mut registry = Registry::with_capacity(1);
        registry
            .on_frame(&scan_response(TEST_ADDRESS, classic_scan_response(0x40)))
            .unwrap();

        assert_eq!(
            registry.on_frame(&scan_response(OTHER_ADDRESS, classic_scan_response(0x40))),
            Err(FrameError::CapacityExhausted {
                address: OTHER_ADDRESS,
                capacity: 1,
            })
        );
        assert_eq!(registry.len(), 1);

        assert_eq!(
            registry.on_frame(&indication(
                TEST_ADDRESS,
                classic_indication(0x00, 0x94, 0x32)
            )),
            Ok(FrameOutcome::Updated)
        );
        assert_eq!(registry.readings().count(), 1);
    }

    #[test]
    fn test_frame_error_display() {
        let err = FrameError::UnknownDevice {
            address: TEST_ADDRESS,
            role: FrameRole::AdvertisingIndication,
        };
        assert_eq!(
            err.to_string(),
            "Ignoring advertising indication from unregistered device AA:BB:CC:DD:EE:FF"
        );

        let err = FrameError::from(DecodeError::UnrecognizedVariant(0x99));
        assert_eq!(err.to_string(), "Unrecognized device type marker 0x99");
    }
}
