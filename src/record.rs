//! Per-device accumulation of scan-response and advertising-indication frames.
//!
//! A meter sends its type marker and battery in scan responses and its
//! climate values in advertising indications. The two arrive independently,
//! so a record keeps the latest fragment of each role and produces a reading
//! once both halves have been decoded.

use crate::address::RadioAddress;
use crate::decode::{Climate, DecodeError, Layout, classify_scan_response};
use crate::dew_point::dew_point;
use crate::frame::{DeviceVariant, Frame, FrameRole};
use crate::reading::SensorReading;
use log::debug;
use std::time::SystemTime;

/// Latest raw payload received in one role.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub payload: Vec<u8>,
    pub rssi: i8,
}

/// Reconciliation state for one radio address.
///
/// The record is unclassified until a scan response with a recognized type
/// marker arrives; from then on its layout never changes.
#[derive(Debug, Clone)]
pub struct DeviceRecord {
    address: RadioAddress,
    layout: Option<&'static dyn Layout>,
    scan_response: Option<RawFragment>,
    indication: Option<RawFragment>,
    rssi: Option<i8>,
    battery: Option<u8>,
    climate: Option<Climate>,
    dew_point: Option<f64>,
    updated_at: Option<SystemTime>,
}

impl DeviceRecord {
    pub fn new(address: RadioAddress) -> Self {
        Self {
            address,
            layout: None,
            scan_response: None,
            indication: None,
            rssi: None,
            battery: None,
            climate: None,
            dew_point: None,
            updated_at: None,
        }
    }

    pub fn address(&self) -> RadioAddress {
        self.address
    }

    /// `Unknown` while the record is unclassified.
    pub fn variant(&self) -> DeviceVariant {
        self.layout
            .map_or(DeviceVariant::Unknown, |layout| layout.variant())
    }

    pub fn scan_response(&self) -> Option<&RawFragment> {
        self.scan_response.as_ref()
    }

    pub fn advertising_indication(&self) -> Option<&RawFragment> {
        self.indication.as_ref()
    }

    /// Store a frame in the slot matching its role.
    pub fn store(&mut self, frame: &Frame) -> Result<(), DecodeError> {
        match frame.role {
            FrameRole::ScanResponse => {
                self.store_scan_response(&frame.payload, frame.rssi, frame.received_at)
            }
            FrameRole::AdvertisingIndication => {
                self.store_advertising_indication(&frame.payload, frame.rssi, frame.received_at)
            }
        }
    }

    /// Store a scan response, classifying the record on first sight.
    ///
    /// Frames with an unrecognized marker or too short to carry the battery
    /// byte leave the record untouched.
    pub fn store_scan_response(
        &mut self,
        payload: &[u8],
        rssi: i8,
        received_at: SystemTime,
    ) -> Result<(), DecodeError> {
        let announced = classify_scan_response(payload)?;
        let layout = self.layout.unwrap_or(announced);
        if layout.variant() != announced.variant() {
            debug!(
                "{}: scan response announces {}, keeping {}",
                self.address,
                announced.variant(),
                layout.variant()
            );
        }
        let battery = layout.decode_battery(payload)?;

        let newly_classified = self.layout.is_none();
        self.layout = Some(layout);
        self.scan_response = Some(RawFragment {
            payload: payload.to_vec(),
            rssi,
        });
        self.rssi = Some(rssi);
        self.battery = Some(battery);
        self.updated_at = Some(received_at);

        if newly_classified {
            self.decode_pending_indication(layout);
        }
        Ok(())
    }

    /// Store an advertising indication, decoding it when the layout is known.
    ///
    /// Before classification the fragment is kept as-is and decoded once the
    /// first scan response fixes the layout.
    pub fn store_advertising_indication(
        &mut self,
        payload: &[u8],
        rssi: i8,
        received_at: SystemTime,
    ) -> Result<(), DecodeError> {
        let climate = self
            .layout
            .map(|layout| layout.decode_climate(payload))
            .transpose()?;

        self.indication = Some(RawFragment {
            payload: payload.to_vec(),
            rssi,
        });
        self.rssi = Some(rssi);
        self.updated_at = Some(received_at);

        if let Some(climate) = climate {
            self.apply_climate(climate);
        }
        Ok(())
    }

    /// The current reading, or `None` until both halves have been decoded.
    pub fn snapshot(&self) -> Option<SensorReading> {
        let layout = self.layout?;
        let climate = self.climate?;

        Some(SensorReading {
            address: self.address,
            variant: layout.variant(),
            temperature: climate.temperature,
            humidity: climate.humidity,
            unit: climate.unit,
            dew_point: self.dew_point,
            battery: self.battery?,
            rssi: self.rssi?,
            timestamp: self.updated_at?,
        })
    }

    fn decode_pending_indication(&mut self, layout: &'static dyn Layout) {
        let decoded = self
            .indication
            .as_ref()
            .map(|fragment| layout.decode_climate(&fragment.payload));

        match decoded {
            Some(Ok(climate)) => self.apply_climate(climate),
            Some(Err(e)) => debug!("{}: dropping buffered indication: {e}", self.address),
            None => {}
        }
    }

    fn apply_climate(&mut self, climate: Climate) {
        self.dew_point = match dew_point(climate.temperature, climate.humidity, climate.unit) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("{}: {e}", self.address);
                None
            }
        };
        self.climate = Some(climate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::Unit;
    use crate::test_utils::{
        TEST_ADDRESS, classic_indication, classic_scan_response, outdoor_indication,
        outdoor_scan_response,
    };
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_new_record_is_unclassified() {
        let record = DeviceRecord::new(TEST_ADDRESS);
        assert_eq!(record.variant(), DeviceVariant::Unknown);
        assert!(record.snapshot().is_none());
    }

    #[test]
    fn test_classic_scan_response_then_indication() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_scan_response(&classic_scan_response(0x40), -70, at(1))
            .unwrap();
        assert_eq!(record.variant(), DeviceVariant::Classic);
        assert!(record.snapshot().is_none());

        record
            .store_advertising_indication(&classic_indication(0x03, 0xA5, 0x32), -62, at(2))
            .unwrap();

        let reading = record.snapshot().unwrap();
        assert_eq!(reading.address, TEST_ADDRESS);
        assert_eq!(reading.variant, DeviceVariant::Classic);
        assert!((reading.temperature - 37.3).abs() < 1e-9);
        assert_eq!(reading.humidity, 50);
        assert_eq!(reading.unit, Unit::Celsius);
        assert_eq!(reading.battery, 64);
        assert_eq!(reading.dew_point, Some(25.1));
        assert_eq!(reading.rssi, -62);
        assert_eq!(reading.timestamp, at(2));
    }

    #[test]
    fn test_indication_before_classification_is_decoded_later() {
        let mut forward = DeviceRecord::new(TEST_ADDRESS);
        forward
            .store_scan_response(&classic_scan_response(0x40), -70, at(1))
            .unwrap();
        forward
            .store_advertising_indication(&classic_indication(0x03, 0xA5, 0x32), -70, at(2))
            .unwrap();

        let mut reverse = DeviceRecord::new(TEST_ADDRESS);
        reverse
            .store_advertising_indication(&classic_indication(0x03, 0xA5, 0x32), -70, at(1))
            .unwrap();
        assert!(reverse.snapshot().is_none());
        reverse
            .store_scan_response(&classic_scan_response(0x40), -70, at(2))
            .unwrap();

        assert_eq!(forward.snapshot(), reverse.snapshot());
    }

    #[test]
    fn test_repeated_scan_response_keeps_battery() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_advertising_indication(&classic_indication(0x00, 0x94, 0x32), -60, at(1))
            .unwrap();
        record
            .store_scan_response(&classic_scan_response(0x40), -60, at(1))
            .unwrap();
        record
            .store_scan_response(&classic_scan_response(0x40), -60, at(1))
            .unwrap();
        assert_eq!(record.snapshot().unwrap().battery, 64);
    }

    #[test]
    fn test_variant_is_fixed_by_first_classification() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_scan_response(&classic_scan_response(0x40), -60, at(1))
            .unwrap();
        record
            .store_scan_response(&outdoor_scan_response(0x30), -60, at(2))
            .unwrap();
        assert_eq!(record.variant(), DeviceVariant::Classic);
    }

    #[test]
    fn test_unrecognized_marker_is_ignored_by_classified_record() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_scan_response(&classic_scan_response(0x40), -60, at(1))
            .unwrap();

        let mut foreign = classic_scan_response(0x10);
        foreign[4] = 0x99;
        assert_eq!(
            record.store_scan_response(&foreign, -30, at(2)),
            Err(DecodeError::UnrecognizedVariant(0x99))
        );
        assert_eq!(record.scan_response().unwrap().payload, classic_scan_response(0x40));
        assert_eq!(record.scan_response().unwrap().rssi, -60);
    }

    #[test]
    fn test_malformed_indication_leaves_record_untouched() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_scan_response(&classic_scan_response(0x40), -60, at(1))
            .unwrap();
        record
            .store_advertising_indication(&classic_indication(0x03, 0xA5, 0x32), -61, at(2))
            .unwrap();

        let before = record.snapshot();
        assert!(
            record
                .store_advertising_indication(&[0x02, 0x01, 0x06], -20, at(3))
                .is_err()
        );
        assert_eq!(record.snapshot(), before);
    }

    #[test]
    fn test_short_scan_response_does_not_classify() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        assert!(
            record
                .store_scan_response(&[0x09, 0x16, 0x00, 0x0D, 0x54], -60, at(1))
                .is_err()
        );
        assert_eq!(record.variant(), DeviceVariant::Unknown);
        assert!(record.scan_response().is_none());
    }

    #[test]
    fn test_zero_humidity_reading_has_no_dew_point() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_scan_response(&classic_scan_response(0x40), -60, at(1))
            .unwrap();
        record
            .store_advertising_indication(&classic_indication(0x00, 0x94, 0x00), -60, at(2))
            .unwrap();

        let reading = record.snapshot().unwrap();
        assert_eq!(reading.humidity, 0);
        assert_eq!(reading.dew_point, None);
    }

    #[test]
    fn test_outdoor_record() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        record
            .store_scan_response(&outdoor_scan_response(0x5A), -80, at(1))
            .unwrap();
        record
            .store_advertising_indication(&outdoor_indication(0x05, 0x03, 0x46), -78, at(2))
            .unwrap();

        let reading = record.snapshot().unwrap();
        assert_eq!(reading.variant, DeviceVariant::Outdoor);
        assert!((reading.temperature + 3.5).abs() < 1e-9);
        assert_eq!(reading.humidity, 70);
        assert_eq!(reading.unit, Unit::Celsius);
        assert_eq!(reading.battery, 90);
        assert!(reading.dew_point.is_some());
    }

    #[test]
    fn test_store_dispatches_on_role() {
        let mut record = DeviceRecord::new(TEST_ADDRESS);
        let frame = Frame {
            address: TEST_ADDRESS,
            role: FrameRole::ScanResponse,
            payload: classic_scan_response(0x40),
            rssi: -55,
            received_at: at(5),
        };
        record.store(&frame).unwrap();
        assert!(record.scan_response().is_some());
        assert!(record.advertising_indication().is_none());
    }
}
