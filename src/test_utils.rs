use crate::address::RadioAddress;
use crate::frame::{Frame, FrameRole};
use std::time::SystemTime;

/// A stable address for unit tests.
pub const TEST_ADDRESS: RadioAddress = RadioAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

/// Classic meter scan response: service data with marker `0x54` and the given battery byte.
pub fn classic_scan_response(battery: u8) -> Vec<u8> {
    vec![0x09, 0x16, 0x00, 0x0D, 0x54, 0x00, battery, 0x00, 0x00, 0x00]
}

/// Classic meter advertising indication with the three climate bytes at offsets 7..=9.
pub fn classic_indication(fraction: u8, whole: u8, unit_humidity: u8) -> Vec<u8> {
    vec![
        0x02, 0x01, 0x06, 0x09, 0xFF, 0x69, 0x09, fraction, whole, unit_humidity,
    ]
}

/// Outdoor meter scan response: marker `0x77` and the given battery byte.
pub fn outdoor_scan_response(battery: u8) -> Vec<u8> {
    vec![0x09, 0x16, 0x3D, 0xFD, 0x77, 0x00, battery]
}

/// Outdoor meter advertising indication with the climate bytes at offsets 15..=17.
pub fn outdoor_indication(fraction: u8, whole: u8, humidity: u8) -> Vec<u8> {
    let mut payload = vec![
        0x02, 0x01, 0x06, 0x0F, 0xFF, 0x69, 0x09, 0xE2, 0x1B, 0x34, 0x56, 0x78, 0x9A, 0x00, 0x00,
    ];
    payload.extend_from_slice(&[fraction, whole, humidity, 0x00]);
    payload
}

/// Wrap a payload in a frame received at the Unix epoch.
pub fn frame(address: RadioAddress, role: FrameRole, payload: Vec<u8>) -> Frame {
    Frame {
        address,
        role,
        payload,
        rssi: -60,
        received_at: SystemTime::UNIX_EPOCH,
    }
}
