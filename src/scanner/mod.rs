//! BLE scanning for SwitchBot meters.
//!
//! A scanner turns advertising reports into [`Frame`]s and hands them to the
//! run loop over a channel. Scan responses are only sent in reply to active
//! scan requests, so backends must scan actively.

#[cfg(feature = "hci")]
pub mod hci;

use crate::frame::{Frame, FrameRole};
use thiserror::Error;
use tokio::sync::mpsc;

/// Advertising report event types (link-layer PDU types).
pub const ADV_IND: u8 = 0x00;
pub const ADV_DIRECT_IND: u8 = 0x01;
pub const ADV_SCAN_IND: u8 = 0x02;
pub const ADV_NONCONN_IND: u8 = 0x03;
pub const SCAN_RSP: u8 = 0x04;

/// Channel buffer size for scanned frames.
pub const FRAME_CHANNEL_BUFFER_SIZE: usize = 100;

/// Error type for scanner operations.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
    /// Backend not available (not compiled in)
    #[error("Backend '{0}' not available (not compiled in)")]
    BackendNotAvailable(String),
}

/// Map an advertising report event type to the frame role it carries.
///
/// Directed and scannable-undirected advertisements are not used by the meters.
pub fn role_for_event_type(event_type: u8) -> Option<FrameRole> {
    match event_type {
        ADV_IND | ADV_NONCONN_IND => Some(FrameRole::AdvertisingIndication),
        SCAN_RSP => Some(FrameRole::ScanResponse),
        _ => None,
    }
}

/// Start an active scan on HCI device `hci<device>`.
///
/// # Returns
/// A receiver of every advertisement and scan response seen by the adapter.
pub async fn start_scan(device: u16) -> Result<mpsc::Receiver<Frame>, ScanError> {
    #[cfg(feature = "hci")]
    return hci::start_scan(device).await;

    #[cfg(not(feature = "hci"))]
    {
        let _ = device;
        Err(ScanError::BackendNotAvailable("hci".into()))
    }
}
