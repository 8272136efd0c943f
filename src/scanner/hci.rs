//! Raw HCI socket backend.
//!
//! Scans without the BlueZ daemon by talking to the controller directly.
//! Requires CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges.

use super::{FRAME_CHANNEL_BUFFER_SIZE, ScanError, role_for_event_type};
use crate::address::RadioAddress;
use crate::frame::Frame;
use libc::{AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_RAW, c_int, c_void, sockaddr, socklen_t};
use log::{debug, warn};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

// HCI protocol constants
const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

// HCI packet types
const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;

// HCI events
const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

// HCI commands
const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

const LE_SCAN_ACTIVE: u8 = 0x01;
const LE_PUBLIC_ADDRESS: u8 = 0x00;
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

// Scan timing in 0.625 ms units: ~31 ms interval, 30 ms window.
const SCAN_INTERVAL: u16 = 0x0031;
const SCAN_WINDOW: u16 = 0x0030;

/// Largest HCI event packet: header plus 255 parameter bytes.
const MAX_EVENT_SIZE: usize = 258;

#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

#[repr(C)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn le_meta_events() -> Self {
        let mut filter = Self {
            type_mask: 0,
            event_mask: [0, 0],
            opcode: 0,
        };
        filter.type_mask |= 1 << u32::from(HCI_EVENT_PKT);
        let bit = usize::from(EVT_LE_META_EVENT);
        filter.event_mask[bit / 32] |= 1 << (bit % 32);
        filter
    }
}

fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

fn scan_parameters() -> [u8; 7] {
    let [interval_lo, interval_hi] = SCAN_INTERVAL.to_le_bytes();
    let [window_lo, window_hi] = SCAN_WINDOW.to_le_bytes();
    [
        LE_SCAN_ACTIVE,
        interval_lo,
        interval_hi,
        window_lo,
        window_hi,
        LE_PUBLIC_ADDRESS,
        FILTER_POLICY_ACCEPT_ALL,
    ]
}

fn last_os_error(context: &str) -> ScanError {
    ScanError::Bluetooth(format!("{context}: {}", io::Error::last_os_error()))
}

fn open_hci_socket(dev_id: u16) -> Result<OwnedFd, ScanError> {
    // SOCK_NONBLOCK is required for AsyncFd.
    let fd = unsafe {
        libc::socket(
            AF_BLUETOOTH,
            SOCK_RAW | SOCK_CLOEXEC | libc::SOCK_NONBLOCK,
            BTPROTO_HCI,
        )
    };
    if fd < 0 {
        return Err(last_os_error("Failed to create HCI socket"));
    }
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let addr = SockaddrHci {
        hci_family: AF_BLUETOOTH as u16,
        hci_dev: dev_id,
        hci_channel: HCI_CHANNEL_RAW,
    };
    let ret = unsafe {
        libc::bind(
            fd.as_raw_fd(),
            &addr as *const SockaddrHci as *const sockaddr,
            mem::size_of::<SockaddrHci>() as socklen_t,
        )
    };
    if ret < 0 {
        return Err(last_os_error(&format!("Failed to bind to hci{dev_id}")));
    }

    Ok(fd)
}

fn set_hci_filter(fd: &OwnedFd) -> Result<(), ScanError> {
    let filter = HciFilter::le_meta_events();
    let ret = unsafe {
        libc::setsockopt(
            fd.as_raw_fd(),
            SOL_HCI,
            HCI_FILTER,
            &filter as *const HciFilter as *const c_void,
            mem::size_of::<HciFilter>() as socklen_t,
        )
    };
    if ret < 0 {
        return Err(last_os_error("Failed to set HCI filter"));
    }
    Ok(())
}

fn send_hci_command(fd: &OwnedFd, ocf: u16, params: &[u8]) -> Result<(), ScanError> {
    let packet = hci_command_packet(OGF_LE_CTL, ocf, params);
    let ret = unsafe {
        libc::write(
            fd.as_raw_fd(),
            packet.as_ptr() as *const c_void,
            packet.len(),
        )
    };
    if ret < 0 {
        return Err(last_os_error("Failed to send HCI command"));
    }
    Ok(())
}

fn configure_active_scan(fd: &OwnedFd) -> Result<(), ScanError> {
    // Parameters can only be changed while scanning is disabled.
    send_hci_command(fd, OCF_LE_SET_SCAN_ENABLE, &[0x00, 0x00])?;
    send_hci_command(fd, OCF_LE_SET_SCAN_PARAMETERS, &scan_parameters())?;
    // Enable, without duplicate filtering so every broadcast is reported.
    send_hci_command(fd, OCF_LE_SET_SCAN_ENABLE, &[0x01, 0x00])
}

/// Parse an HCI LE Advertising Report event into a frame.
///
/// Only the first report of the event is used. Reports of PDU types the
/// meters do not send are skipped.
fn parse_advertising_report(packet: &[u8]) -> Option<Frame> {
    if packet.len() < 4
        || packet[0] != HCI_EVENT_PKT
        || packet[1] != EVT_LE_META_EVENT
        || packet[3] != EVT_LE_ADVERTISING_REPORT
    {
        return None;
    }

    // num_reports, event_type, address_type, address[6], data_len, data, rssi
    let report = &packet[4..];
    if report.len() < 10 || report[0] == 0 {
        return None;
    }

    let role = role_for_event_type(report[1])?;

    let mut address = [0u8; 6];
    address.copy_from_slice(&report[3..9]);

    let data_len = usize::from(report[9]);
    let payload = report.get(10..10 + data_len)?;
    let rssi = *report.get(10 + data_len)? as i8;

    Some(Frame::new(
        RadioAddress::from_le_bytes(address),
        role,
        payload.to_vec(),
        rssi,
    ))
}

/// Start an active scan on `hci<dev_id>` using raw HCI sockets.
///
/// # Requirements
/// - CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges
/// - An available HCI device
pub async fn start_scan(dev_id: u16) -> Result<mpsc::Receiver<Frame>, ScanError> {
    let fd = open_hci_socket(dev_id)?;
    set_hci_filter(&fd)?;

    // Commands go through a separate socket so the event socket stays filtered.
    let cmd_fd = open_hci_socket(dev_id)?;
    configure_active_scan(&cmd_fd)?;

    let (tx, rx) = mpsc::channel(FRAME_CHANNEL_BUFFER_SIZE);

    let async_fd = AsyncFd::new(fd)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {e}")))?;

    tokio::spawn(async move {
        let _cmd_fd = cmd_fd;
        let mut buf = [0u8; MAX_EVENT_SIZE];

        loop {
            let mut guard = match async_fd.readable().await {
                Ok(guard) => guard,
                Err(e) => {
                    warn!("HCI socket not readable: {e}");
                    break;
                }
            };

            // Drain all available packets before waiting again.
            loop {
                let n = match guard.try_io(|inner| {
                    let ret = unsafe {
                        libc::read(
                            inner.as_raw_fd(),
                            buf.as_mut_ptr() as *mut c_void,
                            buf.len(),
                        )
                    };
                    if ret < 0 {
                        Err(io::Error::last_os_error())
                    } else {
                        Ok(ret as usize)
                    }
                }) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) => break,
                    Ok(Err(e)) => {
                        warn!("HCI read failed: {e}");
                        break;
                    }
                    Err(_would_block) => break,
                };

                let Some(frame) = parse_advertising_report(&buf[..n]) else {
                    continue;
                };
                if tx.send(frame).await.is_err() {
                    debug!("Frame receiver dropped, stopping HCI scan");
                    return;
                }
            }
        }
    });

    Ok(rx)
}
